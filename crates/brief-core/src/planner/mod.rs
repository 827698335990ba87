//! Planner: del perfil del documento al grafo inicial, y del reporte de
//! revisión al delta-subgrafo mínimo.
//!
//! El plan nace de un catálogo declarativo de invocaciones de capacidades.
//! El perfil habilita o excluye clases enteras (`requires_flag`); cuando una
//! clase queda excluida, su consumo aguas abajo se poda junto con ella. La
//! replanificación recalcula sólo la clausura hacia adelante de los
//! productores deficientes y respeta un presupuesto acotado.

use serde_json::Value;
use std::collections::{BTreeSet, HashSet};

use crate::constants::DEFAULT_MAX_REPLANS;
use crate::errors::EngineError;
use crate::graph::{InputSelector, KeyMatch, NodeStatus, TaskGraph, TaskNode};
use crate::model::{ArtifactId, ArtifactKind, DocumentProfile};
use crate::review::ReviewReport;

/// Invocación de capacidad declarada en el catálogo.
#[derive(Debug, Clone)]
pub struct CapabilitySpec {
    pub node_id: String,
    pub capability: String,
    pub inputs: Vec<InputSelector>,
    pub outputs: Vec<ArtifactKind>,
    pub params: Value,
    pub optional: bool,
    pub checkpoint: bool,
    /// Flag de perfil que habilita esta invocación; `None` = siempre.
    pub requires_flag: Option<String>,
}

impl CapabilitySpec {
    pub fn new(node_id: impl Into<String>, capability: impl Into<String>) -> Self {
        CapabilitySpec { node_id: node_id.into(),
                         capability: capability.into(),
                         inputs: Vec::new(),
                         outputs: Vec::new(),
                         params: Value::Null,
                         optional: false,
                         checkpoint: false,
                         requires_flag: None }
    }

    pub fn with_input(mut self, selector: InputSelector) -> Self {
        self.inputs.push(selector);
        self
    }

    pub fn with_output(mut self, kind: ArtifactKind) -> Self {
        self.outputs.push(kind);
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn checkpoint(mut self) -> Self {
        self.checkpoint = true;
        self
    }

    pub fn gated_by(mut self, flag: impl Into<String>) -> Self {
        self.requires_flag = Some(flag.into());
        self
    }
}

/// Resultado de una replanificación aceptada.
#[derive(Debug)]
pub struct ReplanOutcome {
    pub graph: TaskGraph,
    /// Nodos del delta (productores deficientes + clausura hacia adelante).
    pub affected: BTreeSet<String>,
    /// Ordinal de esta replanificación (1-based).
    pub replan_index: u32,
}

pub struct Planner {
    catalog: Vec<CapabilitySpec>,
    max_replans: u32,
}

impl Planner {
    pub fn new(catalog: Vec<CapabilitySpec>) -> Self {
        Planner { catalog,
                  max_replans: DEFAULT_MAX_REPLANS }
    }

    pub fn with_max_replans(mut self, max_replans: u32) -> Self {
        self.max_replans = max_replans;
        self
    }

    pub fn max_replans(&self) -> u32 {
        self.max_replans
    }

    /// Construye el grafo inicial para el perfil dado.
    ///
    /// `seeds` son las identidades ya presentes en el blackboard; satisfacen
    /// selectores que no casan con ningún productor del grafo.
    pub fn plan(&self, profile: &DocumentProfile, seeds: &[ArtifactId]) -> Result<TaskGraph, EngineError> {
        let enabled: Vec<&CapabilitySpec> = self.catalog
                                                .iter()
                                                .filter(|spec| match &spec.requires_flag {
                                                    None => true,
                                                    Some(flag) => profile.has_flag(flag),
                                                })
                                                .collect();

        let enabled_kinds: HashSet<&ArtifactKind> = enabled.iter().flat_map(|s| s.outputs.iter()).collect();
        let catalog_kinds: HashSet<&ArtifactKind> = self.catalog.iter().flat_map(|s| s.outputs.iter()).collect();

        let mut nodes = Vec::with_capacity(enabled.len());
        for spec in enabled {
            let inputs = spec.inputs
                             .iter()
                             .filter(|sel| {
                                 let seeded = seeds.iter().any(|seed| {
                                                               seed.kind == sel.kind
                                                               && match &sel.key {
                                                                   KeyMatch::AnyProducer => true,
                                                                   KeyMatch::Exact(k) => *k == seed.key,
                                                               }
                                                           });
                                 if seeded || enabled_kinds.contains(&sel.kind) {
                                     return true;
                                 }
                                 if catalog_kinds.contains(&sel.kind) {
                                     // La clase productora quedó excluida por el perfil:
                                     // el consumo se poda con ella.
                                     log::debug!("plan: pruning input '{}' of node '{}' (producer class gated out)",
                                                 sel.kind, spec.node_id);
                                     return false;
                                 }
                                 // Sin productor en el catálogo completo: se conserva para
                                 // que la validación falle con MissingDependency.
                                 true
                             })
                             .cloned()
                             .collect();

            nodes.push(TaskNode { id: spec.node_id.clone(),
                                  capability: spec.capability.clone(),
                                  declared_inputs: inputs,
                                  declared_outputs: spec.outputs.clone(),
                                  params: spec.params.clone(),
                                  optional: spec.optional,
                                  checkpoint: spec.checkpoint,
                                  status: NodeStatus::Pending,
                                  attempt: 0,
                                  revision_group: 1 });
        }

        TaskGraph::build(nodes, seeds)
    }

    /// Calcula el delta-subgrafo para un reporte deficiente.
    ///
    /// Los nodos fuera de la clausura conservan su `Succeeded` y sus
    /// artifacts se reutilizan sin tocar. Por encima del presupuesto devuelve
    /// `ReplanBudgetExhausted`: condición reportada, no error fatal.
    pub fn replan(&self, prior: &TaskGraph, report: &ReviewReport, replan_index: u32) -> Result<ReplanOutcome, EngineError> {
        if replan_index > self.max_replans {
            return Err(EngineError::ReplanBudgetExhausted(self.max_replans));
        }

        // Productores de los artifacts deficientes (convención: key = id del
        // nodo productor).
        let mut affected: BTreeSet<String> = BTreeSet::new();
        for id in &report.deficient {
            if let Some(node) = prior.node(&id.key) {
                if node.declared_outputs.contains(&id.kind) {
                    affected.insert(node.id.clone());
                }
            }
        }
        if affected.is_empty() {
            return Err(EngineError::Internal(format!("deficiency list names no producer in the graph: {:?}",
                                                     report.deficient)));
        }

        // Clausura transitiva hacia adelante.
        for id in affected.clone() {
            affected.extend(prior.transitive_dependents(&id));
        }

        let graph = prior.reset_for_replan(&affected);
        Ok(ReplanOutcome { graph,
                           affected,
                           replan_index })
    }
}
