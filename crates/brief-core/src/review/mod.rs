//! Review gate: convierte el veredicto del revisor externo en una decisión
//! de replanificación.
//!
//! El gate no guarda estado: junta los artifacts de los nodos checkpoint que
//! terminaron bien, se los pasa al revisor y devuelve el reporte tal cual.
//! Si el revisor mismo falla, el error se propaga sin atenuar: un revisor
//! roto no puede ser adivinado por el núcleo.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::blackboard::Blackboard;
use crate::capability::ReviewCapability;
use crate::errors::EngineError;
use crate::graph::{NodeStatus, TaskGraph};
use crate::model::ArtifactId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewVerdict {
    Approved,
    Deficient,
}

/// Veredicto escalar más detalle opaco.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewReport {
    pub verdict: ReviewVerdict,
    /// Identidades `(kind,key)` juzgadas deficientes.
    pub deficient: Vec<ArtifactId>,
    /// Detalle opaco para el núcleo (criterios, comentarios, acciones).
    pub detail: Value,
}

impl ReviewReport {
    pub fn approved(detail: Value) -> Self {
        ReviewReport { verdict: ReviewVerdict::Approved,
                       deficient: Vec::new(),
                       detail }
    }

    pub fn deficient(deficient: Vec<ArtifactId>, detail: Value) -> Self {
        ReviewReport { verdict: ReviewVerdict::Deficient,
                       deficient,
                       detail }
    }
}

pub struct ReviewGate {
    reviewer: Arc<dyn ReviewCapability>,
}

impl ReviewGate {
    pub fn new(reviewer: Arc<dyn ReviewCapability>) -> Self {
        ReviewGate { reviewer }
    }

    /// Reúne la última revisión de cada salida de los checkpoints exitosos y
    /// consulta al revisor.
    pub async fn evaluate(&self, graph: &TaskGraph, blackboard: &Blackboard) -> Result<ReviewReport, EngineError> {
        let mut artifacts = Vec::new();
        for id in graph.checkpoint_ids() {
            let node = match graph.node(&id) {
                Some(n) => n,
                None => continue,
            };
            if node.status != NodeStatus::Succeeded {
                continue;
            }
            for kind in &node.declared_outputs {
                if let Some(artifact) = blackboard.latest(&ArtifactId::new(kind.clone(), id.clone())) {
                    artifacts.push(artifact);
                }
            }
        }
        self.reviewer.review(&artifacts).await
    }
}
