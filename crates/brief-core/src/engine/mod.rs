//! Motor de corrida: plan -> ejecución -> revisión -> replan.
//!
//! `RunEngine` posee las instancias con ciclo de vida de la corrida
//! (blackboard, recorder, token de cancelación) y orquesta el loop de
//! retroalimentación: ejecuta el grafo, consulta al review gate en los
//! checkpoints y convierte un veredicto deficiente en el delta-subgrafo del
//! planner, acotado por el presupuesto de replanificaciones. Nada de este
//! estado sobrevive a la corrida ni se comparte entre corridas.

use log::{debug, info};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::blackboard::Blackboard;
use crate::capability::{CapabilityRegistry, ClassifyCapability, ReviewCapability};
use crate::config::EngineConfig;
use crate::constants::ENGINE_VERSION;
use crate::errors::EngineError;
use crate::graph::NodeStatus;
use crate::hashing::hash_value;
use crate::model::{Artifact, ArtifactId, ArtifactKind, DocumentProfile, RunContext};
use crate::planner::Planner;
use crate::review::{ReviewGate, ReviewVerdict};
use crate::scheduler::{Scheduler, SchedulerConfig};
use crate::trace::{InMemoryTraceStore, RunStatus, TraceEntry, TraceEntryKind, TraceRecorder, TraceStore};

/// Artifact inicial que el llamador siembra antes de planificar (p.ej. el
/// documento crudo). La clave la elige el llamador; la revisión la asigna
/// el blackboard.
#[derive(Debug, Clone)]
pub struct SeedArtifact {
    pub kind: ArtifactKind,
    pub key: String,
    pub schema_version: u32,
    pub payload: serde_json::Value,
    pub confidence: Option<f64>,
}

impl SeedArtifact {
    pub fn new(kind: ArtifactKind, key: impl Into<String>, payload: serde_json::Value) -> Self {
        SeedArtifact { kind,
                       key: key.into(),
                       schema_version: 1,
                       payload,
                       confidence: None }
    }
}

/// Resultado reportado de una corrida completa.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub status: RunStatus,
    /// Replanificaciones efectivamente disparadas.
    pub replans: u32,
    pub failed_nodes: Vec<String>,
    pub skipped_nodes: Vec<String>,
    pub node_statuses: BTreeMap<String, NodeStatus>,
    pub run_fingerprint: String,
}

pub struct RunEngine<S: TraceStore> {
    ctx: RunContext,
    recorder: TraceRecorder<S>,
    planner: Planner,
    scheduler: Scheduler,
    gate: ReviewGate,
    classifier: Option<Arc<dyn ClassifyCapability>>,
}

impl RunEngine<InMemoryTraceStore> {
    /// Motor con trace en memoria (tests y demos).
    pub fn in_memory(planner: Planner,
                     registry: Arc<CapabilityRegistry>,
                     reviewer: Arc<dyn ReviewCapability>,
                     config: &EngineConfig)
                     -> Self {
        Self::new(InMemoryTraceStore::default(), planner, registry, reviewer, config)
    }
}

impl<S: TraceStore> RunEngine<S> {
    pub fn new(store: S,
               planner: Planner,
               registry: Arc<CapabilityRegistry>,
               reviewer: Arc<dyn ReviewCapability>,
               config: &EngineConfig)
               -> Self {
        let ctx = RunContext::new();
        let recorder = TraceRecorder::new(ctx.run_id, store);
        RunEngine { scheduler: Scheduler::new(registry, SchedulerConfig::from(config)),
                    planner: planner.with_max_replans(config.max_replans),
                    gate: ReviewGate::new(reviewer),
                    classifier: None,
                    ctx,
                    recorder }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ClassifyCapability>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Fija el id de corrida (útil cuando el archivo de trace se nombró
    /// antes de construir el motor). Sólo antes de ejecutar.
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.ctx.run_id = run_id;
        self.recorder.set_run_id(run_id);
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.ctx.run_id
    }

    /// Token para cancelar la corrida desde afuera.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.ctx.cancel.clone()
    }

    pub fn blackboard(&self) -> Arc<Blackboard> {
        self.ctx.blackboard.clone()
    }

    pub fn trace_entries(&self) -> Vec<TraceEntry> {
        self.recorder.entries()
    }

    pub fn into_trace_store(self) -> S {
        self.recorder.into_store()
    }

    /// Clasifica el documento (una única vez, antes del primer plan) y corre
    /// el pipeline completo con la semilla dada.
    pub async fn execute_document(&mut self, raw_text: &str, seed: SeedArtifact) -> Result<RunOutcome, EngineError> {
        let classifier = self.classifier
                             .clone()
                             .ok_or_else(|| EngineError::Internal("no classifier configured".to_string()))?;
        let profile = classifier.classify(raw_text).await?;
        debug!("document classified as '{}' ({} flags)", profile.kind, profile.flags.len());
        self.execute(&profile, vec![seed]).await
    }

    /// Corre el loop completo: plan, ejecución, revisión y replanificación
    /// hasta veredicto aprobado, presupuesto agotado, falla o cancelación.
    pub async fn execute(&mut self, profile: &DocumentProfile, seeds: Vec<SeedArtifact>) -> Result<RunOutcome, EngineError> {
        let seed_ids: Vec<ArtifactId> = seeds.iter()
                                             .map(|s| ArtifactId::new(s.kind.clone(), s.key.clone()))
                                             .collect();

        let mut graph = self.planner.plan(profile, &seed_ids)?;
        self.recorder.record(TraceEntryKind::PlanCreated { definition_hash: graph.definition_hash().to_string(),
                                                           node_ids: graph.ids() })?;

        for seed in seeds {
            let id = ArtifactId::new(seed.kind.clone(), seed.key.clone());
            let artifact = Artifact { kind: seed.kind,
                                      key: seed.key,
                                      schema_version: seed.schema_version,
                                      revision: self.ctx.blackboard.next_revision(&id),
                                      payload: seed.payload,
                                      hash: String::new(),
                                      confidence: seed.confidence,
                                      provenance: Vec::new() };
            let committed = self.ctx.blackboard.put(artifact)?;
            self.recorder.record(TraceEntryKind::ArtifactWritten { artifact: committed })?;
        }

        let mut replans = 0u32;
        let status = loop {
            self.scheduler.run(&mut graph, &self.ctx, &mut self.recorder).await?;

            if self.ctx.cancel.is_cancelled() {
                self.recorder.record(TraceEntryKind::RunCancelled)?;
                break RunStatus::Cancelled;
            }

            // Sin checkpoint exitoso no hay nada revisable: la corrida cierra
            // con las fallas ya contenidas y reportadas por nodo.
            let reviewable = graph.checkpoint_ids()
                                  .iter()
                                  .any(|id| graph.node(id).map(|n| n.status == NodeStatus::Succeeded).unwrap_or(false));
            if !reviewable {
                break RunStatus::Failed;
            }

            let report = self.gate.evaluate(&graph, self.ctx.blackboard.as_ref()).await?;
            self.recorder.record(TraceEntryKind::ReviewInvoked { verdict: report.verdict,
                                                                 deficient: report.deficient.clone(),
                                                                 detail: report.detail.clone() })?;
            match report.verdict {
                ReviewVerdict::Approved => break RunStatus::Succeeded,
                ReviewVerdict::Deficient => match self.planner.replan(&graph, &report, replans + 1) {
                    Ok(outcome) => {
                        replans = outcome.replan_index;
                        info!("replan {} touches {} nodes", outcome.replan_index, outcome.affected.len());
                        self.recorder.record(TraceEntryKind::ReplanTriggered {
                                         replan_index: outcome.replan_index,
                                         affected: outcome.affected.iter().cloned().collect(),
                                     })?;
                        graph = outcome.graph;
                    }
                    Err(EngineError::ReplanBudgetExhausted(budget)) => {
                        info!("replan budget ({budget}) exhausted; closing with best available artifacts");
                        break RunStatus::PartialSuccess;
                    }
                    Err(e) => return Err(e),
                },
            }
        };

        let run_fingerprint = self.compute_fingerprint(graph.definition_hash())?;
        if status != RunStatus::Cancelled {
            self.recorder.record(TraceEntryKind::RunCompleted { status,
                                                                run_fingerprint: run_fingerprint.clone() })?;
        }

        let failed_nodes = graph.nodes()
                                .filter(|n| matches!(n.status, NodeStatus::Failed | NodeStatus::TimedOut))
                                .map(|n| n.id.clone())
                                .collect();
        let skipped_nodes = graph.nodes()
                                 .filter(|n| n.status == NodeStatus::Skipped)
                                 .map(|n| n.id.clone())
                                 .collect();
        Ok(RunOutcome { run_id: self.ctx.run_id,
                        status,
                        replans,
                        failed_nodes,
                        skipped_nodes,
                        node_statuses: graph.statuses(),
                        run_fingerprint })
    }

    /// Fingerprint agregado de la corrida: versión del motor, hash de la
    /// definición y el digest ordenado del blackboard. Estable bajo replay.
    fn compute_fingerprint(&self, definition_hash: &str) -> Result<String, EngineError> {
        let digests = self.ctx.blackboard.digest();
        let digests = serde_json::to_value(&digests)
            .map_err(|e| EngineError::Internal(format!("fingerprint: {e}")))?;
        Ok(hash_value(&json!({
               "engine_version": ENGINE_VERSION,
               "definition_hash": definition_hash,
               "artifacts": digests,
           })))
    }
}
