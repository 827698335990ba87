//! Tipos de entrada del trace y estructura `TraceEntry`.
//!
//! Rol:
//! - Cada transición observable de planner, scheduler y review gate se
//!   agrega como entrada a una bitácora única por corrida, numerada por
//!   `seq`: un orden total suficiente para reconstruir happens-before.
//! - Las entradas nunca se mutan; `ArtifactWritten` transporta el artifact
//!   completo para que el replay no dependa de ningún almacén externo.
//! - El enum es el contrato observable y estable del motor; cada registro
//!   se autodescribe (tag `type`) para que un archivo truncado siga siendo
//!   legible hasta el último registro completo.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::EngineError;
use crate::graph::NodeStatus;
use crate::model::{Artifact, ArtifactId};
use crate::review::ReviewVerdict;

/// Estado terminal de la corrida completa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Succeeded,
    /// El presupuesto de replan se agotó con artifacts aún deficientes; la
    /// corrida termina con lo mejor disponible.
    PartialSuccess,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEntryKind {
    /// Primer evento de la corrida: fija la definición del grafo inicial.
    PlanCreated { definition_hash: String, node_ids: Vec<String> },
    /// Transición de estado de un nodo. `error` acompaña a las fallas.
    NodeStateChanged {
        node_id: String,
        status: NodeStatus,
        attempt: u32,
        revision_group: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<EngineError>,
    },
    /// Revisión comprometida en el blackboard (artifact completo).
    ArtifactWritten { artifact: Artifact },
    /// El revisor externo emitió un veredicto.
    ReviewInvoked {
        verdict: ReviewVerdict,
        deficient: Vec<ArtifactId>,
        detail: Value,
    },
    /// Un reporte deficiente disparó un delta-subgrafo.
    ReplanTriggered { replan_index: u32, affected: Vec<String> },
    /// Cierre normal con el fingerprint agregado de la corrida.
    RunCompleted { status: RunStatus, run_fingerprint: String },
    /// Cierre por señal de cancelación.
    RunCancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Asignado por el store en orden de append; total y sin huecos.
    pub seq: u64,
    pub run_id: Uuid,
    pub kind: TraceEntryKind,
    /// Metadato: no participa de ningún fingerprint ni del replay.
    pub ts: DateTime<Utc>,
}
