//! Replay determinista: reconstruye blackboard y estados de nodo leyendo la
//! bitácora secuencialmente, sin invocar ninguna capacidad externa.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use uuid::Uuid;

use super::types::{RunStatus, TraceEntry, TraceEntryKind};
use crate::blackboard::Blackboard;
use crate::errors::EngineError;
use crate::graph::NodeStatus;

/// Estado reconstruido de una corrida a partir de su trace.
pub struct ReplaySummary {
    pub run_id: Option<Uuid>,
    pub blackboard: Blackboard,
    pub node_statuses: BTreeMap<String, NodeStatus>,
    pub final_status: Option<RunStatus>,
    pub replans: u32,
    pub definition_hash: Option<String>,
    pub run_fingerprint: Option<String>,
}

/// Reproduce una bitácora completa.
///
/// Determinismo: reproducir dos veces el mismo trace produce contenidos de
/// blackboard byte-idénticos (mismo digest) y el mismo estado final.
pub fn replay(entries: &[TraceEntry]) -> Result<ReplaySummary, EngineError> {
    for pair in entries.windows(2) {
        if pair[1].seq <= pair[0].seq {
            return Err(EngineError::TraceCorrupted(format!("sequence numbers out of order: {} then {}",
                                                           pair[0].seq, pair[1].seq)));
        }
    }

    let mut summary = ReplaySummary { run_id: entries.first().map(|e| e.run_id),
                                      blackboard: Blackboard::new(),
                                      node_statuses: BTreeMap::new(),
                                      final_status: None,
                                      replans: 0,
                                      definition_hash: None,
                                      run_fingerprint: None };

    for entry in entries {
        match &entry.kind {
            TraceEntryKind::PlanCreated { definition_hash, node_ids } => {
                summary.definition_hash = Some(definition_hash.clone());
                for id in node_ids {
                    summary.node_statuses.insert(id.clone(), NodeStatus::Pending);
                }
            }
            TraceEntryKind::NodeStateChanged { node_id, status, .. } => {
                summary.node_statuses.insert(node_id.clone(), *status);
            }
            TraceEntryKind::ArtifactWritten { artifact } => {
                summary.blackboard.restore(artifact.clone())?;
            }
            TraceEntryKind::ReviewInvoked { .. } => {}
            TraceEntryKind::ReplanTriggered { .. } => {
                summary.replans += 1;
            }
            TraceEntryKind::RunCompleted { status, run_fingerprint } => {
                summary.final_status = Some(*status);
                summary.run_fingerprint = Some(run_fingerprint.clone());
            }
            TraceEntryKind::RunCancelled => {
                summary.final_status = Some(RunStatus::Cancelled);
            }
        }
    }

    Ok(summary)
}

/// Lee un archivo de trace JSONL.
///
/// Una última línea truncada (corte a mitad de registro) se tolera: el
/// replay llega hasta el último registro completo. Un registro ilegible
/// seguido de más contenido delata corrupción y aborta.
pub fn read_trace_file(path: &Path) -> Result<Vec<TraceEntry>, EngineError> {
    let file = File::open(path)
        .map_err(|e| EngineError::TraceCorrupted(format!("cannot open {}: {e}", path.display())))?;
    let reader = BufReader::new(file);

    let mut lines: Vec<String> = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|e| EngineError::TraceCorrupted(format!("read {}: {e}", path.display())))?;
        if !line.trim().is_empty() {
            lines.push(line);
        }
    }

    let mut entries = Vec::with_capacity(lines.len());
    let last = lines.len().saturating_sub(1);
    for (i, line) in lines.iter().enumerate() {
        match serde_json::from_str::<TraceEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) if i == last => {
                // Registro final incompleto: se replayea hasta acá.
                log::warn!("trace {}: truncated final record dropped ({e})", path.display());
                break;
            }
            Err(e) => {
                return Err(EngineError::TraceCorrupted(format!("{} line {}: {e}", path.display(), i + 1)));
            }
        }
    }
    Ok(entries)
}
