//! Taxonomía de errores del core.
//!
//! Tres familias, distinguidas por `classify_error`:
//! - `Fatal`: errores estructurales de planificación o de trace corrupto.
//!   Abortan la corrida antes/fuera de la ejecución de nodos.
//! - `Retryable`: fallas por nodo; el scheduler reintenta con backoff y las
//!   contiene en el estado del nodo al agotar el presupuesto.
//! - `Reported`: condiciones terminales que no son errores (presupuesto de
//!   replan agotado, cancelación); se reflejan en el estado final.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineError {
    #[error("missing dependency: node '{node}' declares input kind '{kind}' with no producer or seed")]
    MissingDependency { node: String, kind: String },

    #[error("cycle detected: {path:?}")]
    CycleDetected { path: Vec<String> },

    #[error("stale write on ({kind},{key}): expected revision {expected}, got {got}")]
    StaleWrite { kind: String, key: String, expected: u64, got: u64 },

    #[error("artifact not found: ({kind},{key})")]
    NotFound { kind: String, key: String },

    #[error("capability '{0}' is not registered")]
    UnknownCapability(String),

    #[error("agent execution failed: {0}")]
    AgentExecution(String),

    #[error("schema validation failed: {0}")]
    SchemaValidation(String),

    #[error("node attempt timed out after {0} ms")]
    Timeout(u64),

    #[error("run cancelled")]
    Cancelled,

    #[error("replan budget exhausted after {0} replans")]
    ReplanBudgetExhausted(u32),

    #[error("trace corrupted: {0}")]
    TraceCorrupted(String),

    #[error("internal: {0}")]
    Internal(String),
}

/// Clase de un error a efectos de política de manejo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Fatal,
    Retryable,
    Reported,
}

/// Mapea cada variante a su clase. El scheduler consulta esto para decidir
/// si un intento fallido se reintenta.
pub fn classify_error(e: &EngineError) -> ErrorClass {
    match e {
        EngineError::StaleWrite { .. }
        | EngineError::AgentExecution(_)
        | EngineError::SchemaValidation(_)
        | EngineError::Timeout(_) => ErrorClass::Retryable,
        EngineError::Cancelled | EngineError::ReplanBudgetExhausted(_) => ErrorClass::Reported,
        _ => ErrorClass::Fatal,
    }
}
