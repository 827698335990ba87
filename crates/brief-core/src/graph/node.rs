//! Nodo de tarea y su máquina de estados.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::ArtifactKind;

/// Estado de un nodo en tiempo de ejecución.
///
/// Transiciones válidas:
/// - `Pending` -> `Ready` (todos los inputs declarados presentes)
/// - `Ready` -> `Running` -> `Succeeded` | `Failed` | `TimedOut`
/// - `Failed`/`TimedOut` -> `Ready` mientras queden reintentos
/// - `Pending`/`Ready` -> `Skipped` (falla terminal de un productor no opcional)
/// - `Pending`/`Ready`/`Running` -> `Cancelled` (señal de la corrida)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    Pending,
    Ready,
    Running,
    Succeeded,
    Failed,
    Skipped,
    TimedOut,
    Cancelled,
}

impl NodeStatus {
    /// Estados desde los que el nodo ya no volverá a ejecutarse.
    pub fn is_terminal(&self) -> bool {
        matches!(self,
                 NodeStatus::Succeeded | NodeStatus::Failed | NodeStatus::Skipped | NodeStatus::TimedOut | NodeStatus::Cancelled)
    }

    /// Falla terminal (excluye éxito y cancelación).
    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, NodeStatus::Failed | NodeStatus::Skipped | NodeStatus::TimedOut)
    }
}

/// Forma de casar la clave de un input declarado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMatch {
    /// Clave exacta (id de un productor o clave de una semilla).
    Exact(String),
    /// Comodín por kind: cualquier productor del kind, más las semillas.
    AnyProducer,
}

/// Input declarado de un nodo: par `(kind, clave)`, con comodín por kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSelector {
    pub kind: ArtifactKind,
    pub key: KeyMatch,
}

impl InputSelector {
    pub fn exact(kind: impl Into<ArtifactKind>, key: impl Into<String>) -> Self {
        InputSelector { kind: kind.into(),
                        key: KeyMatch::Exact(key.into()) }
    }

    pub fn any(kind: impl Into<ArtifactKind>) -> Self {
        InputSelector { kind: kind.into(),
                        key: KeyMatch::AnyProducer }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: String,
    /// Nombre de la capacidad externa que ejecuta este nodo.
    pub capability: String,
    pub declared_inputs: Vec<InputSelector>,
    pub declared_outputs: Vec<ArtifactKind>,
    /// Parámetros base deterministas, entran al hash de la definición.
    pub params: Value,
    /// Un nodo opcional que falla no arrastra a sus dependientes.
    pub optional: bool,
    /// Su finalización marca el grafo como revisable.
    pub checkpoint: bool,
    pub status: NodeStatus,
    /// Contador de intentos (1-based al despachar el primero).
    pub attempt: u32,
    /// Incrementa en cada replan que lo incluye; distingue ejecuciones
    /// lógicas repetidas del "mismo" nodo.
    pub revision_group: u32,
}
