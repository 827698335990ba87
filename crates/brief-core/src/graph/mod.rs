//! Grafo de tareas: nodos declarativos y aristas derivadas estructuralmente.

mod graph;
mod node;

pub use graph::{InputSource, ResolvedInput, TaskGraph};
pub use node::{InputSelector, KeyMatch, NodeStatus, TaskNode};
