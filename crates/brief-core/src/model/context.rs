//! Contexto de corrida.
//!
//! Una corrida posee exactamente una instancia de blackboard y una señal de
//! cancelación, construidas frescas por corrida y pasadas explícitamente a
//! planner, scheduler y review gate. No hay singleton ambiente: el ciclo de
//! vida de estas instancias es exactamente el de la corrida.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::blackboard::Blackboard;

#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub blackboard: Arc<Blackboard>,
    pub cancel: CancellationToken,
}

impl RunContext {
    pub fn new() -> Self {
        Self::with_run_id(Uuid::new_v4())
    }

    pub fn with_run_id(run_id: Uuid) -> Self {
        RunContext { run_id,
                     blackboard: Arc::new(Blackboard::new()),
                     cancel: CancellationToken::new() }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
