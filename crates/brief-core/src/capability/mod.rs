//! Capacidades externas y su registro.
//!
//! El motor trata cada capacidad como una llamada remota opaca, posiblemente
//! lenta y posiblemente fallida: jamás inspecciona la semántica del payload
//! más allá de los tags kind/schema_version. El registro se resuelve una
//! sola vez al construir el scheduler, nunca ad hoc en el punto de llamada.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::EngineError;
use crate::model::{Artifact, ArtifactDraft, DocumentProfile};
use crate::review::ReviewReport;

/// Contexto de una invocación concreta.
#[derive(Debug, Clone)]
pub struct InvokeContext {
    pub node_id: String,
    /// Parámetros base deterministas declarados en el plan.
    pub params: Value,
    pub attempt: u32,
    pub revision_group: u32,
}

/// Transformación externa nombrada, invocada por un nodo.
#[async_trait]
pub trait Capability: Send + Sync {
    async fn invoke(&self, inputs: &[Artifact], ctx: &InvokeContext) -> Result<Vec<ArtifactDraft>, EngineError>;
}

/// Revisor externo: consume artifacts de checkpoint, devuelve un veredicto.
#[async_trait]
pub trait ReviewCapability: Send + Sync {
    async fn review(&self, artifacts: &[Artifact]) -> Result<ReviewReport, EngineError>;
}

/// Clasificador externo: produce el perfil del documento, una vez por
/// corrida, antes del primer plan.
#[async_trait]
pub trait ClassifyCapability: Send + Sync {
    async fn classify(&self, raw_document: &str) -> Result<DocumentProfile, EngineError>;
}

/// Mapa nombre -> implementación con el contrato fijo de `invoke`.
#[derive(Default)]
pub struct CapabilityRegistry {
    map: HashMap<String, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        CapabilityRegistry { map: HashMap::new() }
    }

    pub fn register(&mut self, name: impl Into<String>, capability: Arc<dyn Capability>) {
        self.map.insert(name.into(), capability);
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Capability>, EngineError> {
        self.map.get(name)
                .cloned()
                .ok_or_else(|| EngineError::UnknownCapability(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Nombres registrados, ordenados (para logs y diagnósticos).
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.map.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Capability for Echo {
        async fn invoke(&self, _inputs: &[Artifact], ctx: &InvokeContext) -> Result<Vec<ArtifactDraft>, EngineError> {
            Ok(vec![ArtifactDraft::new(crate::model::ArtifactKind::new("echo"), json!({"node": ctx.node_id}))])
        }
    }

    #[test]
    fn resolve_unknown_name_fails() {
        let registry = CapabilityRegistry::new();
        assert!(matches!(registry.resolve("nope"), Err(EngineError::UnknownCapability(n)) if n == "nope"));
    }

    #[test]
    fn register_then_resolve_round_trips() {
        let mut registry = CapabilityRegistry::new();
        registry.register("echo", Arc::new(Echo));
        assert!(registry.contains("echo"));
        assert_eq!(registry.names(), vec!["echo".to_string()]);
        assert!(registry.resolve("echo").is_ok());
    }
}
