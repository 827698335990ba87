//! Artifact neutral del motor.
//!
//! Un `Artifact` es la unidad de datos versionada que las capacidades
//! intercambian a través del blackboard. Es neutral:
//! - `payload` es JSON genérico; el motor no interpreta su semántica (el
//!   contrato lo valida la capacidad que produce/consume).
//! - `hash` lo calcula el motor sobre el JSON canonicalizado del payload;
//!   es la identidad usada para deduplicación, replay y fingerprints.
//! - la identidad lógica es `(kind, key)`; `revision` crece de a uno dentro
//!   de esa identidad y nunca se reescribe.
//! - `provenance` acumula qué nodo produjo cada valor y cuándo; no entra
//!   al hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Familia de esquema de un artifact ("raw_document", "explanation", ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactKind(String);

impl ArtifactKind {
    pub fn new(tag: impl Into<String>) -> Self {
        ArtifactKind(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArtifactKind {
    fn from(tag: &str) -> Self {
        ArtifactKind::new(tag)
    }
}

/// Identidad lógica `(kind, key)` dentro de una corrida.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactId {
    pub kind: ArtifactKind,
    pub key: String,
}

impl ArtifactId {
    pub fn new(kind: ArtifactKind, key: impl Into<String>) -> Self {
        ArtifactId { kind, key: key.into() }
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.kind, self.key)
    }
}

/// Registro de procedencia de una revisión.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceNote {
    pub produced_by: String,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Artifact inmutable ya comprometido en el blackboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub key: String,
    pub schema_version: u32,
    pub revision: u64,
    pub payload: Value,
    /// Hash canónico del payload (asignado por el blackboard al comprometer).
    pub hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub provenance: Vec<ProvenanceNote>,
}

impl Artifact {
    pub fn id(&self) -> ArtifactId {
        ArtifactId::new(self.kind.clone(), self.key.clone())
    }
}

/// Salida cruda de una capacidad, antes de comprometerse.
///
/// El scheduler completa la identidad (key = nodo productor), la revisión y
/// la procedencia al escribirla en el blackboard; la capacidad sólo declara
/// kind, payload y metadatos propios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactDraft {
    pub kind: ArtifactKind,
    pub schema_version: u32,
    pub payload: Value,
    pub confidence: Option<f64>,
    pub note: Option<String>,
}

impl ArtifactDraft {
    pub fn new(kind: ArtifactKind, payload: Value) -> Self {
        ArtifactDraft { kind,
                        schema_version: 1,
                        payload,
                        confidence: None,
                        note: None }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_schema_version(mut self, v: u32) -> Self {
        self.schema_version = v;
        self
    }
}
