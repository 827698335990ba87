//! Kinds de artifact del pipeline y helpers de payload.
//!
//! El core trata los payloads como JSON opaco; acá vive el mapeo entre ese
//! JSON y los tipos del dominio, con errores de contrato reportados como
//! `SchemaValidation` (reintentables para el scheduler).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use brief_core::{Artifact, ArtifactKind, EngineError};
use brief_domain::{ExplanationCard, ParsedBlock, TermGloss, TimelineEntry};

pub const RAW_DOCUMENT: &str = "raw_document";
pub const BLOCKS: &str = "blocks";
pub const TERM_GLOSSES: &str = "term_glosses";
pub const TIMELINE: &str = "timeline";
pub const EXPLANATIONS: &str = "explanation";
pub const CITIZEN_NOTES: &str = "citizen_notes";
pub const PUBLIC_BRIEF: &str = "public_brief";

pub fn kind(tag: &str) -> ArtifactKind {
    ArtifactKind::new(tag)
}

// Formas de payload de cada kind. Los contratos viven acá, no en el core.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDocumentPayload {
    pub text: String,
    #[serde(default)]
    pub source_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlocksPayload {
    pub blocks: Vec<ParsedBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlossesPayload {
    pub glosses: Vec<TermGloss>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelinePayload {
    pub entries: Vec<TimelineEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardsPayload {
    pub cards: Vec<ExplanationCard>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesPayload {
    pub notes: Vec<String>,
}

/// Decodifica el payload de un artifact al tipo esperado.
pub fn decode_payload<T: DeserializeOwned>(artifact: &Artifact) -> Result<T, EngineError> {
    serde_json::from_value(artifact.payload.clone())
        .map_err(|e| EngineError::SchemaValidation(format!("payload of ({},{}): {e}", artifact.kind, artifact.key)))
}

/// Codifica un valor del dominio como payload JSON.
pub fn encode_payload<T: Serialize>(value: &T) -> Result<serde_json::Value, EngineError> {
    serde_json::to_value(value).map_err(|e| EngineError::SchemaValidation(format!("encode payload: {e}")))
}

/// Primer input del kind pedido, si llegó.
pub fn find_input<'a>(inputs: &'a [Artifact], tag: &str) -> Option<&'a Artifact> {
    inputs.iter().find(|a| a.kind.as_str() == tag)
}

/// Input obligatorio del kind pedido.
pub fn require_input<'a>(inputs: &'a [Artifact], tag: &str) -> Result<&'a Artifact, EngineError> {
    find_input(inputs, tag).ok_or_else(|| EngineError::SchemaValidation(format!("missing required input kind '{tag}'")))
}
