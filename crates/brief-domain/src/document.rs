//! Documento crudo de entrada.
//!
//! - El texto es inmutable tras la construcción; el hash de contenido
//!   (sha256 hex) sirve como identidad estable del documento dentro de
//!   una corrida y entre corridas.
//! - La etiqueta de fuente (`source_label`) es metadato libre: nombre de
//!   archivo, URL, identificador de expediente, etc. No entra al hash.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDocument {
    text: String,
    source_label: String,
    content_hash: String,
}

impl RawDocument {
    /// Construye un documento a partir de texto no vacío.
    pub fn new(text: &str, source_label: &str) -> Result<Self, DomainError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(DomainError::ValidationError("Document text must not be empty".to_string()));
        }
        let mut hasher = Sha256::new();
        hasher.update(trimmed.as_bytes());
        let content_hash = format!("{:x}", hasher.finalize());
        Ok(RawDocument { text: trimmed.to_string(),
                         source_label: source_label.to_string(),
                         content_hash })
    }

    pub fn text(&self) -> &str { &self.text }
    pub fn source_label(&self) -> &str { &self.source_label }
    pub fn content_hash(&self) -> &str { &self.content_hash }
}

impl fmt::Display for RawDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<doc {} ({} chars)>", &self.content_hash[..12], self.text.len())
    }
}
