//! Perfil del documento que condiciona la planificación.
//!
//! Lo produce la capacidad de clasificación (externa) una única vez antes
//! del primer plan. El planner sólo consume `flags`: cada flag habilita la
//! clase de capacidades que lo declara.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentProfile {
    /// Clase de documento ("statute", "notice", "article", ...).
    pub kind: String,
    /// Idioma principal (etiqueta corta, p.ej. "en").
    pub language: String,
    /// Flags que habilitan clases de capacidades (p.ej. "history").
    pub flags: BTreeSet<String>,
}

impl DocumentProfile {
    pub fn new(kind: impl Into<String>, language: impl Into<String>) -> Self {
        DocumentProfile { kind: kind.into(),
                          language: language.into(),
                          flags: BTreeSet::new() }
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.insert(flag.into());
        self
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }
}
