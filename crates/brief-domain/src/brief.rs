//! Brief público: el entregable final de una corrida.
//!
//! Estructura mínima y estable: título, resumen, secciones con id propio y
//! un bloque `meta` JSON libre (conteos, confianza agregada, vista previa
//! de la fuente). La validación es estructural, no de contenido.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::DomainError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefSection {
    pub id: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicBrief {
    pub title: String,
    pub summary: String,
    pub sections: Vec<BriefSection>,
    pub meta: Value,
}

impl PublicBrief {
    /// Comprueba los invariantes estructurales del brief.
    ///
    /// - título y resumen no vacíos;
    /// - al menos una sección;
    /// - ids de sección únicos y no vacíos.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::ValidationError("Brief title must not be empty".to_string()));
        }
        if self.summary.trim().is_empty() {
            return Err(DomainError::ValidationError("Brief summary must not be empty".to_string()));
        }
        if self.sections.is_empty() {
            return Err(DomainError::ValidationError("Brief must have at least one section".to_string()));
        }
        let mut seen = std::collections::BTreeSet::new();
        for s in &self.sections {
            if s.id.trim().is_empty() {
                return Err(DomainError::ValidationError("Section id must not be empty".to_string()));
            }
            if !seen.insert(s.id.as_str()) {
                return Err(DomainError::ValidationError(format!("Duplicate section id: {}", s.id)));
            }
        }
        Ok(())
    }

    /// Texto plano concatenado (para métricas de legibilidad).
    pub fn full_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.summary);
        for s in &self.sections {
            out.push(' ');
            out.push_str(&s.content);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> PublicBrief {
        PublicBrief { title: "What the new ordinance changes".to_string(),
                      summary: "The ordinance updates local noise limits.".to_string(),
                      sections: vec![BriefSection { id: "summary".to_string(),
                                                    title: "Summary".to_string(),
                                                    content: "Noise limits drop at night.".to_string() }],
                      meta: json!({"num_cards": 3}) }
    }

    #[test]
    fn valid_brief_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn duplicate_section_ids_rejected() {
        let mut b = sample();
        b.sections.push(b.sections[0].clone());
        assert!(b.validate().is_err());
    }

    #[test]
    fn empty_title_rejected() {
        let mut b = sample();
        b.title = "  ".to_string();
        assert!(b.validate().is_err());
    }
}
