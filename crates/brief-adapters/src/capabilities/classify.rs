//! Clasificador de documentos (perfil para el planner).
//!
//! Reglas fijas sobre el texto crudo; se consume una única vez antes del
//! primer plan. La capa histórica se habilita cuando el documento menciona
//! al menos dos años distintos.

use async_trait::async_trait;
use std::collections::BTreeSet;

use brief_core::{ClassifyCapability, DocumentProfile, EngineError};

/// Marcadores léxicos de documento normativo.
const STATUTE_MARKERS: [&str; 5] = ["statute", "ordinance", "decree", "act", "regulation"];

pub struct ProfileClassifier;

#[async_trait]
impl ClassifyCapability for ProfileClassifier {
    async fn classify(&self, raw_document: &str) -> Result<DocumentProfile, EngineError> {
        let lowered = raw_document.to_lowercase();
        let kind = if STATUTE_MARKERS.iter().any(|m| lowered.contains(m)) {
            "statute"
        } else if lowered.contains("notice") {
            "notice"
        } else {
            "article"
        };

        let mut years: BTreeSet<String> = BTreeSet::new();
        for token in lowered.split_whitespace() {
            let digits: String = token.chars().filter(|c| c.is_ascii_digit()).collect();
            if digits.len() == 4 && digits.parse::<u32>().map(|y| (1000..3000).contains(&y)).unwrap_or(false) {
                years.insert(digits);
            }
        }

        let mut profile = DocumentProfile::new(kind, "en");
        if years.len() >= 2 {
            profile = profile.with_flag("history");
        }
        log::debug!("classified document as '{}' ({} year mentions)", profile.kind, years.len());
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn statute_markers_drive_the_kind() {
        let p = ProfileClassifier.classify("This ordinance regulates noise.").await.unwrap();
        assert_eq!(p.kind, "statute");
        assert!(!p.has_flag("history"));
    }

    #[tokio::test]
    async fn repeated_years_enable_history() {
        let p = ProfileClassifier.classify("An act of 1994, amended 2011.").await.unwrap();
        assert!(p.has_flag("history"));
    }

    #[tokio::test]
    async fn plain_text_is_an_article() {
        let p = ProfileClassifier.classify("Weather will improve tomorrow.").await.unwrap();
        assert_eq!(p.kind, "article");
    }
}
