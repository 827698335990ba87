//! Tarjetas de explicación en tres niveles fijos.
//!
//! Cada corrida produce exactamente una tarjeta por nivel:
//! - `OneSentence`: la afirmación central en una oración.
//! - `ThreeParagraph`: resumen de profundidad media.
//! - `DeepDive`: comentario extendido.
//!
//! El nivel participa de la identidad lógica de la tarjeta; el contenido
//! (claim + rationale) es texto llano ya dirigido al público general.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationLevel {
    OneSentence,
    ThreeParagraph,
    DeepDive,
}

impl ExplanationLevel {
    /// Los tres niveles en orden canónico.
    pub fn all() -> [ExplanationLevel; 3] {
        [ExplanationLevel::OneSentence, ExplanationLevel::ThreeParagraph, ExplanationLevel::DeepDive]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationCard {
    pub level: ExplanationLevel,
    /// Afirmación central de la tarjeta.
    pub claim: String,
    /// Desarrollo que sostiene la afirmación.
    pub rationale: String,
    /// Confianza en [0,1].
    pub confidence: f64,
}

impl ExplanationCard {
    /// Selecciona la primera tarjeta del nivel pedido.
    pub fn select_level(cards: &[ExplanationCard], level: ExplanationLevel) -> Option<&ExplanationCard> {
        cards.iter().find(|c| c.level == level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(level: ExplanationLevel) -> ExplanationCard {
        ExplanationCard { level,
                          claim: "claim".to_string(),
                          rationale: "rationale".to_string(),
                          confidence: 0.8 }
    }

    #[test]
    fn select_level_finds_matching_card() {
        let cards = vec![card(ExplanationLevel::OneSentence), card(ExplanationLevel::DeepDive)];
        assert!(ExplanationCard::select_level(&cards, ExplanationLevel::DeepDive).is_some());
        assert!(ExplanationCard::select_level(&cards, ExplanationLevel::ThreeParagraph).is_none());
    }

    #[test]
    fn levels_serialize_snake_case() {
        let s = serde_json::to_string(&ExplanationLevel::OneSentence).unwrap();
        assert_eq!(s, "\"one_sentence\"");
    }
}
