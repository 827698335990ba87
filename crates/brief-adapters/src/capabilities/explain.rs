//! Explicador: bloques + glosas -> tarjetas en los tres niveles.
//!
//! En re-ejecuciones por replanificación (`revision_group` > 1) el texto se
//! simplifica más agresivamente: oraciones largas se parten en los signos
//! de puntuación intermedios. Así una corrida observada como poco clara por
//! el revisor mejora de verdad en la vuelta siguiente.

use async_trait::async_trait;

use crate::artifacts::{decode_payload, encode_payload, kind, require_input, BlocksPayload, CardsPayload,
                       GlossesPayload, BLOCKS, EXPLANATIONS, TERM_GLOSSES};
use brief_core::{Artifact, ArtifactDraft, Capability, EngineError, InvokeContext};
use brief_domain::{ExplanationCard, ExplanationLevel};

/// Parte oraciones largas en puntos en los separadores intermedios.
fn simplify(text: &str, group: u32) -> String {
    if group <= 1 {
        return text.to_string();
    }
    text.replace("; ", ". ").replace(", ", ". ")
}

fn first_sentence(text: &str) -> &str {
    text.split('.').next().unwrap_or(text).trim()
}

pub struct ExplainCapability;

#[async_trait]
impl Capability for ExplainCapability {
    async fn invoke(&self, inputs: &[Artifact], ctx: &InvokeContext) -> Result<Vec<ArtifactDraft>, EngineError> {
        let blocks: BlocksPayload = decode_payload(require_input(inputs, BLOCKS)?)?;
        let glosses: GlossesPayload = decode_payload(require_input(inputs, TERM_GLOSSES)?)?;
        let group = ctx.revision_group;

        let lead = blocks.payload_lead();
        let claim = simplify(first_sentence(&lead), group);

        let gloss_clause = if glosses.glosses.is_empty() {
            "It uses no specialized vocabulary.".to_string()
        } else {
            format!("It uses {} technical terms. Each one is explained below.", glosses.glosses.len())
        };

        let three_paragraph: String = blocks.blocks
                                            .iter()
                                            .take(3)
                                            .map(|b| format!("{}.", simplify(first_sentence(&b.text), group)))
                                            .collect::<Vec<String>>()
                                            .join(" ");

        let deep_dive: String = blocks.blocks
                                      .iter()
                                      .map(|b| simplify(&b.text, group))
                                      .collect::<Vec<String>>()
                                      .join(" ");

        let cards = vec![ExplanationCard { level: ExplanationLevel::OneSentence,
                                           claim: claim.clone(),
                                           rationale: format!("{}. {}", claim, gloss_clause),
                                           confidence: 0.8 },
                         ExplanationCard { level: ExplanationLevel::ThreeParagraph,
                                           claim: claim.clone(),
                                           rationale: three_paragraph,
                                           confidence: 0.75 },
                         ExplanationCard { level: ExplanationLevel::DeepDive,
                                           claim,
                                           rationale: deep_dive,
                                           confidence: 0.7 }];
        log::debug!("explained {} blocks at group {}", blocks.blocks.len(), group);
        Ok(vec![ArtifactDraft::new(kind(EXPLANATIONS), encode_payload(&CardsPayload { cards })?).with_confidence(0.75)])
    }
}

impl BlocksPayload {
    /// Texto del primer bloque, base de la afirmación central.
    fn payload_lead(&self) -> String {
        self.blocks.first().map(|b| b.text.clone()).unwrap_or_default()
    }
}
