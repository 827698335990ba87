//! Glosador: bloques -> glosas de términos técnicos.
//!
//! Recorre los bloques en orden y junta la primera aparición de cada
//! término del glosario incorporado. Orden de salida estable.

use async_trait::async_trait;

use crate::artifacts::{decode_payload, encode_payload, kind, require_input, BlocksPayload, GlossesPayload,
                       BLOCKS, TERM_GLOSSES};
use brief_core::{Artifact, ArtifactDraft, Capability, EngineError, InvokeContext};
use brief_domain::TermGloss;

pub struct GlossCapability;

#[async_trait]
impl Capability for GlossCapability {
    async fn invoke(&self, inputs: &[Artifact], _ctx: &InvokeContext) -> Result<Vec<ArtifactDraft>, EngineError> {
        let payload: BlocksPayload = decode_payload(require_input(inputs, BLOCKS)?)?;

        let mut glosses: Vec<TermGloss> = Vec::new();
        for block in &payload.blocks {
            for word in block.text.split_whitespace() {
                let cleaned: String = word.chars().filter(|c| c.is_alphabetic()).collect();
                if cleaned.is_empty() {
                    continue;
                }
                if let Some(gloss) = TermGloss::from_builtin(&cleaned, &block.id) {
                    if !glosses.iter().any(|g| g.term == gloss.term) {
                        glosses.push(gloss);
                    }
                }
            }
        }
        log::debug!("glossed {} terms over {} blocks", glosses.len(), payload.blocks.len());
        let confidence = if glosses.is_empty() { 0.5 } else { 0.9 };
        Ok(vec![ArtifactDraft::new(kind(TERM_GLOSSES), encode_payload(&GlossesPayload { glosses })?)
                    .with_confidence(confidence)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brief_core::ArtifactKind;
    use brief_domain::block::split_into_blocks;
    use serde_json::json;

    fn blocks_artifact(text: &str) -> Artifact {
        let blocks = split_into_blocks(text, 5);
        Artifact { kind: ArtifactKind::new(BLOCKS),
                   key: "parse".to_string(),
                   schema_version: 1,
                   revision: 1,
                   payload: serde_json::to_value(BlocksPayload { blocks }).unwrap(),
                   hash: "h".to_string(),
                   confidence: None,
                   provenance: Vec::new() }
    }

    fn ctx() -> InvokeContext {
        InvokeContext { node_id: "gloss".to_string(),
                        params: json!({}),
                        attempt: 1,
                        revision_group: 1 }
    }

    #[tokio::test]
    async fn collects_first_occurrence_of_each_term() {
        let drafts = GlossCapability.invoke(&[blocks_artifact("The statute has a waiver.\n\nAnother statute here.")],
                                            &ctx())
                                    .await
                                    .unwrap();
        let payload: GlossesPayload = serde_json::from_value(drafts[0].payload.clone()).unwrap();
        let terms: Vec<&str> = payload.glosses.iter().map(|g| g.term.as_str()).collect();
        assert_eq!(terms, vec!["statute", "waiver"]);
        assert_eq!(payload.glosses[0].block_id, "b1");
    }

    #[tokio::test]
    async fn no_known_terms_lowers_confidence() {
        let drafts = GlossCapability.invoke(&[blocks_artifact("Nothing special in this text.")], &ctx())
                                    .await
                                    .unwrap();
        assert_eq!(drafts[0].confidence, Some(0.5));
    }
}
