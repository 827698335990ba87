//! Narrador en voz ciudadana: tarjetas -> notas "qué significa para vos".
//!
//! Nodo opcional del catálogo estándar: si falla, el brief sale sin la
//! sección ciudadana en lugar de no salir.

use async_trait::async_trait;

use crate::artifacts::{decode_payload, encode_payload, kind, require_input, CardsPayload, NotesPayload,
                       CITIZEN_NOTES, EXPLANATIONS};
use brief_core::{Artifact, ArtifactDraft, Capability, EngineError, InvokeContext};

pub struct NarrateCapability;

#[async_trait]
impl Capability for NarrateCapability {
    async fn invoke(&self, inputs: &[Artifact], _ctx: &InvokeContext) -> Result<Vec<ArtifactDraft>, EngineError> {
        let cards: CardsPayload = decode_payload(require_input(inputs, EXPLANATIONS)?)?;
        if cards.cards.is_empty() {
            return Err(EngineError::AgentExecution("no explanation cards to narrate".to_string()));
        }
        let notes: Vec<String> = cards.cards
                                      .iter()
                                      .map(|c| format!("In everyday terms: {}", c.claim))
                                      .collect();
        Ok(vec![ArtifactDraft::new(kind(CITIZEN_NOTES), encode_payload(&NotesPayload { notes })?).with_confidence(0.7)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brief_core::ArtifactKind;
    use brief_domain::{ExplanationCard, ExplanationLevel};
    use serde_json::json;

    #[tokio::test]
    async fn one_note_per_card() {
        let cards = CardsPayload { cards: vec![ExplanationCard { level: ExplanationLevel::OneSentence,
                                                                 claim: "Noise limits drop".to_string(),
                                                                 rationale: "r".to_string(),
                                                                 confidence: 0.8 }] };
        let artifact = Artifact { kind: ArtifactKind::new(EXPLANATIONS),
                                  key: "explain".to_string(),
                                  schema_version: 1,
                                  revision: 1,
                                  payload: serde_json::to_value(&cards).unwrap(),
                                  hash: "h".to_string(),
                                  confidence: None,
                                  provenance: Vec::new() };
        let ctx = InvokeContext { node_id: "narrate".to_string(),
                                  params: json!({}),
                                  attempt: 1,
                                  revision_group: 1 };
        let drafts = NarrateCapability.invoke(&[artifact], &ctx).await.unwrap();
        let payload: NotesPayload = serde_json::from_value(drafts[0].payload.clone()).unwrap();
        assert_eq!(payload.notes, vec!["In everyday terms: Noise limits drop".to_string()]);
    }
}
