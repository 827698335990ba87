//! Armador del brief público: tarjetas + glosas (+ extras) -> entregable.
//!
//! Los inputs opcionales (línea de tiempo, notas ciudadanas) enriquecen el
//! brief cuando llegaron; su ausencia degrada la salida, no la falla.

use async_trait::async_trait;
use serde_json::json;

use crate::artifacts::{decode_payload, encode_payload, find_input, kind, require_input, CardsPayload,
                       GlossesPayload, NotesPayload, TimelinePayload, CITIZEN_NOTES, EXPLANATIONS, PUBLIC_BRIEF,
                       TERM_GLOSSES, TIMELINE};
use brief_core::{Artifact, ArtifactDraft, Capability, EngineError, InvokeContext};
use brief_domain::brief::BriefSection;
use brief_domain::{ExplanationCard, ExplanationLevel, PublicBrief};

pub struct BriefCapability;

#[async_trait]
impl Capability for BriefCapability {
    async fn invoke(&self, inputs: &[Artifact], ctx: &InvokeContext) -> Result<Vec<ArtifactDraft>, EngineError> {
        let cards: CardsPayload = decode_payload(require_input(inputs, EXPLANATIONS)?)?;
        let glosses: GlossesPayload = decode_payload(require_input(inputs, TERM_GLOSSES)?)?;
        let timeline: Option<TimelinePayload> = match find_input(inputs, TIMELINE) {
            Some(a) => Some(decode_payload(a)?),
            None => None,
        };
        let notes: Option<NotesPayload> = match find_input(inputs, CITIZEN_NOTES) {
            Some(a) => Some(decode_payload(a)?),
            None => None,
        };

        let one = ExplanationCard::select_level(&cards.cards, ExplanationLevel::OneSentence)
                      .or_else(|| cards.cards.first())
                      .ok_or_else(|| EngineError::AgentExecution("no explanation cards for the brief".to_string()))?;
        let three = ExplanationCard::select_level(&cards.cards, ExplanationLevel::ThreeParagraph).unwrap_or(one);
        let deep = ExplanationCard::select_level(&cards.cards, ExplanationLevel::DeepDive).unwrap_or(three);

        let mut sections = vec![BriefSection { id: "summary".to_string(),
                                               title: "Summary".to_string(),
                                               content: three.rationale.clone() },
                                BriefSection { id: "deep_dive".to_string(),
                                               title: "In depth".to_string(),
                                               content: deep.rationale.clone() }];
        if !glosses.glosses.is_empty() {
            let content = glosses.glosses
                                 .iter()
                                 .map(|g| format!("{}: {}.", g.term, g.gloss))
                                 .collect::<Vec<String>>()
                                 .join(" ");
            sections.push(BriefSection { id: "key_terms".to_string(),
                                         title: "Key terms".to_string(),
                                         content });
        }
        if let Some(timeline) = &timeline {
            if !timeline.entries.is_empty() {
                let content = timeline.entries
                                      .iter()
                                      .map(|e| format!("{}: {}.", e.year, e.context.trim()))
                                      .collect::<Vec<String>>()
                                      .join(" ");
                sections.push(BriefSection { id: "timeline".to_string(),
                                             title: "Timeline".to_string(),
                                             content });
            }
        }
        if let Some(notes) = &notes {
            if !notes.notes.is_empty() {
                sections.push(BriefSection { id: "what_it_means".to_string(),
                                             title: "What it means for you".to_string(),
                                             content: notes.notes.join(" ") });
            }
        }

        let input_confidence = inputs.iter()
                                     .filter_map(|a| a.confidence)
                                     .fold(1.0f64, f64::min);
        let brief = PublicBrief { title: one.claim.clone(),
                                  summary: one.rationale.clone(),
                                  sections,
                                  meta: json!({
                                      "num_cards": cards.cards.len(),
                                      "num_glosses": glosses.glosses.len(),
                                      "num_timeline": timeline.as_ref().map(|t| t.entries.len()).unwrap_or(0),
                                      "has_citizen_notes": notes.as_ref().map(|n| !n.notes.is_empty()).unwrap_or(false),
                                      "input_confidence": input_confidence,
                                      "group": ctx.revision_group,
                                  }) };
        brief.validate().map_err(|e| EngineError::AgentExecution(format!("brief assembly: {e}")))?;

        Ok(vec![ArtifactDraft::new(kind(PUBLIC_BRIEF), encode_payload(&brief)?).with_confidence(input_confidence)])
    }
}
