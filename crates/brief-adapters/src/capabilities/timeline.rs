//! Capa histórica: bloques -> línea de tiempo de años mencionados.
//! Sólo se planifica con el flag de perfil "history".

use async_trait::async_trait;

use crate::artifacts::{decode_payload, encode_payload, kind, require_input, BlocksPayload, TimelinePayload,
                       BLOCKS, TIMELINE};
use brief_core::{Artifact, ArtifactDraft, Capability, EngineError, InvokeContext};
use brief_domain::timeline::extract_years;
use brief_domain::TimelineEntry;

pub struct TimelineCapability;

#[async_trait]
impl Capability for TimelineCapability {
    async fn invoke(&self, inputs: &[Artifact], _ctx: &InvokeContext) -> Result<Vec<ArtifactDraft>, EngineError> {
        let payload: BlocksPayload = decode_payload(require_input(inputs, BLOCKS)?)?;

        let mut entries: Vec<TimelineEntry> = Vec::new();
        for block in &payload.blocks {
            for entry in extract_years(&block.id, &block.text) {
                if !entries.iter().any(|e| e.year == entry.year && e.block_id == entry.block_id) {
                    entries.push(entry);
                }
            }
        }
        // orden cronológico estable (empates por orden de bloque)
        entries.sort_by_key(|e| (e.year, e.block_id.clone()));
        log::debug!("timeline holds {} entries", entries.len());
        Ok(vec![ArtifactDraft::new(kind(TIMELINE), encode_payload(&TimelinePayload { entries })?).with_confidence(0.8)])
    }
}
