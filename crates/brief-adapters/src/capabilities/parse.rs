//! Parser: documento crudo -> bloques.

use async_trait::async_trait;

use crate::artifacts::{decode_payload, encode_payload, kind, require_input, BlocksPayload, RawDocumentPayload,
                       BLOCKS, RAW_DOCUMENT};
use brief_core::{Artifact, ArtifactDraft, Capability, EngineError, InvokeContext};
use brief_domain::block::split_into_blocks;

pub struct ParseCapability;

#[async_trait]
impl Capability for ParseCapability {
    async fn invoke(&self, inputs: &[Artifact], ctx: &InvokeContext) -> Result<Vec<ArtifactDraft>, EngineError> {
        let raw: RawDocumentPayload = decode_payload(require_input(inputs, RAW_DOCUMENT)?)?;
        let min_chars = ctx.params.get("min_chars").and_then(|v| v.as_u64()).unwrap_or(10) as usize;

        let blocks = split_into_blocks(&raw.text, min_chars);
        if blocks.is_empty() {
            return Err(EngineError::AgentExecution("document yields no usable blocks".to_string()));
        }
        log::debug!("parsed {} blocks (min_chars={})", blocks.len(), min_chars);
        Ok(vec![ArtifactDraft::new(kind(BLOCKS), encode_payload(&BlocksPayload { blocks })?).with_confidence(1.0)])
    }
}
