//! Registro estándar: nombre de capacidad -> implementación.

use std::sync::Arc;

use crate::capabilities::{BriefCapability, ExplainCapability, GlossCapability, NarrateCapability, ParseCapability,
                          TimelineCapability};
use crate::catalog::standard_catalog;
use brief_core::{CapabilityRegistry, Planner};

/// Registro con las capacidades deterministas del pipeline estándar.
pub fn standard_registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry.register("parse_blocks", Arc::new(ParseCapability));
    registry.register("gloss_terms", Arc::new(GlossCapability));
    registry.register("extract_timeline", Arc::new(TimelineCapability));
    registry.register("explain_cards", Arc::new(ExplainCapability));
    registry.register("narrate_notes", Arc::new(NarrateCapability));
    registry.register("assemble_brief", Arc::new(BriefCapability));
    registry
}

/// Planner armado sobre el catálogo estándar.
pub fn standard_planner() -> Planner {
    Planner::new(standard_catalog())
}
