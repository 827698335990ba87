//! Catálogo estándar del pipeline de traducción pública.
//!
//! Forma del grafo (con la capa histórica habilitada):
//!
//!   semilla raw_document -> parse -> gloss ----+
//!                              |               v
//!                              +-> timeline   explain -> narrate
//!                              |        \        \          \
//!                              |         +--------+-> brief (checkpoint)
//!
//! - `timeline` sólo existe con el flag de perfil "history"; su consumo en
//!   `brief` se poda junto con ella.
//! - `narrate` es opcional: su falla degrada el brief, no lo saltea.
//! - `brief` es el checkpoint: su cierre dispara la revisión.

use serde_json::json;

use crate::artifacts::{kind, BLOCKS, CITIZEN_NOTES, EXPLANATIONS, PUBLIC_BRIEF, RAW_DOCUMENT, TERM_GLOSSES, TIMELINE};
use brief_core::{CapabilitySpec, InputSelector};

pub fn standard_catalog() -> Vec<CapabilitySpec> {
    vec![CapabilitySpec::new("parse", "parse_blocks").with_input(InputSelector::any(kind(RAW_DOCUMENT)))
                                                     .with_output(kind(BLOCKS))
                                                     .with_params(json!({"min_chars": 10})),
         CapabilitySpec::new("gloss", "gloss_terms").with_input(InputSelector::any(kind(BLOCKS)))
                                                    .with_output(kind(TERM_GLOSSES)),
         CapabilitySpec::new("timeline", "extract_timeline").with_input(InputSelector::any(kind(BLOCKS)))
                                                            .with_output(kind(TIMELINE))
                                                            .optional()
                                                            .gated_by("history"),
         CapabilitySpec::new("explain", "explain_cards").with_input(InputSelector::any(kind(BLOCKS)))
                                                        .with_input(InputSelector::any(kind(TERM_GLOSSES)))
                                                        .with_output(kind(EXPLANATIONS)),
         CapabilitySpec::new("narrate", "narrate_notes").with_input(InputSelector::any(kind(EXPLANATIONS)))
                                                        .with_output(kind(CITIZEN_NOTES))
                                                        .optional(),
         CapabilitySpec::new("brief", "assemble_brief").with_input(InputSelector::any(kind(EXPLANATIONS)))
                                                       .with_input(InputSelector::any(kind(TERM_GLOSSES)))
                                                       .with_input(InputSelector::any(kind(TIMELINE)))
                                                       .with_input(InputSelector::any(kind(CITIZEN_NOTES)))
                                                       .with_output(kind(PUBLIC_BRIEF))
                                                       .checkpoint()]
}
