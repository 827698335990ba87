//! brief-adapters: las capacidades externas del pipeline de traducción
//! pública, en versión determinista y en memoria.
//!
//! Ninguna capacidad hace IO externo: cada una deriva su salida únicamente
//! de sus inputs + params, así el mismo documento produce siempre el mismo
//! grafo de artifacts (y los fingerprints de corrida son reproducibles).

pub mod artifacts;
pub mod capabilities;
pub mod catalog;
pub mod registry;

pub use capabilities::{BriefCapability, ExplainCapability, GlossCapability, NarrateCapability, ParseCapability,
                       ProfileClassifier, ReadabilityReviewer, TimelineCapability};
pub use catalog::standard_catalog;
pub use registry::{standard_planner, standard_registry};
