// brief-domain library entry point
pub mod block;
pub mod brief;
pub mod document;
pub mod error;
pub mod explanation;
pub mod readability;
pub mod review;
pub mod term;
pub mod timeline;

pub use block::ParsedBlock;
pub use brief::{BriefSection, PublicBrief};
pub use document::RawDocument;
pub use error::DomainError;
pub use explanation::{ExplanationCard, ExplanationLevel};
pub use readability::readability_score;
pub use review::ReviewCriteria;
pub use term::TermGloss;
pub use timeline::TimelineEntry;
