//! Pipeline stages composed by the workflow engine.

pub mod dedup;
pub mod discover;
pub mod extract;
pub mod sufficiency;

pub use dedup::dedup_and_rank;
pub use discover::DiscoveryCoordinator;
pub use extract::{clean_text, parse_sections, ExtractionPipeline};
