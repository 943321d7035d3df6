//! Core trait abstractions (collaborator seams).
//!
//! These are infrastructure seams only - no business logic. The pipeline
//! composes them; applications and tests swap implementations.

pub mod extractor;
pub mod knowledge;
pub mod source;
pub mod synthesis;

pub use extractor::{ExtractionBackend, RawExtraction};
pub use knowledge::KnowledgeStore;
pub use source::{PaperSource, SourceRegistry};
pub use synthesis::SynthesisService;
