//! Data types for the research pipeline.

pub mod config;
pub mod content;
pub mod document;
pub mod paper;
pub mod request;

pub use config::EngineConfig;
pub use content::{ExtractedContent, ExtractionFailure, ExtractionMethod, Section};
pub use document::{CorpusStats, Document, ScoredDocument, TopicCluster};
pub use paper::Paper;
pub use request::{
    RequestStatus, ResearchOutcome, ResearchRequest, StatusSnapshot, SynthesisResult,
    WorkflowState,
};
