//! Synthesis service trait.
//!
//! The language-model call that produces the final analysis is an external
//! collaborator; the engine treats its payload as opaque and attaches it
//! immutably to the completed request.

use async_trait::async_trait;

use crate::error::ResearchError;
use crate::types::{ExtractedContent, Paper, SynthesisResult};

#[async_trait]
pub trait SynthesisService: Send + Sync {
    /// Produce a synthesized analysis for the query over the given papers
    /// and extracted contents.
    ///
    /// A failure here is fatal to the request; no later stage runs once
    /// synthesis fails.
    async fn synthesize(
        &self,
        query: &str,
        papers: &[Paper],
        contents: &[ExtractedContent],
    ) -> Result<SynthesisResult, ResearchError>;
}
