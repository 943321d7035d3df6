//! Extraction backend trait.
//!
//! OCR and text-extraction library internals are collaborator concerns;
//! the pipeline drives the tier chain through this seam. Each method
//! corresponds to one content tier; the metadata-only tier needs no
//! backend (it is built from the paper record itself).

use async_trait::async_trait;

use crate::error::ExtractResult;
use crate::types::Paper;

/// Raw text produced by a backend tier, before section parsing.
#[derive(Debug, Clone)]
pub struct RawExtraction {
    pub text: String,
    /// Backend's own confidence in the text, 0.0-1.0. The pipeline combines
    /// this with the tier's baseline.
    pub confidence: f64,
}

impl RawExtraction {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: 1.0,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }
}

#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Structured/native text extraction from the document.
    async fn extract_native(&self, paper: &Paper) -> ExtractResult<RawExtraction>;

    /// Image-based (OCR) extraction, attempted only after the native tier
    /// returned an extraction error.
    async fn extract_ocr(&self, paper: &Paper) -> ExtractResult<RawExtraction>;
}
