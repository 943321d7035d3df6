//! Extracted content types.

use serde::{Deserialize, Serialize};

/// Which fallback tier produced an extraction.
///
/// Ordered by priority: the pipeline only reaches a later tier when every
/// earlier tier returned an extraction error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Structured/native text extraction from the document itself.
    Native,
    /// Image-based OCR extraction.
    Ocr,
    /// Title and abstract only, when both content tiers failed.
    MetadataOnly,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Native => "native",
            ExtractionMethod::Ocr => "ocr",
            ExtractionMethod::MetadataOnly => "metadata_only",
        }
    }

    /// Baseline confidence assigned to content produced by this tier.
    pub fn base_confidence(&self) -> f64 {
        match self {
            ExtractionMethod::Native => 0.9,
            ExtractionMethod::Ocr => 0.7,
            ExtractionMethod::MetadataOnly => 0.3,
        }
    }
}

/// A single (heading, body) section of an extracted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub body: String,
}

impl Section {
    pub fn new(heading: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            body: body.into(),
        }
    }
}

/// Structured content extracted from one paper.
///
/// Always references an existing [`Paper`](crate::types::Paper) via
/// `paper_ref` (the paper's `external_id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedContent {
    /// `external_id` of the paper this content came from.
    pub paper_ref: String,

    /// Title carried along for downstream display and indexing.
    pub title: String,

    pub raw_text: String,

    /// Ordered (heading, body) sections parsed from the raw text.
    pub sections: Vec<Section>,

    pub extraction_method: ExtractionMethod,

    /// 0.0-1.0, derived from the tier that produced the text.
    pub extraction_confidence: f64,
}

impl ExtractedContent {
    pub fn new(
        paper_ref: impl Into<String>,
        title: impl Into<String>,
        raw_text: impl Into<String>,
        method: ExtractionMethod,
    ) -> Self {
        Self {
            paper_ref: paper_ref.into(),
            title: title.into(),
            raw_text: raw_text.into(),
            sections: Vec::new(),
            extraction_method: method,
            extraction_confidence: method.base_confidence(),
        }
    }

    /// Attach parsed sections.
    pub fn with_sections(mut self, sections: Vec<Section>) -> Self {
        self.sections = sections;
        self
    }

    /// Override the confidence score.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.extraction_confidence = confidence;
        self
    }

    pub fn word_count(&self) -> usize {
        self.raw_text.split_whitespace().count()
    }
}

/// A paper whose extraction exhausted every tier.
///
/// Recorded for result metadata; never fatal to the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionFailure {
    pub paper_ref: String,
    pub title: String,
    pub reason: String,
}
