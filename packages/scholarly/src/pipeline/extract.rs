//! Content extraction pipeline with tiered fallback.
//!
//! Per document: native text extraction first, OCR second, metadata-only
//! (title + abstract) last. Documents are independent, so extraction fans
//! out to a bounded worker pool; results are reduced deterministically
//! before the next stage.

use regex::Regex;
use std::sync::Arc;
use std::sync::OnceLock;
use tokio::sync::Semaphore;

use crate::error::ExtractError;
use crate::traits::extractor::ExtractionBackend;
use crate::types::{ExtractedContent, ExtractionFailure, ExtractionMethod, Paper, Section};

/// Drives the per-document fallback chain.
pub struct ExtractionPipeline {
    backend: Arc<dyn ExtractionBackend>,
    /// Concurrent per-document workers.
    concurrency: usize,
    /// Minimum characters a content tier must yield to count as success.
    min_text_len: usize,
}

impl ExtractionPipeline {
    pub fn new(backend: Arc<dyn ExtractionBackend>) -> Self {
        Self {
            backend,
            concurrency: 4,
            min_text_len: 200,
        }
    }

    /// Set the worker count.
    pub fn with_concurrency(mut self, workers: usize) -> Self {
        self.concurrency = workers.max(1);
        self
    }

    /// Set the minimum text length.
    pub fn with_min_text_len(mut self, len: usize) -> Self {
        self.min_text_len = len;
        self
    }

    /// Extract a single paper through the tier chain.
    ///
    /// Each tier is attempted only after the prior tier raised an
    /// extraction error; the first success sets the method and stops the
    /// chain. Exhausting every tier yields an [`ExtractionFailure`].
    pub async fn extract(&self, paper: &Paper) -> Result<ExtractedContent, ExtractionFailure> {
        let native_err = match self.try_tier(paper, ExtractionMethod::Native).await {
            Ok(content) => return Ok(content),
            Err(e) => e,
        };

        tracing::debug!(paper = %paper.external_id, error = %native_err, "native tier failed, trying OCR");
        let ocr_err = match self.try_tier(paper, ExtractionMethod::Ocr).await {
            Ok(content) => return Ok(content),
            Err(e) => e,
        };

        tracing::debug!(paper = %paper.external_id, error = %ocr_err, "OCR tier failed, trying metadata");
        match metadata_fallback(paper) {
            Some(content) => Ok(content),
            None => Err(ExtractionFailure {
                paper_ref: paper.external_id.clone(),
                title: paper.title.clone(),
                reason: format!("native: {native_err}; ocr: {ocr_err}; no abstract available"),
            }),
        }
    }

    async fn try_tier(
        &self,
        paper: &Paper,
        method: ExtractionMethod,
    ) -> Result<ExtractedContent, ExtractError> {
        let raw = match method {
            ExtractionMethod::Native => self.backend.extract_native(paper).await?,
            ExtractionMethod::Ocr => self.backend.extract_ocr(paper).await?,
            ExtractionMethod::MetadataOnly => unreachable!("metadata tier uses no backend"),
        };

        let text = clean_text(&raw.text);
        if text.len() < self.min_text_len {
            return Err(ExtractError::EmptyText { chars: text.len() });
        }

        let sections = parse_sections(&text);
        Ok(
            ExtractedContent::new(&paper.external_id, &paper.title, text, method)
                .with_sections(sections)
                .with_confidence(method.base_confidence() * raw.confidence),
        )
    }

    /// Extract many papers with bounded parallelism.
    ///
    /// Failures are per-document and absorbed; the returned lists are
    /// sorted by paper reference so downstream stages see a deterministic
    /// order regardless of completion order.
    pub async fn extract_all(
        &self,
        papers: &[Paper],
    ) -> (Vec<ExtractedContent>, Vec<ExtractionFailure>) {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let tasks = papers.iter().cloned().map(|paper| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = semaphore.acquire().await.unwrap();
                self.extract(&paper).await
            }
        });

        let outcomes = futures::future::join_all(tasks).await;

        let mut contents = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(content) => contents.push(content),
                Err(failure) => {
                    tracing::warn!(
                        paper = %failure.paper_ref,
                        reason = %failure.reason,
                        "extraction exhausted all tiers"
                    );
                    failures.push(failure);
                }
            }
        }

        contents.sort_by(|a, b| a.paper_ref.cmp(&b.paper_ref));
        failures.sort_by(|a, b| a.paper_ref.cmp(&b.paper_ref));
        (contents, failures)
    }
}

/// Title + abstract, when both content tiers failed.
fn metadata_fallback(paper: &Paper) -> Option<ExtractedContent> {
    let summary = paper.summary.trim();
    if summary.is_empty() {
        return None;
    }
    let text = format!("{}\n\n{}", paper.title, summary);
    let sections = vec![Section::new("Abstract", summary)];
    Some(
        ExtractedContent::new(
            &paper.external_id,
            &paper.title,
            text,
            ExtractionMethod::MetadataOnly,
        )
        .with_sections(sections),
    )
}

fn heading_patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // Numbered headings: "3. Results", "2 Methods"
            Regex::new(r"^\d+\.?\s+[A-Z][^.]{0,80}$").unwrap(),
            // ALL-CAPS lines
            Regex::new(r"^[A-Z][A-Z\s]{3,60}$").unwrap(),
            // Common academic section names
            Regex::new(
                r"(?i)^(abstract|introduction|background|related work|methods?|methodology|experiments?|results|discussion|conclusions?|references|acknowledg\w*)\b.{0,40}$",
            )
            .unwrap(),
        ]
    })
}

/// Split cleaned text into (heading, body) sections.
///
/// Text before the first detected heading becomes an untitled leading
/// section so nothing is dropped.
pub fn parse_sections(text: &str) -> Vec<Section> {
    let patterns = heading_patterns();
    let mut sections: Vec<Section> = Vec::new();
    let mut heading = String::new();
    let mut body: Vec<&str> = Vec::new();

    let flush = |heading: &mut String, body: &mut Vec<&str>, sections: &mut Vec<Section>| {
        if !body.is_empty() || !heading.is_empty() {
            sections.push(Section::new(heading.clone(), body.join(" ")));
        }
        heading.clear();
        body.clear();
    };

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if patterns.iter().any(|p| p.is_match(line)) {
            flush(&mut heading, &mut body, &mut sections);
            heading = line.to_string();
        } else {
            body.push(line);
        }
    }
    flush(&mut heading, &mut body, &mut sections);
    sections
}

/// Normalize extracted text: collapse whitespace runs, strip page markers,
/// fix the common OCR ligatures.
pub fn clean_text(text: &str) -> String {
    static PAGE_MARKER: OnceLock<Regex> = OnceLock::new();
    static BLANK_RUNS: OnceLock<Regex> = OnceLock::new();
    static SPACE_RUNS: OnceLock<Regex> = OnceLock::new();

    let page = PAGE_MARKER.get_or_init(|| Regex::new(r"\n--- Page \d+ ---\n").unwrap());
    let blanks = BLANK_RUNS.get_or_init(|| Regex::new(r"\n\s*\n").unwrap());
    let spaces = SPACE_RUNS.get_or_init(|| Regex::new(r" +").unwrap());

    let text = text.replace('\u{fb01}', "fi").replace('\u{fb02}', "fl");
    let text = page.replace_all(&text, "\n");
    let text = blanks.replace_all(&text, "\n\n");
    let text = spaces.replace_all(&text, " ");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBackend;

    fn paper_with_abstract(id: &str) -> Paper {
        Paper::new(id, format!("Paper {id}"), "test")
            .with_summary("A sufficiently detailed abstract describing the work.")
            .with_url(format!("https://example.org/{id}.pdf"))
    }

    fn long_text(marker: &str) -> String {
        format!("{marker} ").repeat(60)
    }

    #[tokio::test]
    async fn native_success_stops_the_chain() {
        let backend = Arc::new(MockBackend::new().with_native_text(long_text("native")));
        let pipeline = ExtractionPipeline::new(backend.clone());

        let content = pipeline.extract(&paper_with_abstract("p1")).await.unwrap();
        assert_eq!(content.extraction_method, ExtractionMethod::Native);
        assert_eq!(backend.ocr_calls(), 0);
    }

    #[tokio::test]
    async fn native_failure_falls_through_to_ocr() {
        let backend = Arc::new(
            MockBackend::new()
                .failing_native()
                .with_ocr_text(long_text("ocr")),
        );
        let pipeline = ExtractionPipeline::new(backend);

        let content = pipeline.extract(&paper_with_abstract("p1")).await.unwrap();
        assert_eq!(content.extraction_method, ExtractionMethod::Ocr);
    }

    #[tokio::test]
    async fn both_tiers_failing_falls_back_to_metadata() {
        let backend = Arc::new(MockBackend::new().failing_native().failing_ocr());
        let pipeline = ExtractionPipeline::new(backend);

        let content = pipeline.extract(&paper_with_abstract("p1")).await.unwrap();
        assert_eq!(content.extraction_method, ExtractionMethod::MetadataOnly);
        assert!(content.raw_text.contains("sufficiently detailed abstract"));
    }

    #[tokio::test]
    async fn exhausted_tiers_without_abstract_record_a_failure() {
        let backend = Arc::new(MockBackend::new().failing_native().failing_ocr());
        let pipeline = ExtractionPipeline::new(backend);
        let paper = Paper::new("p1", "No Abstract", "test");

        let failure = pipeline.extract(&paper).await.unwrap_err();
        assert_eq!(failure.paper_ref, "p1");
        assert!(failure.reason.contains("native"));
    }

    #[tokio::test]
    async fn short_native_text_counts_as_tier_failure() {
        let backend = Arc::new(
            MockBackend::new()
                .with_native_text("too short")
                .with_ocr_text(long_text("ocr")),
        );
        let pipeline = ExtractionPipeline::new(backend);

        let content = pipeline.extract(&paper_with_abstract("p1")).await.unwrap();
        assert_eq!(content.extraction_method, ExtractionMethod::Ocr);
    }

    #[tokio::test]
    async fn extract_all_reduces_deterministically() {
        let backend = Arc::new(MockBackend::new().with_native_text(long_text("body")));
        let pipeline = ExtractionPipeline::new(backend).with_concurrency(2);

        let papers: Vec<Paper> = ["c", "a", "b"]
            .iter()
            .map(|id| paper_with_abstract(id))
            .collect();

        let (contents, failures) = pipeline.extract_all(&papers).await;
        assert!(failures.is_empty());
        let refs: Vec<&str> = contents.iter().map(|c| c.paper_ref.as_str()).collect();
        assert_eq!(refs, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn extract_all_absorbs_per_document_failures() {
        // Both content tiers fail: papers with abstracts land on the
        // metadata tier, the one without exhausts the chain.
        let backend = Arc::new(MockBackend::new().failing_native().failing_ocr());
        let pipeline = ExtractionPipeline::new(backend);

        let mut papers: Vec<Paper> =
            ["a", "b"].iter().map(|id| paper_with_abstract(id)).collect();
        papers.push(Paper::new("z", "Broken", "test"));

        let (contents, failures) = pipeline.extract_all(&papers).await;
        assert_eq!(contents.len(), 2);
        assert!(contents
            .iter()
            .all(|c| c.extraction_method == ExtractionMethod::MetadataOnly));
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].paper_ref, "z");
    }

    #[test]
    fn sections_split_on_academic_headings() {
        let text = "Preamble line\nIntroduction\nWe introduce things here\n2. Methods\nWe did things\nRESULTS\nIt worked";
        let sections = parse_sections(text);

        assert_eq!(sections.len(), 4);
        assert_eq!(sections[0].heading, "");
        assert_eq!(sections[1].heading, "Introduction");
        assert_eq!(sections[2].heading, "2. Methods");
        assert_eq!(sections[3].heading, "RESULTS");
        assert_eq!(sections[3].body, "It worked");
    }

    #[test]
    fn clean_text_fixes_ligatures_and_markers() {
        let dirty = "The \u{fb01}rst   line\n--- Page 3 ---\nnext";
        let cleaned = clean_text(dirty);
        assert!(cleaned.contains("first line"));
        assert!(!cleaned.contains("Page 3"));
    }
}
