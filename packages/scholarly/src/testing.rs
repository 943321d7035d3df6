//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that drive the research
//! pipeline without real network, OCR, or LLM calls.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use crate::error::{ExtractError, ExtractResult, ResearchError, SourceError, SourceResult};
use crate::traits::extractor::{ExtractionBackend, RawExtraction};
use crate::traits::source::PaperSource;
use crate::traits::synthesis::SynthesisService;
use crate::types::{ExtractedContent, Paper, SynthesisResult};

// =============================================================================
// MockSource
// =============================================================================

/// A discovery source with canned results and failure injection.
pub struct MockSource {
    name: String,
    papers: RwLock<Vec<Paper>>,
    /// Calls that should fail before the source starts succeeding.
    /// `usize::MAX` means always fail.
    failures_remaining: AtomicUsize,
    calls: Mutex<Vec<(String, usize)>>,
}

impl MockSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            papers: RwLock::new(Vec::new()),
            failures_remaining: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Set the papers returned by every successful search.
    pub fn with_papers(self, papers: Vec<Paper>) -> Self {
        *self.papers.write().unwrap() = papers;
        self
    }

    /// Fail every call.
    pub fn failing(self) -> Self {
        self.failures_remaining.store(usize::MAX, Ordering::SeqCst);
        self
    }

    /// Fail the first `n` calls, then succeed.
    pub fn failing_times(self, n: usize) -> Self {
        self.failures_remaining.store(n, Ordering::SeqCst);
        self
    }

    /// Number of search calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Limit passed to the most recent search call.
    pub fn last_limit(&self) -> Option<usize> {
        self.calls.lock().unwrap().last().map(|(_, limit)| *limit)
    }
}

#[async_trait]
impl PaperSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &str, limit: usize) -> SourceResult<Vec<Paper>> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), limit));

        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != usize::MAX {
                self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            }
            return Err(SourceError::Api {
                status: 503,
                message: format!("{} unavailable", self.name),
            });
        }

        let mut papers = self.papers.read().unwrap().clone();
        papers.truncate(limit);
        Ok(papers)
    }
}

// =============================================================================
// MockBackend
// =============================================================================

/// An extraction backend with per-tier canned text and failure injection.
pub struct MockBackend {
    native_text: RwLock<Option<String>>,
    ocr_text: RwLock<Option<String>>,
    native_calls: AtomicUsize,
    ocr_calls: AtomicUsize,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Both tiers fail until text is configured.
    pub fn new() -> Self {
        Self {
            native_text: RwLock::new(None),
            ocr_text: RwLock::new(None),
            native_calls: AtomicUsize::new(0),
            ocr_calls: AtomicUsize::new(0),
        }
    }

    /// Text returned by the native tier.
    pub fn with_native_text(self, text: impl Into<String>) -> Self {
        *self.native_text.write().unwrap() = Some(text.into());
        self
    }

    /// Text returned by the OCR tier.
    pub fn with_ocr_text(self, text: impl Into<String>) -> Self {
        *self.ocr_text.write().unwrap() = Some(text.into());
        self
    }

    /// Make the native tier fail.
    pub fn failing_native(self) -> Self {
        *self.native_text.write().unwrap() = None;
        self
    }

    /// Make the OCR tier fail.
    pub fn failing_ocr(self) -> Self {
        *self.ocr_text.write().unwrap() = None;
        self
    }

    pub fn native_calls(&self) -> usize {
        self.native_calls.load(Ordering::SeqCst)
    }

    pub fn ocr_calls(&self) -> usize {
        self.ocr_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractionBackend for MockBackend {
    async fn extract_native(&self, _paper: &Paper) -> ExtractResult<RawExtraction> {
        self.native_calls.fetch_add(1, Ordering::SeqCst);
        match self.native_text.read().unwrap().clone() {
            Some(text) => Ok(RawExtraction::new(text)),
            None => Err(ExtractError::Backend("native extraction failed".into())),
        }
    }

    async fn extract_ocr(&self, _paper: &Paper) -> ExtractResult<RawExtraction> {
        self.ocr_calls.fetch_add(1, Ordering::SeqCst);
        match self.ocr_text.read().unwrap().clone() {
            Some(text) => Ok(RawExtraction::new(text).with_confidence(0.8)),
            None => Err(ExtractError::Backend("OCR extraction failed".into())),
        }
    }
}

// =============================================================================
// MockSynthesis
// =============================================================================

/// A synthesis service returning a canned payload, with failure injection
/// and call recording.
pub struct MockSynthesis {
    result: RwLock<SynthesisResult>,
    fail: AtomicUsize,
    calls: Mutex<Vec<(String, usize, usize)>>,
    delay: RwLock<Option<std::time::Duration>>,
}

impl Default for MockSynthesis {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSynthesis {
    pub fn new() -> Self {
        Self {
            result: RwLock::new(SynthesisResult::new(serde_json::json!({
                "summary": "s".repeat(250),
                "key_findings": ["one", "two", "three", "four"],
            }))),
            fail: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
            delay: RwLock::new(None),
        }
    }

    /// Set the returned payload.
    pub fn with_result(self, result: SynthesisResult) -> Self {
        *self.result.write().unwrap() = result;
        self
    }

    /// Fail every call.
    pub fn failing(self) -> Self {
        self.fail.store(1, Ordering::SeqCst);
        self
    }

    /// Sleep before answering (for timeout tests).
    pub fn with_delay(self, delay: std::time::Duration) -> Self {
        *self.delay.write().unwrap() = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// (query, paper count, content count) of the most recent call.
    pub fn last_call(&self) -> Option<(String, usize, usize)> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SynthesisService for MockSynthesis {
    async fn synthesize(
        &self,
        query: &str,
        papers: &[Paper],
        contents: &[ExtractedContent],
    ) -> Result<SynthesisResult, ResearchError> {
        let delay = *self.delay.read().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), papers.len(), contents.len()));

        if self.fail.load(Ordering::SeqCst) > 0 {
            return Err(ResearchError::Synthesis(
                "mock synthesis failure".to_string().into(),
            ));
        }
        Ok(self.result.read().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_source_truncates_and_records() {
        let source = MockSource::new("mock").with_papers(vec![
            Paper::new("1", "A", "mock"),
            Paper::new("2", "B", "mock"),
            Paper::new("3", "C", "mock"),
        ]);

        let papers = source.search("query", 2).await.unwrap();
        assert_eq!(papers.len(), 2);
        assert_eq!(source.call_count(), 1);
        assert_eq!(source.last_limit(), Some(2));
    }

    #[tokio::test]
    async fn mock_source_failing_times_recovers() {
        let source = MockSource::new("mock")
            .with_papers(vec![Paper::new("1", "A", "mock")])
            .failing_times(2);

        assert!(source.search("q", 1).await.is_err());
        assert!(source.search("q", 1).await.is_err());
        assert!(source.search("q", 1).await.is_ok());
    }

    #[tokio::test]
    async fn mock_synthesis_records_calls() {
        let synthesis = MockSynthesis::new();
        let result = synthesis.synthesize("q", &[], &[]).await.unwrap();
        assert!(result.summary_len() > 200);
        assert_eq!(synthesis.last_call(), Some(("q".to_string(), 0, 0)));
    }
}
