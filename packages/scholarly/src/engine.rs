//! Workflow engine: the top-level state machine.
//!
//! One asynchronous task per request drives the stage sequence
//! `CHECKING_KB -> {SYNTHESIZING | DISCOVERING} -> EXTRACTING ->
//! SYNTHESIZING -> COMPLETED`, with any stage able to fail the request.
//! `submit` returns immediately; progress is observed by polling
//! [`WorkflowEngine::get_status`] or through a push subscription.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use uuid::Uuid;

use crate::cache::TtlCache;
use crate::error::{ResearchError, Result};
use crate::pipeline::{discover::DiscoveryCoordinator, extract::ExtractionPipeline, sufficiency};
use crate::traits::extractor::ExtractionBackend;
use crate::traits::knowledge::KnowledgeStore;
use crate::traits::source::SourceRegistry;
use crate::traits::synthesis::SynthesisService;
use crate::types::{
    Document, EngineConfig, ExtractedContent, ExtractionMethod, Paper, RequestStatus,
    ResearchOutcome, ResearchRequest, StatusSnapshot, SynthesisResult, WorkflowState,
};

/// Collaborators the engine composes.
pub struct EngineDeps {
    pub sources: SourceRegistry,
    pub knowledge: Arc<dyn KnowledgeStore>,
    pub synthesis: Arc<dyn SynthesisService>,
    pub extraction: Arc<dyn ExtractionBackend>,
}

/// The workflow engine. Cheap to share via `Arc`; all interior state is
/// guarded for concurrent requests.
pub struct WorkflowEngine {
    config: EngineConfig,
    coordinator: DiscoveryCoordinator,
    knowledge: Arc<dyn KnowledgeStore>,
    synthesis: Arc<dyn SynthesisService>,
    extractor: ExtractionPipeline,
    requests: TtlCache<ResearchRequest>,
    progress: RwLock<HashMap<Uuid, watch::Sender<StatusSnapshot>>>,
}

impl WorkflowEngine {
    pub fn new(deps: EngineDeps, config: EngineConfig) -> Self {
        let extractor = ExtractionPipeline::new(deps.extraction)
            .with_concurrency(config.extract_concurrency)
            .with_min_text_len(config.min_text_len);
        Self {
            coordinator: DiscoveryCoordinator::new(deps.sources),
            knowledge: deps.knowledge,
            synthesis: deps.synthesis,
            extractor,
            requests: TtlCache::new(),
            progress: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create a request and schedule its pipeline. Non-blocking: returns
    /// the request id as soon as the record exists.
    pub fn submit(
        self: &Arc<Self>,
        query: impl Into<String>,
        max_items: Option<usize>,
    ) -> Result<Uuid> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(ResearchError::Validation {
                reason: "query must not be empty".into(),
            });
        }
        if max_items == Some(0) {
            return Err(ResearchError::Validation {
                reason: "max_items must be at least 1".into(),
            });
        }
        let max_items = self.config.clamp_max_items(max_items);

        let request = ResearchRequest::new(query.clone(), max_items);
        let id = request.id;

        let (tx, _rx) = watch::channel(request.snapshot());
        self.progress.write().unwrap().insert(id, tx);
        self.requests
            .put(id.to_string(), request, self.config.result_ttl);

        let engine = self.clone();
        tokio::spawn(async move {
            engine.run_pipeline(id, query, max_items).await;
        });

        tracing::info!(request_id = %id, "research request submitted");
        Ok(id)
    }

    /// Status of a request. Safe to poll repeatedly.
    pub fn get_status(&self, request_id: &Uuid) -> Result<StatusSnapshot> {
        self.requests
            .get(&request_id.to_string())
            .map(|req| req.snapshot())
            .ok_or_else(|| ResearchError::NotFound {
                request_id: request_id.to_string(),
            })
    }

    /// Terminal outcome of a request.
    ///
    /// Pending until `COMPLETED`; a `FAILED` request yields its stored
    /// error message.
    pub fn get_results(&self, request_id: &Uuid) -> Result<ResearchOutcome> {
        let request = self
            .requests
            .get(&request_id.to_string())
            .ok_or_else(|| ResearchError::NotFound {
                request_id: request_id.to_string(),
            })?;

        match request.status {
            RequestStatus::Completed => {
                request.outcome.ok_or_else(|| ResearchError::RequestFailed {
                    message: "completed request has no outcome".into(),
                })
            }
            RequestStatus::Failed => Err(ResearchError::RequestFailed {
                message: request
                    .error
                    .unwrap_or_else(|| "unknown failure".to_string()),
            }),
            other => Err(ResearchError::Pending {
                status: other.step_label().to_string(),
            }),
        }
    }

    /// Push-style progress subscription.
    ///
    /// The receiver holds the latest snapshot immediately and is notified
    /// on every transition.
    pub fn subscribe(&self, request_id: &Uuid) -> Result<watch::Receiver<StatusSnapshot>> {
        if let Some(tx) = self.progress.read().unwrap().get(request_id) {
            return Ok(tx.subscribe());
        }
        // Late subscription to a request whose channel was pruned: seed a
        // fresh channel from the stored record.
        let snapshot = self.get_status(request_id)?;
        let (tx, rx) = watch::channel(snapshot);
        self.progress.write().unwrap().insert(*request_id, tx);
        Ok(rx)
    }

    /// Evict expired requests and orphaned progress channels.
    pub fn sweep(&self) -> usize {
        let removed = self.requests.sweep();
        let mut progress = self.progress.write().unwrap();
        progress.retain(|id, _| self.requests.get(&id.to_string()).is_some());
        removed
    }

    /// Live request records (includes terminal ones not yet expired).
    pub fn request_count(&self) -> usize {
        self.requests.len()
    }

    // =========================================================================
    // Pipeline execution
    // =========================================================================

    async fn run_pipeline(self: Arc<Self>, id: Uuid, query: String, max_items: usize) {
        let timeout = self.config.request_timeout;
        let outcome = tokio::time::timeout(timeout, self.execute(id, &query, max_items)).await;

        match outcome {
            Ok(Ok(outcome)) => self.complete(id, outcome),
            Ok(Err(e)) => self.fail(id, &e.to_string()),
            // The pipeline future is dropped here: outstanding discovery
            // and extraction sub-tasks are abandoned and partial results
            // discarded (all-or-nothing at the request level).
            Err(_) => {
                let e = ResearchError::Timeout {
                    elapsed_ms: timeout.as_millis(),
                };
                self.fail(id, &e.to_string());
            }
        }
    }

    async fn execute(&self, id: Uuid, query: &str, max_items: usize) -> Result<ResearchOutcome> {
        let mut state = WorkflowState::CheckingKb;

        loop {
            self.mark(id, state.status());
            state = self.step(id, state, query, max_items).await?;

            // Terminal marking happens in complete()/fail(), where the
            // outcome or error is attached in the same update.
            if let WorkflowState::Completed(outcome) = state {
                return Ok(outcome);
            }
        }
    }

    /// Advance the tagged state machine by one stage.
    async fn step(
        &self,
        id: Uuid,
        state: WorkflowState,
        query: &str,
        max_items: usize,
    ) -> Result<WorkflowState> {
        let next = match state {
            WorkflowState::Init | WorkflowState::CheckingKb => {
                let sufficient = sufficiency::check(
                    self.knowledge.as_ref(),
                    query,
                    self.config.sufficiency_k,
                    self.config.sufficiency_threshold,
                    self.config.min_relevance,
                )
                .await?;

                if sufficient {
                    tracing::info!(request_id = %id, "knowledge base sufficient, skipping discovery");
                    let contents = self.contents_from_store(query).await?;
                    WorkflowState::Synthesizing {
                        papers: Vec::new(),
                        contents,
                        failures: Vec::new(),
                    }
                } else {
                    WorkflowState::Discovering
                }
            }

            WorkflowState::Discovering => {
                let papers = self.coordinator.discover(query, max_items).await?;
                tracing::info!(request_id = %id, count = papers.len(), "discovery complete");
                WorkflowState::Extracting { papers }
            }

            WorkflowState::Extracting { papers } => {
                let (contents, failures) = self.extractor.extract_all(&papers).await;
                tracing::info!(
                    request_id = %id,
                    extracted = contents.len(),
                    failed = failures.len(),
                    "extraction complete"
                );
                self.index_contents(&papers, &contents).await;
                WorkflowState::Synthesizing {
                    papers,
                    contents,
                    failures,
                }
            }

            WorkflowState::Synthesizing {
                papers,
                contents,
                failures: _,
            } => {
                let synthesis = self
                    .synthesis
                    .synthesize(query, &papers, &contents)
                    .await?;
                let outcome = build_outcome(synthesis, papers.len(), contents.len());
                WorkflowState::Completed(outcome)
            }

            WorkflowState::Completed(outcome) => WorkflowState::Completed(outcome),

            WorkflowState::Failed { error } => {
                return Err(ResearchError::RequestFailed { message: error })
            }
        };
        Ok(next)
    }

    /// Contents for the cache-hit path: the top knowledge-store hits,
    /// passed to synthesis as metadata-shaped content.
    async fn contents_from_store(&self, query: &str) -> Result<Vec<ExtractedContent>> {
        let hits = self
            .knowledge
            .similarity_search(query, self.config.sufficiency_k)
            .await?;

        Ok(hits
            .into_iter()
            .map(|hit| {
                ExtractedContent::new(
                    hit.document.id.clone(),
                    hit.document.title.clone(),
                    hit.document.content.clone(),
                    ExtractionMethod::MetadataOnly,
                )
            })
            .collect())
    }

    /// Index freshly extracted contents so future queries can hit the
    /// knowledge base. Indexing failure is partial degradation, not fatal.
    async fn index_contents(&self, papers: &[Paper], contents: &[ExtractedContent]) {
        let by_id: HashMap<&str, &Paper> = papers
            .iter()
            .map(|p| (p.external_id.as_str(), p))
            .collect();

        let documents: Vec<Document> = contents
            .iter()
            .map(|content| {
                let mut doc = Document::new(
                    content.paper_ref.clone(),
                    content.title.clone(),
                    content.raw_text.clone(),
                )
                .with_meta("paper_id", content.paper_ref.clone())
                .with_meta("extraction_method", content.extraction_method.as_str());

                if let Some(paper) = by_id.get(content.paper_ref.as_str()) {
                    if let Some(venue) = &paper.venue {
                        doc = doc.with_meta("venue", venue.clone());
                    }
                    if !paper.authors.is_empty() {
                        doc = doc.with_meta("authors", paper.authors.join(", "));
                    }
                }
                doc
            })
            .collect();

        if let Err(e) = self.knowledge.add_documents(documents).await {
            tracing::warn!(error = %e, "failed to index extracted contents");
        }
    }

    // =========================================================================
    // State bookkeeping
    // =========================================================================

    /// Apply a transition to the stored record and notify subscribers.
    /// Terminal records are left untouched.
    fn mark(&self, id: Uuid, status: RequestStatus) {
        let updated = self.requests.update(&id.to_string(), |req| {
            req.transition(status);
        });
        if let Some(req) = updated {
            self.notify(id, &req);
        }
    }

    fn complete(&self, id: Uuid, outcome: ResearchOutcome) {
        let key = id.to_string();
        let updated = self.requests.update(&key, |req| {
            if req.transition(RequestStatus::Completed) {
                req.outcome = Some(outcome.clone());
            }
        });
        if let Some(req) = updated {
            // Rewrite the terminal record so its TTL starts now:
            // written once, read many until expiry.
            self.requests
                .put(key, req.clone(), self.config.result_ttl);
            self.notify(id, &req);
            tracing::info!(request_id = %id, quality = req.outcome.as_ref().map(|o| o.quality_score), "request completed");
        }
    }

    fn fail(&self, id: Uuid, message: &str) {
        let updated = self.requests.update(&id.to_string(), |req| {
            if req.transition(RequestStatus::Failed) {
                req.error = Some(message.to_string());
            }
        });
        if let Some(req) = updated {
            self.notify(id, &req);
            tracing::warn!(request_id = %id, error = message, "request failed");
        }
    }

    fn notify(&self, id: Uuid, request: &ResearchRequest) {
        if let Some(tx) = self.progress.read().unwrap().get(&id) {
            // send_replace keeps the stored snapshot current even while
            // nobody is subscribed yet.
            tx.send_replace(request.snapshot());
        }
    }
}

/// Quality heuristic carried over from the original scoring: 25 points
/// each for enough papers, a decent extraction ratio, a substantial
/// summary, and enough key findings.
fn build_outcome(
    synthesis: SynthesisResult,
    papers_found: usize,
    content_extracted: usize,
) -> ResearchOutcome {
    let mut quality_score = 0u8;
    if papers_found >= 5 {
        quality_score += 25;
    }
    let ratio = content_extracted as f64 / papers_found.max(1) as f64;
    if ratio >= 0.3 {
        quality_score += 25;
    }
    if synthesis.summary_len() > 200 {
        quality_score += 25;
    }
    if synthesis.key_findings_count() > 3 {
        quality_score += 25;
    }

    ResearchOutcome {
        synthesis,
        papers_found,
        content_extracted,
        quality_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryKnowledgeStore;
    use crate::testing::{MockBackend, MockSource, MockSynthesis};
    use std::time::Duration;

    fn papers(source: &str, n: usize) -> Vec<Paper> {
        (0..n)
            .map(|i| {
                Paper::new(format!("{source}:{i}"), format!("{source} paper {i}"), source)
                    .with_summary("An abstract long enough to describe the studied problem.")
                    .with_relevance(1.0 - i as f64 * 0.01)
            })
            .collect()
    }

    struct Fixture {
        engine: Arc<WorkflowEngine>,
        source_a: Arc<MockSource>,
        synthesis: Arc<MockSynthesis>,
        knowledge: Arc<MemoryKnowledgeStore>,
    }

    fn fixture(
        source_a: MockSource,
        source_b: Option<MockSource>,
        synthesis: MockSynthesis,
        backend: MockBackend,
        config: EngineConfig,
    ) -> Fixture {
        let source_a = Arc::new(source_a);
        let synthesis = Arc::new(synthesis);
        let knowledge = Arc::new(MemoryKnowledgeStore::new());

        let mut registry = SourceRegistry::new().register(source_a.clone());
        if let Some(b) = source_b {
            registry = registry.register(Arc::new(b));
        }

        let engine = Arc::new(WorkflowEngine::new(
            EngineDeps {
                sources: registry,
                knowledge: knowledge.clone(),
                synthesis: synthesis.clone(),
                extraction: Arc::new(backend),
            },
            config,
        ));

        Fixture {
            engine,
            source_a,
            synthesis,
            knowledge,
        }
    }

    async fn wait_for_terminal(engine: &WorkflowEngine, id: Uuid) -> StatusSnapshot {
        for _ in 0..500 {
            let snapshot = engine.get_status(&id).unwrap();
            if snapshot.status.is_terminal() {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("request never reached a terminal state");
    }

    fn native_text() -> String {
        "word ".repeat(100)
    }

    #[tokio::test]
    async fn full_pipeline_completes() {
        let f = fixture(
            MockSource::new("a").with_papers(papers("a", 6)),
            None,
            MockSynthesis::new(),
            MockBackend::new().with_native_text(native_text()),
            EngineConfig::default(),
        );

        let id = f.engine.submit("graph neural networks", Some(10)).unwrap();
        let snapshot = wait_for_terminal(&f.engine, id).await;

        assert_eq!(snapshot.status, RequestStatus::Completed);
        assert_eq!(snapshot.progress, 100);

        let outcome = f.engine.get_results(&id).unwrap();
        assert_eq!(outcome.papers_found, 6);
        assert_eq!(outcome.content_extracted, 6);
        assert!(outcome.quality_score >= 75);
    }

    #[tokio::test]
    async fn sufficient_knowledge_base_skips_discovery() {
        let f = fixture(
            MockSource::new("a").with_papers(papers("a", 3)),
            None,
            MockSynthesis::new(),
            MockBackend::new().with_native_text(native_text()),
            EngineConfig::default()
                .with_sufficiency_threshold(1)
                .with_min_relevance(0.01),
        );
        f.knowledge
            .add_documents(vec![
                Document::new("d1", "Spiking networks", "spiking neural networks everywhere"),
                Document::new("d2", "More spiking", "spiking neurons spiking models"),
            ])
            .await
            .unwrap();

        let id = f.engine.submit("spiking networks", Some(10)).unwrap();
        let snapshot = wait_for_terminal(&f.engine, id).await;

        assert_eq!(snapshot.status, RequestStatus::Completed);
        // The discovery sources were never consulted.
        assert_eq!(f.source_a.call_count(), 0);
        // Synthesis received knowledge-store contents instead.
        let (_, paper_count, content_count) = f.synthesis.last_call().unwrap();
        assert_eq!(paper_count, 0);
        assert!(content_count > 0);
    }

    #[tokio::test]
    async fn partial_source_failure_still_succeeds() {
        let f = fixture(
            MockSource::new("down").failing(),
            Some(MockSource::new("up").with_papers(papers("up", 5))),
            MockSynthesis::new(),
            MockBackend::new().with_native_text(native_text()),
            EngineConfig::default(),
        );

        let id = f.engine.submit("robustness", Some(10)).unwrap();
        let snapshot = wait_for_terminal(&f.engine, id).await;

        assert_eq!(snapshot.status, RequestStatus::Completed);
        let outcome = f.engine.get_results(&id).unwrap();
        assert_eq!(outcome.papers_found, 5);
    }

    #[tokio::test]
    async fn ocr_fallback_is_recorded_in_the_index() {
        let f = fixture(
            MockSource::new("a").with_papers(papers("a", 2)),
            None,
            MockSynthesis::new(),
            MockBackend::new().failing_native().with_ocr_text(native_text()),
            EngineConfig::default(),
        );

        let id = f.engine.submit("scanned papers", Some(5)).unwrap();
        wait_for_terminal(&f.engine, id).await;

        let stats = f.knowledge.stats().await.unwrap();
        assert_eq!(stats.extraction_methods.get("ocr"), Some(&2));
        assert_eq!(stats.extraction_methods.get("native"), None);
    }

    #[tokio::test]
    async fn synthesis_failure_fails_the_request() {
        let f = fixture(
            MockSource::new("a").with_papers(papers("a", 3)),
            None,
            MockSynthesis::new().failing(),
            MockBackend::new().with_native_text(native_text()),
            EngineConfig::default(),
        );

        let id = f.engine.submit("doomed", Some(5)).unwrap();
        let snapshot = wait_for_terminal(&f.engine, id).await;

        assert_eq!(snapshot.status, RequestStatus::Failed);
        match f.engine.get_results(&id).unwrap_err() {
            ResearchError::RequestFailed { message } => {
                assert!(message.contains("synthesis"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn timeout_fails_and_freezes_the_request() {
        let f = fixture(
            MockSource::new("a").with_papers(papers("a", 3)),
            None,
            MockSynthesis::new().with_delay(Duration::from_secs(60)),
            MockBackend::new().with_native_text(native_text()),
            EngineConfig::default().with_request_timeout(Duration::from_millis(50)),
        );

        let id = f.engine.submit("slow", Some(5)).unwrap();
        let snapshot = wait_for_terminal(&f.engine, id).await;

        assert_eq!(snapshot.status, RequestStatus::Failed);
        match f.engine.get_results(&id).unwrap_err() {
            ResearchError::RequestFailed { message } => assert!(message.contains("timed out")),
            other => panic!("unexpected error: {other}"),
        }

        // Terminal immutability: nothing mutates the record afterwards.
        let frozen = f.engine.get_status(&id).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let later = f.engine.get_status(&id).unwrap();
        assert_eq!(later.status, frozen.status);
        assert_eq!(later.progress, frozen.progress);
    }

    #[tokio::test]
    async fn progress_is_monotonic_across_polls() {
        let f = fixture(
            MockSource::new("a").with_papers(papers("a", 4)),
            None,
            MockSynthesis::new().with_delay(Duration::from_millis(30)),
            MockBackend::new().with_native_text(native_text()),
            EngineConfig::default(),
        );

        let id = f.engine.submit("steady", Some(8)).unwrap();

        let mut last = 0u8;
        loop {
            let snapshot = f.engine.get_status(&id).unwrap();
            assert!(
                snapshot.progress >= last,
                "progress regressed: {} -> {}",
                last,
                snapshot.progress
            );
            last = snapshot.progress;
            if snapshot.status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert_eq!(last, 100);
    }

    #[tokio::test]
    async fn results_are_pending_while_running() {
        let f = fixture(
            MockSource::new("a").with_papers(papers("a", 3)),
            None,
            MockSynthesis::new().with_delay(Duration::from_millis(200)),
            MockBackend::new().with_native_text(native_text()),
            EngineConfig::default(),
        );

        let id = f.engine.submit("patience", Some(5)).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        match f.engine.get_results(&id) {
            Err(ResearchError::Pending { .. }) => {}
            other => panic!("expected pending, got {other:?}"),
        }
        wait_for_terminal(&f.engine, id).await;
    }

    #[tokio::test]
    async fn unknown_request_id_is_not_found() {
        let f = fixture(
            MockSource::new("a"),
            None,
            MockSynthesis::new(),
            MockBackend::new(),
            EngineConfig::default(),
        );

        let missing = Uuid::new_v4();
        assert!(matches!(
            f.engine.get_status(&missing),
            Err(ResearchError::NotFound { .. })
        ));
        assert!(matches!(
            f.engine.get_results(&missing),
            Err(ResearchError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn empty_query_is_rejected_up_front() {
        let f = fixture(
            MockSource::new("a"),
            None,
            MockSynthesis::new(),
            MockBackend::new(),
            EngineConfig::default(),
        );

        assert!(matches!(
            f.engine.submit("   ", Some(5)),
            Err(ResearchError::Validation { .. })
        ));
        assert!(matches!(
            f.engine.submit("ok", Some(0)),
            Err(ResearchError::Validation { .. })
        ));
        assert_eq!(f.engine.request_count(), 0);
    }

    #[tokio::test]
    async fn subscription_sees_terminal_snapshot() {
        let f = fixture(
            MockSource::new("a").with_papers(papers("a", 2)),
            None,
            MockSynthesis::new(),
            MockBackend::new().with_native_text(native_text()),
            EngineConfig::default(),
        );

        let id = f.engine.submit("push", Some(5)).unwrap();
        let mut rx = f.engine.subscribe(&id).unwrap();

        loop {
            if rx.borrow().status.is_terminal() {
                break;
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
        assert_eq!(rx.borrow().status, RequestStatus::Completed);
    }

    #[tokio::test]
    async fn sweep_drops_expired_requests() {
        let f = fixture(
            MockSource::new("a").with_papers(papers("a", 2)),
            None,
            MockSynthesis::new(),
            MockBackend::new().with_native_text(native_text()),
            EngineConfig::default().with_result_ttl(Duration::from_millis(200)),
        );

        let id = f.engine.submit("ephemeral", Some(5)).unwrap();
        wait_for_terminal(&f.engine, id).await;

        tokio::time::sleep(Duration::from_millis(300)).await;
        f.engine.sweep();
        assert_eq!(f.engine.request_count(), 0);
        assert!(matches!(
            f.engine.get_status(&id),
            Err(ResearchError::NotFound { .. })
        ));
    }
}
