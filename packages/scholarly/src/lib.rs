//! Query-Driven Research Pipeline Engine
//!
//! Given a natural-language query, the engine decides whether an indexed
//! document collection already answers it, and if not fans out to external
//! discovery sources, extracts structured content from the retrieved
//! documents, and hands the result to a synthesis service.
//!
//! # Design
//!
//! - Stateful workflow per request, observable by polling or subscription
//! - Collaborators behind trait seams (sources, knowledge store, synthesis,
//!   extraction backend); swap implementations without touching the engine
//! - Partial failure absorbed where it stays local (one source down, one
//!   document unextractable); synthesis and timeout failures are fatal
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use scholarly::{EngineConfig, EngineDeps, MemoryKnowledgeStore, SourceRegistry, WorkflowEngine};
//! use scholarly::sources::{SemanticScholarSource, SourceExt};
//!
//! let registry = SourceRegistry::new()
//!     .register(Arc::new(SemanticScholarSource::new(None).rate_limited(1)));
//!
//! let engine = Arc::new(WorkflowEngine::new(
//!     EngineDeps {
//!         sources: registry,
//!         knowledge: Arc::new(MemoryKnowledgeStore::new()),
//!         synthesis,
//!         extraction,
//!     },
//!     EngineConfig::default(),
//! ));
//!
//! let id = engine.submit("graph neural networks for chemistry", Some(20))?;
//! let status = engine.get_status(&id)?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - collaborator seams (PaperSource, KnowledgeStore, ...)
//! - [`types`] - data model (Paper, ResearchRequest, ExtractedContent, ...)
//! - [`pipeline`] - discovery, dedup/ranking, extraction, sufficiency
//! - [`engine`] - the workflow state machine
//! - [`sources`] - concrete source clients and rate limiting
//! - [`stores`] - knowledge store implementations
//! - [`cache`] - TTL cache and session lifecycle
//! - [`testing`] - mock implementations for tests

pub mod cache;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod sources;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use cache::{SessionManager, TtlCache};
pub use engine::{EngineDeps, WorkflowEngine};
pub use error::{ExtractError, ResearchError, SourceError};
pub use stores::MemoryKnowledgeStore;
pub use traits::{
    extractor::{ExtractionBackend, RawExtraction},
    knowledge::KnowledgeStore,
    source::{PaperSource, SourceRegistry},
    synthesis::SynthesisService,
};
pub use types::{
    CorpusStats, Document, EngineConfig, ExtractedContent, ExtractionFailure, ExtractionMethod,
    Paper, RequestStatus, ResearchOutcome, ResearchRequest, ScoredDocument, Section,
    StatusSnapshot, SynthesisResult, TopicCluster,
};

// Re-export pipeline components
pub use pipeline::{dedup_and_rank, DiscoveryCoordinator, ExtractionPipeline};

// Re-export source wrappers
pub use sources::{OpenAlexSource, RateLimitedSource, RetryPolicy, SemanticScholarSource, SourceExt};
