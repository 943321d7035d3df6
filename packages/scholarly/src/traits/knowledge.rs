//! Knowledge store trait for the indexed document collection.
//!
//! The vector-similarity implementation itself is a collaborator concern;
//! the pipeline only depends on this seam. Implementations must support
//! concurrent reads from multiple in-flight requests.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CorpusStats, Document, ScoredDocument, TopicCluster};

#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Return up to `k` documents ranked by similarity to `query`.
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>>;

    /// Index new documents. Returns the number actually added.
    async fn add_documents(&self, documents: Vec<Document>) -> Result<usize>;

    /// Aggregate counts over the indexed corpus.
    async fn stats(&self) -> Result<CorpusStats>;

    /// Topic-cluster summary over the corpus, largest clusters first.
    async fn clusters(&self, max_clusters: usize) -> Result<Vec<TopicCluster>>;
}
