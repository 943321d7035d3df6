//! Knowledge-store document types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// A document indexed in the knowledge store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier (paper external id, upload filename, ...).
    pub id: String,
    pub title: String,
    pub content: String,
    /// SHA-256 of the content, for change detection on re-index.
    pub content_hash: String,
    /// Free-form metadata: venue, authors, extraction_method, ...
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub indexed_at: DateTime<Utc>,
}

impl Document {
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: id.into(),
            title: title.into(),
            content_hash: Self::hash_content(&content),
            content,
            metadata: HashMap::new(),
            indexed_at: Utc::now(),
        }
    }

    /// Hash content for change detection.
    pub fn hash_content(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Attach a metadata field.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A similarity-search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: Document,
    /// Similarity score, 0.0-1.0.
    pub score: f64,
}

/// Aggregate counts over the indexed corpus.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusStats {
    pub total_documents: usize,
    pub unique_papers: usize,
    pub unique_authors: usize,
    /// (venue, document count), most frequent first.
    pub top_venues: Vec<(String, usize)>,
    /// Documents per extraction method.
    pub extraction_methods: HashMap<String, usize>,
}

/// A topic cluster over the corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicCluster {
    /// Representative terms for the cluster.
    pub label: String,
    /// Number of documents in the cluster.
    pub size: usize,
}
