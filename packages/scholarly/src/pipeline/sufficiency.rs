//! Knowledge-base sufficiency check.
//!
//! Decides cache-hit vs. full pipeline: when the indexed corpus already
//! holds enough relevant documents for a query, live discovery is skipped
//! entirely.

use crate::error::Result;
use crate::traits::knowledge::KnowledgeStore;

/// Pure function of store state and query; safe to call repeatedly.
///
/// Returns true iff at least `threshold` of the top `k` similarity hits
/// score at or above `min_relevance`.
pub async fn check<K: KnowledgeStore + ?Sized>(
    store: &K,
    query: &str,
    k: usize,
    threshold: usize,
    min_relevance: f64,
) -> Result<bool> {
    let hits = store.similarity_search(query, k).await?;
    let relevant = hits.iter().filter(|h| h.score >= min_relevance).count();

    tracing::debug!(
        query,
        hits = hits.len(),
        relevant,
        threshold,
        "sufficiency check"
    );

    Ok(relevant >= threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryKnowledgeStore;
    use crate::types::Document;

    async fn seeded_store(n: usize) -> MemoryKnowledgeStore {
        let store = MemoryKnowledgeStore::new();
        let docs = (0..n)
            .map(|i| {
                Document::new(
                    format!("{i}"),
                    "Spiking networks",
                    "spiking neural networks spiking neurons spiking",
                )
            })
            .collect();
        store.add_documents(docs).await.unwrap();
        store
    }

    #[tokio::test]
    async fn sufficient_when_enough_relevant_hits() {
        let store = seeded_store(5).await;
        assert!(check(&store, "spiking neurons", 10, 3, 0.01).await.unwrap());
    }

    #[tokio::test]
    async fn insufficient_when_corpus_is_empty() {
        let store = MemoryKnowledgeStore::new();
        assert!(!check(&store, "spiking neurons", 10, 1, 0.01).await.unwrap());
    }

    #[tokio::test]
    async fn relevance_cutoff_filters_weak_hits() {
        let store = seeded_store(5).await;
        // A cutoff above anything term-frequency scoring can produce.
        assert!(!check(&store, "spiking neurons", 10, 1, 0.99).await.unwrap());
    }
}
