//! Multi-source discovery coordination.
//!
//! Fans a query out to every registered source in parallel, tolerates
//! per-source failure, and reduces the union deterministically through the
//! dedup ranker.

use futures::future::join_all;

use crate::error::{ResearchError, Result};
use crate::pipeline::dedup::dedup_and_rank;
use crate::traits::source::SourceRegistry;
use crate::types::Paper;

/// Coordinates parallel discovery across the registered sources.
pub struct DiscoveryCoordinator {
    registry: SourceRegistry,
}

impl DiscoveryCoordinator {
    pub fn new(registry: SourceRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Discover up to `max_items` papers for a query.
    ///
    /// `max_items` is split evenly across sources (remainder to the first).
    /// A source failing is absorbed: at least one source succeeding is
    /// sufficient to proceed. Only when every source fails does the whole
    /// discovery fail.
    pub async fn discover(&self, query: &str, max_items: usize) -> Result<Vec<Paper>> {
        let sources = self.registry.sources();
        if sources.is_empty() {
            return Err(ResearchError::Discovery(
                "no discovery sources registered".into(),
            ));
        }

        let limits = partition_limits(max_items, sources.len());

        // Sources whose share rounded to zero are not consulted at all.
        let searches = sources
            .iter()
            .zip(limits)
            .filter(|(_, limit)| *limit > 0)
            .map(|(source, limit)| {
                let source = source.clone();
                let query = query.to_string();
                async move {
                    let outcome = source.search(&query, limit).await;
                    (source.name().to_string(), outcome)
                }
            });

        let outcomes = join_all(searches).await;

        let mut collected: Vec<Paper> = Vec::new();
        let mut failures: Vec<String> = Vec::new();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(papers) => {
                    tracing::info!(source = %name, count = papers.len(), "source returned papers");
                    collected.extend(papers);
                }
                Err(e) => {
                    tracing::warn!(source = %name, error = %e, "source failed, continuing without it");
                    failures.push(format!("{name}: {e}"));
                }
            }
        }

        if collected.is_empty() && !failures.is_empty() {
            return Err(ResearchError::Discovery(format!(
                "all sources failed: {}",
                failures.join("; ")
            )));
        }

        Ok(dedup_and_rank(collected, max_items))
    }
}

/// Even split of `max_items` across `n` sources, remainder to the first.
fn partition_limits(max_items: usize, n: usize) -> Vec<usize> {
    let base = max_items / n;
    let remainder = max_items % n;
    (0..n)
        .map(|i| if i == 0 { base + remainder } else { base })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSource;
    use std::sync::Arc;

    fn papers(source: &str, n: usize) -> Vec<Paper> {
        (0..n)
            .map(|i| {
                Paper::new(format!("{source}:{i}"), format!("{source} paper {i}"), source)
                    .with_relevance(1.0 - i as f64 * 0.01)
            })
            .collect()
    }

    #[test]
    fn partition_gives_remainder_to_first_source() {
        assert_eq!(partition_limits(10, 3), vec![4, 3, 3]);
        assert_eq!(partition_limits(10, 2), vec![5, 5]);
        assert_eq!(partition_limits(2, 3), vec![2, 0, 0]);
    }

    #[tokio::test]
    async fn one_failing_source_does_not_fail_discovery() {
        let registry = SourceRegistry::new()
            .register(Arc::new(MockSource::new("down").failing()))
            .register(Arc::new(MockSource::new("up").with_papers(papers("up", 5))));

        let coordinator = DiscoveryCoordinator::new(registry);
        let found = coordinator.discover("query", 10).await.unwrap();
        assert_eq!(found.len(), 5);
    }

    #[tokio::test]
    async fn all_sources_failing_is_fatal() {
        let registry = SourceRegistry::new()
            .register(Arc::new(MockSource::new("a").failing()))
            .register(Arc::new(MockSource::new("b").failing()));

        let coordinator = DiscoveryCoordinator::new(registry);
        let err = coordinator.discover("query", 10).await.unwrap_err();
        assert!(matches!(err, ResearchError::Discovery(_)));
    }

    #[tokio::test]
    async fn results_are_merged_and_truncated() {
        let registry = SourceRegistry::new()
            .register(Arc::new(MockSource::new("a").with_papers(papers("a", 6))))
            .register(Arc::new(MockSource::new("b").with_papers(papers("b", 6))));

        let coordinator = DiscoveryCoordinator::new(registry);
        let found = coordinator.discover("query", 8).await.unwrap();
        assert_eq!(found.len(), 8);
    }

    #[tokio::test]
    async fn sources_receive_partitioned_limits() {
        let a = Arc::new(MockSource::new("a").with_papers(papers("a", 3)));
        let b = Arc::new(MockSource::new("b").with_papers(papers("b", 3)));
        let registry = SourceRegistry::new()
            .register(a.clone())
            .register(b.clone());

        DiscoveryCoordinator::new(registry)
            .discover("query", 7)
            .await
            .unwrap();

        assert_eq!(a.last_limit(), Some(4));
        assert_eq!(b.last_limit(), Some(3));
    }

    #[tokio::test]
    async fn empty_registry_is_an_error() {
        let coordinator = DiscoveryCoordinator::new(SourceRegistry::new());
        assert!(coordinator.discover("query", 5).await.is_err());
    }
}
