//! Discovery source trait and registry.
//!
//! New sources are added by implementing [`PaperSource`] and registering
//! the implementation, rather than ad hoc dispatch: the coordinator only
//! ever sees the capability interface.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::SourceResult;
use crate::types::Paper;

/// A discovery source capable of searching for papers.
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Stable name recorded in `Paper::sources` for provenance.
    fn name(&self) -> &str;

    /// Search the source, returning at most `limit` papers.
    async fn search(&self, query: &str, limit: usize) -> SourceResult<Vec<Paper>>;
}

/// Registry of configured discovery sources.
///
/// The coordinator fans a query out to every registered source; order
/// matters only for remainder allocation when splitting `max_items`.
#[derive(Default, Clone)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn PaperSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source. Returns self for chained construction.
    pub fn register(mut self, source: Arc<dyn PaperSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn sources(&self) -> &[Arc<dyn PaperSource>] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Names of all registered sources.
    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSource;

    #[test]
    fn registry_preserves_registration_order() {
        let registry = SourceRegistry::new()
            .register(Arc::new(MockSource::new("alpha")))
            .register(Arc::new(MockSource::new("beta")));

        assert_eq!(registry.names(), vec!["alpha", "beta"]);
        assert_eq!(registry.len(), 2);
    }
}
