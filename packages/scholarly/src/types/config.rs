//! Engine configuration.

use std::time::Duration;

/// Configuration for the workflow engine and its pipeline stages.
///
/// Read once at process start and treated as immutable for the process
/// lifetime.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum count of relevant indexed documents below which live
    /// discovery is triggered.
    pub sufficiency_threshold: usize,

    /// Minimum similarity score for a knowledge-store hit to count toward
    /// the sufficiency threshold.
    pub min_relevance: f64,

    /// How many knowledge-store documents to examine for sufficiency (and
    /// to feed synthesis on the cache-hit path).
    pub sufficiency_k: usize,

    /// Upper bound a caller may request via `max_items`.
    pub max_items_cap: usize,

    /// Default `max_items` when the caller does not specify one.
    pub default_max_items: usize,

    /// Wall-clock budget for a whole request; exceeding it abandons the
    /// pipeline and fails the request.
    pub request_timeout: Duration,

    /// Concurrent per-document extraction workers.
    pub extract_concurrency: usize,

    /// Minimum characters a content tier must produce to count as success.
    pub min_text_len: usize,

    /// TTL for terminal request records in the request cache.
    pub result_ttl: Duration,

    /// TTL for sessions (sliding, extended on validated activity).
    pub session_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sufficiency_threshold: 3,
            min_relevance: 0.35,
            sufficiency_k: 10,
            max_items_cap: 50,
            default_max_items: 10,
            request_timeout: Duration::from_secs(300),
            extract_concurrency: 4,
            min_text_len: 200,
            result_ttl: Duration::from_secs(3600),
            session_ttl: Duration::from_secs(24 * 3600),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sufficiency threshold.
    pub fn with_sufficiency_threshold(mut self, threshold: usize) -> Self {
        self.sufficiency_threshold = threshold;
        self
    }

    /// Set the minimum relevance cutoff.
    pub fn with_min_relevance(mut self, cutoff: f64) -> Self {
        self.min_relevance = cutoff;
        self
    }

    /// Set the per-request wall-clock budget.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the extraction worker count.
    pub fn with_extract_concurrency(mut self, workers: usize) -> Self {
        self.extract_concurrency = workers.max(1);
        self
    }

    /// Set the terminal-result TTL.
    pub fn with_result_ttl(mut self, ttl: Duration) -> Self {
        self.result_ttl = ttl;
        self
    }

    /// Set the session TTL.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Clamp a caller-supplied `max_items` into the allowed range.
    pub fn clamp_max_items(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_max_items)
            .min(self.max_items_cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = EngineConfig::default();
        assert_eq!(config.sufficiency_threshold, 3);
        assert!(config.min_relevance > 0.0 && config.min_relevance < 1.0);
        assert!(config.extract_concurrency >= 1);
    }

    #[test]
    fn clamp_respects_cap_and_default() {
        let config = EngineConfig::default();
        assert_eq!(config.clamp_max_items(None), config.default_max_items);
        assert_eq!(config.clamp_max_items(Some(10_000)), config.max_items_cap);
        assert_eq!(config.clamp_max_items(Some(5)), 5);
    }
}
