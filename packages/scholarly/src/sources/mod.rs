//! Discovery source implementations.
//!
//! Concrete clients for external paper APIs, plus the rate-limiting
//! wrapper every registered source should go through.

pub mod openalex;
pub mod rate_limited;
pub mod semantic_scholar;

pub use openalex::OpenAlexSource;
pub use rate_limited::{RateLimitedSource, RetryPolicy, SourceExt};
pub use semantic_scholar::SemanticScholarSource;
