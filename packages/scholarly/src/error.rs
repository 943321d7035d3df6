//! Typed errors for the research pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that can occur during research operations.
#[derive(Debug, Error)]
pub enum ResearchError {
    /// Bad query or parameters - rejected before the pipeline starts, never retried
    #[error("invalid request: {reason}")]
    Validation { reason: String },

    /// Every configured discovery source failed for this request
    #[error("discovery failed: {0}")]
    Discovery(String),

    /// External synthesis service failed - fatal to the request
    #[error("synthesis error: {0}")]
    Synthesis(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Request exceeded its wall-clock budget - fatal, request abandoned
    #[error("request timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u128 },

    /// Unknown or expired request id (client-facing signal, not a server fault)
    #[error("request not found: {request_id}")]
    NotFound { request_id: String },

    /// Results requested before the request reached a terminal state
    #[error("request not ready: {status}")]
    Pending { status: String },

    /// Results requested for a request that terminated in FAILED
    #[error("request failed: {message}")]
    RequestFailed { message: String },

    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

/// Errors from a single discovery source.
///
/// These are absorbed by the coordinator: one source failing never fails
/// the request as long as another source succeeds.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP transport failure
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Upstream API returned a non-success status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Upstream signalled rate limiting (429 or equivalent)
    #[error("rate limited by source")]
    RateLimited,

    /// Retry budget exhausted - source excluded for this request
    #[error("retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// Response body did not match the expected shape
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl SourceError {
    /// Whether another attempt against this source may succeed.
    ///
    /// Validation-shaped API errors (4xx other than 429) will fail the
    /// same way on retry; transport errors and rate limits may clear.
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Http(_) | SourceError::RateLimited => true,
            SourceError::Api { status, .. } => *status == 429 || *status >= 500,
            SourceError::RetriesExhausted { .. } | SourceError::MalformedResponse(_) => false,
        }
    }
}

/// Errors from a single extraction tier for a single document.
///
/// These fall through the tier chain; a document that exhausts every tier
/// is recorded as a failure and excluded from synthesis, never fatal.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Document could not be downloaded
    #[error("download failed: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Content type this tier cannot handle
    #[error("unsupported content type: {content_type}")]
    Unsupported { content_type: String },

    /// Tier produced too little text to be useful
    #[error("extracted text too short ({chars} chars)")]
    EmptyText { chars: usize },

    /// Backend (OCR service, parser) failed or is not configured
    #[error("extraction backend error: {0}")]
    Backend(String),

    /// Paper has no usable document URL
    #[error("no document URL for paper")]
    NoDocument,
}

/// Result type alias for research operations.
pub type Result<T> = std::result::Result<T, ResearchError>;

/// Result type alias for discovery-source operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Result type alias for extraction-tier operations.
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;
