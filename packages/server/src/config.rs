use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
///
/// Read once at process start; treated as immutable for the process
/// lifetime.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Semantic Scholar API key (optional - works keyless at lower rates)
    pub semantic_scholar_api_key: Option<String>,
    /// Contact address for the OpenAlex polite pool (optional)
    pub openalex_mailto: Option<String>,
    /// Remote synthesis service endpoint; when unset a deterministic
    /// digest fallback is used
    pub synthesis_service_url: Option<String>,
    /// Remote OCR service endpoint; when unset the OCR tier is disabled
    pub ocr_service_url: Option<String>,
    pub sufficiency_threshold: usize,
    pub min_relevance: f64,
    pub request_timeout: Duration,
    pub result_ttl: Duration,
    pub session_ttl: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            semantic_scholar_api_key: env::var("SEMANTIC_SCHOLAR_API_KEY").ok(),
            openalex_mailto: env::var("OPENALEX_MAILTO").ok(),
            synthesis_service_url: env::var("SYNTHESIS_SERVICE_URL").ok(),
            ocr_service_url: env::var("OCR_SERVICE_URL").ok(),
            sufficiency_threshold: env::var("SUFFICIENCY_THRESHOLD")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("SUFFICIENCY_THRESHOLD must be a valid number")?,
            min_relevance: env::var("MIN_RELEVANCE")
                .unwrap_or_else(|_| "0.35".to_string())
                .parse()
                .context("MIN_RELEVANCE must be a valid number")?,
            request_timeout: Duration::from_secs(
                env::var("REQUEST_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .context("REQUEST_TIMEOUT_SECS must be a valid number")?,
            ),
            result_ttl: Duration::from_secs(
                env::var("RESULT_TTL_SECS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .context("RESULT_TTL_SECS must be a valid number")?,
            ),
            session_ttl: Duration::from_secs(
                env::var("SESSION_TTL_SECS")
                    .unwrap_or_else(|_| "86400".to_string())
                    .parse()
                    .context("SESSION_TTL_SECS must be a valid number")?,
            ),
        })
    }
}
