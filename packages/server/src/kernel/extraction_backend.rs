//! HTTP-backed extraction tiers.
//!
//! Native tier: fetch the document and take text from HTML or plain-text
//! responses. OCR tier: delegate to a remote OCR service when one is
//! configured; unset means the tier always falls through.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::OnceLock;

use scholarly::{ExtractError, ExtractionBackend, Paper, RawExtraction};

type ExtractResult<T> = Result<T, ExtractError>;

/// Extraction backend driven by plain HTTP fetches.
pub struct HttpExtractionBackend {
    client: reqwest::Client,
    ocr_service_url: Option<String>,
}

impl HttpExtractionBackend {
    pub fn new(ocr_service_url: Option<String>) -> Self {
        let ocr_service_url = ocr_service_url.filter(|u| !u.is_empty());
        match &ocr_service_url {
            Some(_) => tracing::info!("OCR fallback tier enabled"),
            None => tracing::info!("OCR fallback tier disabled (no service URL)"),
        }
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("reqwest client construction cannot fail with static config"),
            ocr_service_url,
        }
    }

    fn document_url<'p>(paper: &'p Paper) -> ExtractResult<&'p str> {
        paper
            .url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or(ExtractError::NoDocument)
    }
}

#[async_trait]
impl ExtractionBackend for HttpExtractionBackend {
    async fn extract_native(&self, paper: &Paper) -> ExtractResult<RawExtraction> {
        let url = Self::document_url(paper)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ExtractError::Http(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::Http(
                format!("HTTP {status} for {url}").into(),
            ));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response
            .text()
            .await
            .map_err(|e| ExtractError::Http(Box::new(e)))?;

        if content_type.contains("text/html") || looks_like_html(&body) {
            Ok(RawExtraction::new(html_to_text(&body)))
        } else if content_type.starts_with("text/") || content_type.contains("json") {
            Ok(RawExtraction::new(body))
        } else {
            // Binary formats (PDF scans in particular) are the OCR
            // service's job.
            Err(ExtractError::Unsupported { content_type })
        }
    }

    async fn extract_ocr(&self, paper: &Paper) -> ExtractResult<RawExtraction> {
        let Some(service_url) = &self.ocr_service_url else {
            return Err(ExtractError::Backend("OCR service not configured".into()));
        };
        let url = Self::document_url(paper)?;

        #[derive(Deserialize)]
        struct OcrResponse {
            text: String,
            #[serde(default)]
            confidence: Option<f64>,
        }

        let response = self
            .client
            .post(service_url)
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await
            .map_err(|e| ExtractError::Http(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::Backend(format!(
                "OCR service returned {status}"
            )));
        }

        let parsed: OcrResponse = response
            .json()
            .await
            .map_err(|e| ExtractError::Backend(format!("malformed OCR response: {e}")))?;

        Ok(RawExtraction::new(parsed.text).with_confidence(parsed.confidence.unwrap_or(0.8)))
    }
}

fn looks_like_html(body: &str) -> bool {
    let head = body.trim_start().get(..256).unwrap_or(body.trim_start());
    let lowered = head.to_lowercase();
    lowered.starts_with("<!doctype html") || lowered.starts_with("<html")
}

/// Strip tags, scripts, and styles; decode the common entities.
fn html_to_text(html: &str) -> String {
    static SCRIPTS: OnceLock<regex::Regex> = OnceLock::new();
    static TAGS: OnceLock<regex::Regex> = OnceLock::new();

    let scripts = SCRIPTS.get_or_init(|| {
        regex::Regex::new(r"(?is)<(script|style|nav|header|footer)\b.*?</(script|style|nav|header|footer)>").unwrap()
    });
    let tags = TAGS.get_or_init(|| regex::Regex::new(r"(?s)<[^>]+>").unwrap());

    let without_scripts = scripts.replace_all(html, " ");
    let without_tags = tags.replace_all(&without_scripts, "\n");

    without_tags
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
