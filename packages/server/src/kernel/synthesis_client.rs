//! Synthesis service implementations.
//!
//! `HttpSynthesisService` calls a remote service for LLM-backed synthesis;
//! `DigestSynthesisService` is the keyless fallback that assembles a
//! deterministic digest from paper metadata.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

use scholarly::{
    ExtractedContent, Paper, ResearchError, SynthesisResult, SynthesisService,
};

/// Pick a synthesis implementation based on configuration.
///
/// No service URL configured means the digest fallback; research requests
/// still complete, with metadata-derived analysis instead of LLM output.
pub fn create_synthesis_service(service_url: Option<String>) -> Arc<dyn SynthesisService> {
    match service_url.filter(|u| !u.is_empty()) {
        Some(url) => {
            tracing::info!("remote synthesis service enabled");
            Arc::new(HttpSynthesisService::new(url))
        }
        None => {
            tracing::info!("no synthesis service configured, using metadata digest");
            Arc::new(DigestSynthesisService)
        }
    }
}

/// Remote synthesis over HTTP: POSTs the query, papers, and contents and
/// returns the service's JSON payload verbatim.
pub struct HttpSynthesisService {
    url: String,
    client: reqwest::Client,
}

impl HttpSynthesisService {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("reqwest client construction cannot fail with static config"),
        }
    }
}

#[async_trait]
impl SynthesisService for HttpSynthesisService {
    async fn synthesize(
        &self,
        query: &str,
        papers: &[Paper],
        contents: &[ExtractedContent],
    ) -> Result<SynthesisResult, ResearchError> {
        let body = json!({
            "query": query,
            "papers": papers,
            "contents": contents,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ResearchError::Synthesis(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ResearchError::Synthesis(
                format!("synthesis service returned {status}: {body}").into(),
            ));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ResearchError::Synthesis(Box::new(e)))?;

        Ok(SynthesisResult::new(payload))
    }
}

/// Deterministic synthesis from paper metadata: venue and citation
/// analysis, date range, and temporal trend, with the most-cited papers
/// surfaced as findings.
pub struct DigestSynthesisService;

#[async_trait]
impl SynthesisService for DigestSynthesisService {
    async fn synthesize(
        &self,
        query: &str,
        papers: &[Paper],
        contents: &[ExtractedContent],
    ) -> Result<SynthesisResult, ResearchError> {
        let top_venues = top_venues(papers);
        let (min_year, max_year) = year_range(papers);
        let citation_total: u64 = papers.iter().map(|p| p.citation_count as u64).sum();
        let citation_max = papers.iter().map(|p| p.citation_count).max().unwrap_or(0);

        let key_findings: Vec<String> = {
            let mut by_citations: Vec<&Paper> = papers.iter().collect();
            by_citations.sort_by(|a, b| {
                b.citation_count
                    .cmp(&a.citation_count)
                    .then_with(|| a.external_id.cmp(&b.external_id))
            });
            by_citations
                .iter()
                .take(5)
                .map(|p| format!("{} ({} citations)", p.title, p.citation_count))
                .collect()
        };

        let summary = format!(
            "Analysis for \"{query}\": {} papers considered, structured content \
             extracted from {} of them. Publication years span {} to {}. The most \
             represented venues are {}. Collected papers account for {} citations \
             in total (max {} for a single paper). Trend over time: {}.",
            papers.len(),
            contents.len(),
            min_year.map(|y| y.to_string()).unwrap_or_else(|| "unknown".into()),
            max_year.map(|y| y.to_string()).unwrap_or_else(|| "unknown".into()),
            if top_venues.is_empty() {
                "unknown".to_string()
            } else {
                top_venues
                    .iter()
                    .map(|(v, n)| format!("{v} ({n})"))
                    .collect::<Vec<_>>()
                    .join(", ")
            },
            citation_total,
            citation_max,
            temporal_trend(papers),
        );

        Ok(SynthesisResult::new(json!({
            "summary": summary,
            "key_findings": key_findings,
            "top_venues": top_venues.iter().map(|(v, n)| json!({"venue": v, "count": n})).collect::<Vec<_>>(),
            "date_range": {"min": min_year, "max": max_year},
            "citation_stats": {"total": citation_total, "max": citation_max},
            "synthesis_method": "metadata_digest",
        })))
    }
}

/// Venues by paper count, most frequent first (top 5).
fn top_venues(papers: &[Paper]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for paper in papers {
        if let Some(venue) = paper.venue.as_deref().filter(|v| !v.is_empty()) {
            *counts.entry(venue).or_default() += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(v, n)| (v.to_string(), n))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(5);
    ranked
}

fn year_range(papers: &[Paper]) -> (Option<i32>, Option<i32>) {
    let years: Vec<i32> = papers.iter().filter_map(|p| p.year).collect();
    (years.iter().min().copied(), years.iter().max().copied())
}

/// Compare paper counts in the first and second half of the year span.
fn temporal_trend(papers: &[Paper]) -> &'static str {
    let (min, max) = year_range(papers);
    let (Some(min), Some(max)) = (min, max) else {
        return "unknown";
    };
    if min == max {
        return "stable";
    }
    let midpoint = min + (max - min) / 2;
    let early = papers.iter().filter(|p| p.year.is_some_and(|y| y <= midpoint)).count();
    let late = papers.len() - early;
    if late > early {
        "increasing"
    } else if early > late {
        "decreasing"
    } else {
        "stable"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(id: &str, venue: &str, year: i32, citations: u32) -> Paper {
        Paper::new(id, format!("Paper {id}"), "test")
            .with_venue(venue)
            .with_year(year)
            .with_citations(citations)
    }

    #[tokio::test]
    async fn digest_summarizes_metadata() {
        let papers = vec![
            paper("1", "NeurIPS", 2020, 100),
            paper("2", "NeurIPS", 2023, 10),
            paper("3", "ICML", 2024, 50),
        ];
        let digest = DigestSynthesisService
            .synthesize("test query", &papers, &[])
            .await
            .unwrap();

        assert!(digest.summary_len() > 100);
        assert_eq!(digest.key_findings_count(), 3);
        let value = &digest.0;
        assert_eq!(value["top_venues"][0]["venue"], "NeurIPS");
        assert_eq!(value["date_range"]["min"], 2020);
        assert_eq!(value["citation_stats"]["max"], 100);
    }

    #[tokio::test]
    async fn digest_handles_empty_input() {
        let digest = DigestSynthesisService
            .synthesize("empty", &[], &[])
            .await
            .unwrap();
        assert!(digest.summary_len() > 0);
        assert_eq!(digest.key_findings_count(), 0);
    }

    #[test]
    fn trend_detects_recent_growth() {
        let papers = vec![
            paper("1", "V", 2015, 0),
            paper("2", "V", 2023, 0),
            paper("3", "V", 2024, 0),
        ];
        assert_eq!(temporal_trend(&papers), "increasing");
    }
}
