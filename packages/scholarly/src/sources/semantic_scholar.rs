//! Semantic Scholar discovery source.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{SourceError, SourceResult};
use crate::traits::source::PaperSource;
use crate::types::Paper;

const SOURCE_NAME: &str = "semantic_scholar";
const SEARCH_URL: &str = "https://api.semanticscholar.org/graph/v1/paper/search";

/// Semantic Scholar Graph API client.
///
/// Works without an API key at a reduced rate limit; set one to raise it.
pub struct SemanticScholarSource {
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(rename = "paperId")]
    paper_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    r#abstract: Option<String>,
    #[serde(default)]
    venue: Option<String>,
    #[serde(default)]
    year: Option<i32>,
    #[serde(rename = "citationCount", default)]
    citation_count: u32,
    #[serde(default)]
    authors: Vec<Author>,
    #[serde(rename = "externalIds", default)]
    external_ids: Option<ExternalIds>,
    #[serde(rename = "openAccessPdf", default)]
    open_access_pdf: Option<OpenAccessPdf>,
}

#[derive(Debug, Deserialize)]
struct Author {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    #[serde(rename = "ArXiv", default)]
    arxiv: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAccessPdf {
    #[serde(default)]
    url: Option<String>,
}

impl SemanticScholarSource {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("reqwest client construction cannot fail with static config"),
        }
    }
}

#[async_trait]
impl PaperSource for SemanticScholarSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn search(&self, query: &str, limit: usize) -> SourceResult<Vec<Paper>> {
        let limit_param = limit.to_string();
        let params: [(&str, &str); 3] = [
            ("query", query),
            ("limit", &limit_param),
            (
                "fields",
                "title,authors,abstract,venue,year,citationCount,externalIds,openAccessPdf",
            ),
        ];
        let mut request = self.client.get(SEARCH_URL).query(&params);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Http(Box::new(e)))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(SourceError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SourceError::MalformedResponse(e.to_string()))?;

        let total = parsed.data.len();
        let papers = parsed
            .data
            .into_iter()
            .enumerate()
            .map(|(rank, item)| {
                // The search API ranks but does not score; derive a
                // rank-based relevance so downstream ordering is defined.
                let relevance = rank_relevance(rank, total);
                item_to_paper(item, relevance)
            })
            .collect();

        Ok(papers)
    }
}

/// Relevance in (0, 1], highest for the first-ranked result.
fn rank_relevance(rank: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    1.0 - (rank as f64 / total as f64)
}

fn item_to_paper(item: SearchItem, relevance: f64) -> Paper {
    // Prefer the open-access PDF; fall back to the arXiv mirror.
    let url = item
        .open_access_pdf
        .and_then(|p| p.url)
        .or_else(|| {
            item.external_ids
                .as_ref()
                .and_then(|ids| ids.arxiv.as_ref())
                .map(|id| format!("https://arxiv.org/pdf/{id}.pdf"))
        });

    let mut paper = Paper::new(item.paper_id, item.title, SOURCE_NAME)
        .with_authors(item.authors.into_iter().map(|a| a.name))
        .with_citations(item.citation_count)
        .with_relevance(relevance);
    if let Some(text) = item.r#abstract {
        paper = paper.with_summary(text);
    }
    if let Some(venue) = item.venue.filter(|v| !v.is_empty()) {
        paper = paper.with_venue(venue);
    }
    if let Some(year) = item.year {
        paper = paper.with_year(year);
    }
    if let Some(url) = url {
        paper = paper.with_url(url);
    }
    paper
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_relevance_is_descending() {
        assert!(rank_relevance(0, 10) > rank_relevance(1, 10));
        assert_eq!(rank_relevance(0, 10), 1.0);
        assert_eq!(rank_relevance(0, 0), 0.0);
    }

    #[test]
    fn response_maps_to_paper() {
        let json = serde_json::json!({
            "data": [{
                "paperId": "abc123",
                "title": "A Study",
                "abstract": "We study things.",
                "venue": "NeurIPS",
                "year": 2023,
                "citationCount": 42,
                "authors": [{"name": "Jane Doe"}],
                "externalIds": {"ArXiv": "2301.00001"}
            }]
        });
        let parsed: SearchResponse = serde_json::from_value(json).unwrap();
        let paper = item_to_paper(parsed.data.into_iter().next().unwrap(), 1.0);

        assert_eq!(paper.external_id, "abc123");
        assert_eq!(paper.citation_count, 42);
        assert_eq!(paper.venue.as_deref(), Some("NeurIPS"));
        assert_eq!(
            paper.url.as_deref(),
            Some("https://arxiv.org/pdf/2301.00001.pdf")
        );
        assert_eq!(paper.primary_source(), "semantic_scholar");
    }
}
