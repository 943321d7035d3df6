//! OpenAlex discovery source.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{SourceError, SourceResult};
use crate::traits::source::PaperSource;
use crate::types::Paper;

const SOURCE_NAME: &str = "openalex";
const WORKS_URL: &str = "https://api.openalex.org/works";

/// OpenAlex works API client.
///
/// No key required; supplying a `mailto` address opts into the polite pool
/// with better rate limits.
pub struct OpenAlexSource {
    mailto: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct WorksResponse {
    #[serde(default)]
    results: Vec<Work>,
}

#[derive(Debug, Deserialize)]
struct Work {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    publication_year: Option<i32>,
    #[serde(default)]
    cited_by_count: u32,
    #[serde(default)]
    relevance_score: Option<f64>,
    #[serde(default)]
    authorships: Vec<Authorship>,
    #[serde(default)]
    primary_location: Option<Location>,
    #[serde(default)]
    open_access: Option<OpenAccess>,
    /// OpenAlex ships abstracts as an inverted index (word -> positions).
    #[serde(default)]
    abstract_inverted_index: Option<HashMap<String, Vec<usize>>>,
}

#[derive(Debug, Deserialize)]
struct Authorship {
    #[serde(default)]
    author: Option<AuthorRef>,
}

#[derive(Debug, Deserialize)]
struct AuthorRef {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Location {
    #[serde(default)]
    source: Option<LocationSource>,
}

#[derive(Debug, Deserialize)]
struct LocationSource {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAccess {
    #[serde(default)]
    oa_url: Option<String>,
}

impl OpenAlexSource {
    pub fn new(mailto: Option<String>) -> Self {
        Self {
            mailto: mailto.filter(|m| !m.is_empty()),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("reqwest client construction cannot fail with static config"),
        }
    }
}

#[async_trait]
impl PaperSource for OpenAlexSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn search(&self, query: &str, limit: usize) -> SourceResult<Vec<Paper>> {
        let per_page = limit.clamp(1, 200).to_string();
        let mut params: Vec<(&str, &str)> =
            vec![("search", query), ("per-page", per_page.as_str())];
        if let Some(mailto) = &self.mailto {
            params.push(("mailto", mailto.as_str()));
        }

        let response = self
            .client
            .get(WORKS_URL)
            .query(&params)
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

        let parsed: WorksResponse = response
            .json()
            .await
            .map_err(|e| SourceError::MalformedResponse(e.to_string()))?;

        // OpenAlex relevance scores are unbounded; normalize against the
        // best hit so they compare with other sources' 0-1 scores.
        let max_score = parsed
            .results
            .iter()
            .filter_map(|w| w.relevance_score)
            .fold(0.0f64, f64::max);

        let papers = parsed
            .results
            .into_iter()
            .map(|work| work_to_paper(work, max_score))
            .collect();

        Ok(papers)
    }
}

fn work_to_paper(work: Work, max_score: f64) -> Paper {
    let relevance = match (work.relevance_score, max_score) {
        (Some(score), max) if max > 0.0 => score / max,
        _ => 0.0,
    };

    let authors: Vec<String> = work
        .authorships
        .into_iter()
        .filter_map(|a| a.author.and_then(|r| r.display_name))
        .collect();

    let venue = work
        .primary_location
        .and_then(|l| l.source)
        .and_then(|s| s.display_name);

    let summary = work
        .abstract_inverted_index
        .map(|index| reconstruct_abstract(&index))
        .unwrap_or_default();

    let mut paper = Paper::new(work.id, work.display_name.unwrap_or_default(), SOURCE_NAME)
        .with_authors(authors)
        .with_summary(summary)
        .with_citations(work.cited_by_count)
        .with_relevance(relevance);
    if let Some(venue) = venue {
        paper = paper.with_venue(venue);
    }
    if let Some(year) = work.publication_year {
        paper = paper.with_year(year);
    }
    if let Some(url) = work.open_access.and_then(|oa| oa.oa_url) {
        paper = paper.with_url(url);
    }
    paper
}

/// Rebuild the abstract text from OpenAlex's inverted index.
fn reconstruct_abstract(index: &HashMap<String, Vec<usize>>) -> String {
    let mut positions: Vec<(usize, &str)> = index
        .iter()
        .flat_map(|(word, places)| places.iter().map(move |&p| (p, word.as_str())))
        .collect();
    positions.sort_by_key(|(p, _)| *p);
    positions
        .into_iter()
        .map(|(_, word)| word)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abstract_reconstruction_orders_words() {
        let mut index = HashMap::new();
        index.insert("study".to_string(), vec![2]);
        index.insert("We".to_string(), vec![0]);
        index.insert("things".to_string(), vec![3]);
        index.insert("now".to_string(), vec![1]);
        assert_eq!(reconstruct_abstract(&index), "We now study things");
    }

    #[test]
    fn work_maps_to_paper_with_normalized_relevance() {
        let json = serde_json::json!({
            "id": "https://openalex.org/W1",
            "display_name": "A Work",
            "publication_year": 2022,
            "cited_by_count": 7,
            "relevance_score": 12.5,
            "authorships": [{"author": {"display_name": "Ada Lovelace"}}],
            "primary_location": {"source": {"display_name": "JMLR"}},
            "open_access": {"oa_url": "https://example.org/w1.pdf"}
        });
        let work: Work = serde_json::from_value(json).unwrap();
        let paper = work_to_paper(work, 25.0);

        assert_eq!(paper.relevance_score, 0.5);
        assert_eq!(paper.authors, vec!["Ada Lovelace"]);
        assert_eq!(paper.venue.as_deref(), Some("JMLR"));
        assert_eq!(paper.year, Some(2022));
    }
}
