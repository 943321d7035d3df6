//! Paper type and source-independent identity.

use serde::{Deserialize, Serialize};

/// A discovered document from one of the discovery sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    /// Identifier within the originating source (arXiv id, S2 id, DOI...).
    /// Unique per source only; see [`Paper::dedup_key`] for cross-source identity.
    pub external_id: String,

    pub title: String,

    /// Author names in publication order.
    pub authors: Vec<String>,

    /// Abstract text, if the source provides one.
    #[serde(default)]
    pub summary: String,

    pub venue: Option<String>,

    pub year: Option<i32>,

    #[serde(default)]
    pub citation_count: u32,

    /// Sources this paper was seen in. The first entry is the source that
    /// contributed the surviving record; duplicates merged by the ranker
    /// append theirs so provenance is not lost.
    pub sources: Vec<String>,

    /// URL of the full-text document, if any.
    pub url: Option<String>,

    /// Relevance score reported by the source (0.0-1.0).
    #[serde(default)]
    pub relevance_score: f64,
}

impl Paper {
    /// Create a paper with the minimum required fields.
    pub fn new(
        external_id: impl Into<String>,
        title: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            title: title.into(),
            authors: Vec::new(),
            summary: String::new(),
            venue: None,
            year: None,
            citation_count: 0,
            sources: vec![source.into()],
            url: None,
            relevance_score: 0.0,
        }
    }

    /// Set the authors.
    pub fn with_authors(mut self, authors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.authors = authors.into_iter().map(|a| a.into()).collect();
        self
    }

    /// Set the abstract.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Set the venue.
    pub fn with_venue(mut self, venue: impl Into<String>) -> Self {
        self.venue = Some(venue.into());
        self
    }

    /// Set the publication year.
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Set the citation count.
    pub fn with_citations(mut self, count: u32) -> Self {
        self.citation_count = count;
        self
    }

    /// Set the document URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the relevance score.
    pub fn with_relevance(mut self, score: f64) -> Self {
        self.relevance_score = score;
        self
    }

    /// The source that contributed this record.
    pub fn primary_source(&self) -> &str {
        self.sources.first().map(String::as_str).unwrap_or("unknown")
    }

    /// Source-independent identity: normalized title plus the first
    /// author's surname.
    ///
    /// Different sources use incompatible id schemes, so duplicates are
    /// detected by content identity instead. Titles are lowercased and
    /// stripped to alphanumerics with collapsed whitespace.
    pub fn dedup_key(&self) -> String {
        let title = normalize_title(&self.title);
        let surname = self
            .authors
            .first()
            .map(|a| first_author_surname(a))
            .unwrap_or_default();
        format!("{}|{}", title, surname)
    }
}

/// Lowercase, keep alphanumerics and spaces, collapse runs of whitespace.
fn normalize_title(title: &str) -> String {
    let filtered: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Last whitespace-separated token of an author name, lowercased.
fn first_author_surname(author: &str) -> String {
    author
        .split_whitespace()
        .last()
        .unwrap_or("")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_key_ignores_punctuation_and_case() {
        let a = Paper::new("arxiv:1", "Attention Is All You Need!", "arxiv")
            .with_authors(["Ashish Vaswani"]);
        let b = Paper::new("s2:99", "attention is  all you need", "semantic_scholar")
            .with_authors(["A. Vaswani"]);
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn dedup_key_distinguishes_first_authors() {
        let a = Paper::new("1", "Deep Learning", "arxiv").with_authors(["Yann LeCun"]);
        let b = Paper::new("2", "Deep Learning", "arxiv").with_authors(["Ian Goodfellow"]);
        assert_ne!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn dedup_key_without_authors_is_title_only() {
        let p = Paper::new("1", "Survey of Things", "openalex");
        assert_eq!(p.dedup_key(), "survey of things|");
    }
}
