//! In-memory knowledge store.
//!
//! Term-frequency scored search over an in-process map. Suitable for
//! development, tests, and small corpora; swap in a real vector store by
//! implementing [`KnowledgeStore`] against it.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use crate::error::Result;
use crate::traits::knowledge::KnowledgeStore;
use crate::types::{CorpusStats, Document, ScoredDocument, TopicCluster};

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
    "or", "that", "the", "this", "to", "we", "with",
];

/// In-memory store keyed by document id.
pub struct MemoryKnowledgeStore {
    documents: RwLock<HashMap<String, Document>>,
}

impl Default for MemoryKnowledgeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryKnowledgeStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }

    pub fn document_count(&self) -> usize {
        self.documents.read().unwrap().len()
    }

    pub fn clear(&self) {
        self.documents.write().unwrap().clear();
    }
}

/// Term-frequency score of a document against query terms, 0.0-1.0.
fn score_document(doc: &Document, query_terms: &[String]) -> f64 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let haystack = format!("{} {}", doc.title, doc.content).to_lowercase();
    let doc_len = haystack.split_whitespace().count().max(1) as f64;

    let mut score = 0.0;
    for term in query_terms {
        let count = haystack.matches(term.as_str()).count();
        if count > 0 {
            score += (1.0 + (count as f64).ln()) / (1.0 + doc_len.ln());
        }
    }
    (score / query_terms.len() as f64).min(1.0)
}

fn query_terms(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|t| !STOPWORDS.contains(t) && t.len() > 1)
        .map(str::to_string)
        .collect()
}

/// Most frequent non-stopword terms of a document.
fn top_terms(doc: &Document, n: usize) -> Vec<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for word in format!("{} {}", doc.title, doc.content)
        .to_lowercase()
        .split_whitespace()
    {
        let word: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
        if word.len() > 3 && !STOPWORDS.contains(&word.as_str()) {
            *counts.entry(word).or_default() += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    // BTreeMap iteration gives alphabetical ties a stable order.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.into_iter().take(n).map(|(t, _)| t).collect()
}

#[async_trait]
impl KnowledgeStore for MemoryKnowledgeStore {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>> {
        let terms = query_terms(query);
        let documents = self.documents.read().unwrap();

        let mut scored: Vec<ScoredDocument> = documents
            .values()
            .filter_map(|doc| {
                let score = score_document(doc, &terms);
                (score > 0.0).then(|| ScoredDocument {
                    document: doc.clone(),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.document.id.cmp(&b.document.id))
        });
        scored.truncate(k);
        Ok(scored)
    }

    async fn add_documents(&self, documents: Vec<Document>) -> Result<usize> {
        let mut map = self.documents.write().unwrap();
        let mut added = 0;
        for doc in documents {
            if doc.content.trim().is_empty() {
                tracing::warn!(id = %doc.id, "skipping document with empty content");
                continue;
            }
            // Unchanged content keeps the existing record (and its
            // original indexed_at).
            if let Some(existing) = map.get(&doc.id) {
                if existing.content_hash == doc.content_hash {
                    continue;
                }
            }
            map.insert(doc.id.clone(), doc);
            added += 1;
        }
        Ok(added)
    }

    async fn stats(&self) -> Result<CorpusStats> {
        let documents = self.documents.read().unwrap();

        let mut papers = HashSet::new();
        let mut authors = HashSet::new();
        let mut venues: HashMap<String, usize> = HashMap::new();
        let mut methods: HashMap<String, usize> = HashMap::new();

        for doc in documents.values() {
            if let Some(paper_id) = doc.metadata.get("paper_id") {
                papers.insert(paper_id.clone());
            }
            if let Some(names) = doc.metadata.get("authors") {
                for name in names.split(',') {
                    let name = name.trim();
                    if !name.is_empty() {
                        authors.insert(name.to_string());
                    }
                }
            }
            if let Some(venue) = doc.metadata.get("venue") {
                *venues.entry(venue.clone()).or_default() += 1;
            }
            if let Some(method) = doc.metadata.get("extraction_method") {
                *methods.entry(method.clone()).or_default() += 1;
            }
        }

        let mut top_venues: Vec<(String, usize)> = venues.into_iter().collect();
        top_venues.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_venues.truncate(10);

        Ok(CorpusStats {
            total_documents: documents.len(),
            unique_papers: papers.len(),
            unique_authors: authors.len(),
            top_venues,
            extraction_methods: methods,
        })
    }

    async fn clusters(&self, max_clusters: usize) -> Result<Vec<TopicCluster>> {
        let documents = self.documents.read().unwrap();

        // Greedy grouping by shared top terms. Documents are visited in id
        // order so clustering is deterministic for a given corpus.
        let mut ids: Vec<&String> = documents.keys().collect();
        ids.sort();

        let mut groups: Vec<(HashSet<String>, usize)> = Vec::new();
        for id in ids {
            let doc = &documents[id];
            let terms: HashSet<String> = top_terms(doc, 5).into_iter().collect();
            if terms.is_empty() {
                continue;
            }

            match groups.iter_mut().find(|(group_terms, _)| {
                let shared = group_terms.intersection(&terms).count();
                shared * 2 >= terms.len().min(group_terms.len())
            }) {
                Some((group_terms, size)) => {
                    group_terms.extend(terms);
                    *size += 1;
                }
                None => groups.push((terms, 1)),
            }
        }

        let mut clusters: Vec<TopicCluster> = groups
            .into_iter()
            .map(|(terms, size)| {
                let mut label_terms: Vec<String> = terms.into_iter().collect();
                label_terms.sort();
                label_terms.truncate(3);
                TopicCluster {
                    label: label_terms.join(", "),
                    size,
                }
            })
            .collect();

        clusters.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.label.cmp(&b.label)));
        clusters.truncate(max_clusters);
        Ok(clusters)
    }
}
