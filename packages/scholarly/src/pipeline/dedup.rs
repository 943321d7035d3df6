//! Merge multi-source result sets into one ordered, deduplicated list.

use std::collections::HashMap;

use crate::types::Paper;

/// Deduplicate and rank papers from multiple sources.
///
/// Papers are grouped by their source-independent dedup key; within a
/// group the entry with the highest citation count survives, with every
/// group member's sources merged into it so provenance is not lost.
///
/// Final order: relevance descending, citations descending, external id
/// ascending - a total order, so the output is identical for any input
/// permutation. Truncated to `max_items`.
pub fn dedup_and_rank(papers: Vec<Paper>, max_items: usize) -> Vec<Paper> {
    let mut groups: HashMap<String, Paper> = HashMap::new();

    for paper in papers {
        let key = paper.dedup_key();
        match groups.get_mut(&key) {
            Some(existing) => {
                merge_sources(existing, &paper.sources);
                if paper.citation_count > existing.citation_count {
                    let mut merged = paper;
                    merge_sources(&mut merged, &existing.sources);
                    *existing = merged;
                }
            }
            None => {
                groups.insert(key, paper);
            }
        }
    }

    let mut ranked: Vec<Paper> = groups.into_values().collect();
    ranked.sort_by(|a, b| {
        b.relevance_score
            .total_cmp(&a.relevance_score)
            .then_with(|| b.citation_count.cmp(&a.citation_count))
            .then_with(|| a.external_id.cmp(&b.external_id))
    });
    ranked.truncate(max_items);
    ranked
}

fn merge_sources(paper: &mut Paper, sources: &[String]) {
    for source in sources {
        if !paper.sources.contains(source) {
            paper.sources.push(source.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn paper(id: &str, title: &str, source: &str) -> Paper {
        Paper::new(id, title, source).with_authors(["Jane Doe"])
    }

    #[test]
    fn duplicates_collapse_to_highest_citations() {
        let a = paper("arxiv:1", "Same Title", "arxiv").with_citations(5);
        let b = paper("s2:1", "Same Title", "semantic_scholar").with_citations(50);

        let merged = dedup_and_rank(vec![a, b], 10);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].citation_count, 50);
        assert_eq!(merged[0].external_id, "s2:1");
    }

    #[test]
    fn merged_paper_keeps_all_sources() {
        let a = paper("arxiv:1", "Same Title", "arxiv").with_citations(5);
        let b = paper("s2:1", "Same Title", "semantic_scholar").with_citations(50);

        let merged = dedup_and_rank(vec![a, b], 10);
        let sources: HashSet<&str> = merged[0].sources.iter().map(String::as_str).collect();
        assert!(sources.contains("arxiv"));
        assert!(sources.contains("semantic_scholar"));
    }

    #[test]
    fn ordering_is_relevance_then_citations_then_id() {
        let a = paper("b", "Alpha", "x").with_relevance(0.5).with_citations(10);
        let b = paper("a", "Beta", "x").with_relevance(0.5).with_citations(10);
        let c = paper("c", "Gamma", "x").with_relevance(0.9);
        let d = paper("d", "Delta", "x").with_relevance(0.5).with_citations(99);

        let ranked = dedup_and_rank(vec![a, b, c, d], 10);
        let ids: Vec<&str> = ranked.iter().map(|p| p.external_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "d", "a", "b"]);
    }

    #[test]
    fn output_is_order_independent() {
        let papers = vec![
            paper("1", "First", "x").with_relevance(0.9).with_citations(3),
            paper("2", "Second", "x").with_relevance(0.7).with_citations(8),
            paper("3", "First", "y").with_relevance(0.2).with_citations(40),
            paper("4", "Third", "x").with_relevance(0.7).with_citations(8),
        ];

        let forward = dedup_and_rank(papers.clone(), 10);
        let mut reversed_input = papers;
        reversed_input.reverse();
        let reversed = dedup_and_rank(reversed_input, 10);

        let forward_ids: Vec<&str> = forward.iter().map(|p| p.external_id.as_str()).collect();
        let reversed_ids: Vec<&str> = reversed.iter().map(|p| p.external_id.as_str()).collect();
        assert_eq!(forward_ids, reversed_ids);
    }

    #[test]
    fn dedup_keys_are_unique_in_output() {
        let papers = vec![
            paper("1", "Topic A", "x"),
            paper("2", "Topic A", "y"),
            paper("3", "Topic B", "x"),
        ];
        let merged = dedup_and_rank(papers, 10);
        let keys: HashSet<String> = merged.iter().map(|p| p.dedup_key()).collect();
        assert_eq!(keys.len(), merged.len());
    }

    #[test]
    fn truncates_to_max_items() {
        let papers = (0..10)
            .map(|i| paper(&format!("{i}"), &format!("Title {i}"), "x"))
            .collect();
        assert_eq!(dedup_and_rank(papers, 3).len(), 3);
    }
}
