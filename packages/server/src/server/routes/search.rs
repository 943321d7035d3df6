//! Direct knowledge-store search.

use axum::{extract::{Extension, Query}, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use scholarly::ResearchError;

use super::ApiError;
use crate::kernel::ServerDeps;

const SNIPPET_LEN: usize = 500;

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub k: Option<usize>,
}

/// GET /search?query=&k= - ranked document snippets from the corpus.
pub async fn search_handler(
    Extension(deps): Extension<ServerDeps>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    let query = params.query.trim().to_string();
    if query.is_empty() {
        return Err(ResearchError::Validation {
            reason: "query parameter is required".into(),
        }
        .into());
    }
    let k = params.k.unwrap_or(10).clamp(1, 50);

    let hits = deps.knowledge.similarity_search(&query, k).await?;

    let results: Vec<Value> = hits
        .iter()
        .map(|hit| {
            json!({
                "content": snippet(&hit.document.content),
                "score": hit.score,
                "metadata": {
                    "id": &hit.document.id,
                    "title": &hit.document.title,
                    "fields": &hit.document.metadata,
                },
            })
        })
        .collect();

    Ok(Json(json!({
        "query": query,
        "results": results,
        "search_metadata": {
            "requested_count": k,
            "actual_count": results.len(),
            "timestamp": Utc::now().to_rfc3339(),
        },
    })))
}

fn snippet(content: &str) -> String {
    if content.len() <= SNIPPET_LEN {
        return content.to_string();
    }
    let mut cut = SNIPPET_LEN;
    while !content.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &content[..cut])
}
