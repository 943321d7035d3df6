use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::kernel::ServerDeps;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    corpus: CorpusHealth,
    active_requests: usize,
}

#[derive(Serialize)]
pub struct CorpusHealth {
    status: String,
    total_documents: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Health check endpoint.
///
/// Returns 200 OK when the knowledge store answers, 503 otherwise.
pub async fn health_handler(
    Extension(deps): Extension<ServerDeps>,
) -> (StatusCode, Json<HealthResponse>) {
    let corpus = match deps.knowledge.stats().await {
        Ok(stats) => CorpusHealth {
            status: "ok".to_string(),
            total_documents: stats.total_documents,
            error: None,
        },
        Err(e) => CorpusHealth {
            status: "error".to_string(),
            total_documents: 0,
            error: Some(e.to_string()),
        },
    };

    let is_healthy = corpus.status == "ok";
    let status_code = if is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if is_healthy { "healthy" } else { "unhealthy" }.to_string(),
            corpus,
            active_requests: deps.engine.request_count(),
        }),
    )
}
