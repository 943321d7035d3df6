//! Research request endpoints: submit, poll, fetch results.

use axum::{
    extract::{Extension, Path},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use scholarly::ResearchError;

use super::ApiError;
use crate::kernel::ServerDeps;

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub query: String,
    #[serde(default)]
    pub max_papers: Option<usize>,
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub request_id: Uuid,
    pub status: String,
    pub message: String,
}

/// POST /research - create a request and schedule its pipeline.
pub async fn submit_research_handler(
    Extension(deps): Extension<ServerDeps>,
    Json(body): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let request_id = deps.engine.submit(body.query, body.max_papers)?;

    Ok(Json(SubmitResponse {
        request_id,
        status: "started".to_string(),
        message: "Research task initiated".to_string(),
    }))
}

/// GET /research/{id}/status - poll progress. Idempotent.
pub async fn research_status_handler(
    Extension(deps): Extension<ServerDeps>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let snapshot = deps.engine.get_status(&request_id)?;

    Ok(Json(json!({
        "status": snapshot.status,
        "current_step": snapshot.current_step,
        "progress": snapshot.progress,
    })))
}

/// GET /research/{id}/results - fetch the terminal result.
///
/// Pending requests get a well-formed 400; a failed request yields its
/// captured error text rather than an exception.
pub async fn research_results_handler(
    Extension(deps): Extension<ServerDeps>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    match deps.engine.get_results(&request_id) {
        Ok(outcome) => Ok(Json(json!({
            "status": "completed",
            "synthesis": outcome.synthesis,
            "papers_found": outcome.papers_found,
            "content_extracted": outcome.content_extracted,
            "quality_score": outcome.quality_score,
        }))),
        Err(ResearchError::RequestFailed { message }) => Ok(Json(json!({
            "status": "failed",
            "error": message,
        }))),
        Err(other) => Err(other.into()),
    }
}
