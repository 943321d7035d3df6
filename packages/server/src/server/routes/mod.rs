//! Route handlers and the API error mapping.

pub mod corpus;
pub mod health;
pub mod research;
pub mod search;
pub mod session;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use scholarly::ResearchError;
use serde_json::json;

/// Error wrapper translating pipeline errors into JSON responses.
///
/// Clients always receive a well-formed object, never a raw error chain.
pub struct ApiError(pub ResearchError);

impl From<ResearchError> for ApiError {
    fn from(err: ResearchError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            ResearchError::Validation { reason } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": reason }),
            ),
            ResearchError::NotFound { request_id } => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("request not found: {request_id}") }),
            ),
            ResearchError::Pending { status } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "results not ready", "status": status }),
            ),
            other => {
                tracing::error!(error = %other, "request handling failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": other.to_string() }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

pub use corpus::{clusters_handler, statistics_handler, upload_handler};
pub use health::health_handler;
pub use research::{research_results_handler, research_status_handler, submit_research_handler};
pub use search::search_handler;
pub use session::{session_start_handler, session_validate_handler};
