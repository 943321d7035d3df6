//! Session lifecycle endpoints.

use axum::{extract::Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::kernel::ServerDeps;

/// POST /session/start - create a session.
pub async fn session_start_handler(Extension(deps): Extension<ServerDeps>) -> Json<Value> {
    let session_id = deps.sessions.create();
    Json(json!({ "session_id": session_id }))
}

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub session_id: Uuid,
}

/// POST /session/validate - check liveness. A live session has its
/// sliding expiry extended by the check itself.
pub async fn session_validate_handler(
    Extension(deps): Extension<ServerDeps>,
    Json(body): Json<ValidateRequest>,
) -> Json<Value> {
    let valid = deps.sessions.validate(&body.session_id);
    Json(json!({ "valid": valid }))
}
