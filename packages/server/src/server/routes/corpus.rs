//! Corpus endpoints: statistics, topic clusters, and document upload.

use axum::{
    extract::{Extension, Multipart, Query},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use scholarly::{Document, ResearchError};

use super::ApiError;
use crate::kernel::ServerDeps;

/// Extensions ingested directly as text.
const TEXT_EXTENSIONS: &[&str] = &["txt", "md"];

/// GET /statistics - aggregate counts over the indexed corpus.
pub async fn statistics_handler(
    Extension(deps): Extension<ServerDeps>,
) -> Result<Json<Value>, ApiError> {
    let stats = deps.knowledge.stats().await?;
    Ok(Json(serde_json::to_value(stats).map_err(ResearchError::from)?))
}

#[derive(Deserialize)]
pub struct ClusterParams {
    #[serde(default)]
    pub k: Option<usize>,
}

/// GET /clusters - topic-cluster summary over the corpus.
pub async fn clusters_handler(
    Extension(deps): Extension<ServerDeps>,
    Query(params): Query<ClusterParams>,
) -> Result<Json<Value>, ApiError> {
    let k = params.k.unwrap_or(10).clamp(1, 100);
    let clusters = deps.knowledge.clusters(k).await?;
    Ok(Json(json!({ "clusters": clusters })))
}

/// POST /upload - ingest documents into the knowledge store.
///
/// Text files are indexed directly; binary formats are reported per-file
/// as errors rather than failing the whole upload.
pub async fn upload_handler(
    Extension(deps): Extension<ServerDeps>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut documents = Vec::new();
    let mut uploaded = Vec::new();
    let mut errors = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ResearchError::Validation {
            reason: format!("malformed multipart body: {e}"),
        }
    })? {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                errors.push(format!("{filename}: read failed ({e})"));
                continue;
            }
        };

        if !has_text_extension(&filename) {
            errors.push(format!("{filename}: file type not allowed"));
            continue;
        }

        match String::from_utf8(bytes.to_vec()) {
            Ok(content) if !content.trim().is_empty() => {
                let size = content.len();
                documents.push(
                    Document::new(filename.clone(), filename.clone(), content)
                        .with_meta("origin", "upload"),
                );
                uploaded.push(json!({ "filename": filename, "size": size }));
            }
            Ok(_) => errors.push(format!("{filename}: file is empty")),
            Err(_) => errors.push(format!("{filename}: not valid UTF-8 text")),
        }
    }

    if documents.is_empty() && uploaded.is_empty() && errors.is_empty() {
        return Err(ResearchError::Validation {
            reason: "no files provided".into(),
        }
        .into());
    }

    let success_count = deps.knowledge.add_documents(documents).await?;

    Ok(Json(json!({
        "message": format!("Successfully uploaded {success_count} file(s)"),
        "uploaded_files": uploaded,
        "success_count": success_count,
        "error_count": errors.len(),
        "errors": errors,
    })))
}

fn has_text_extension(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| TEXT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_extensions_are_accepted() {
        assert!(has_text_extension("notes.txt"));
        assert!(has_text_extension("README.MD"));
        assert!(!has_text_extension("paper.pdf"));
        assert!(!has_text_extension("noextension"));
    }
}
