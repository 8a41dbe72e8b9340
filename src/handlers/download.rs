use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};

use crate::error::{AppError, Result};
use crate::services::BlobService;
use crate::AppState;

/// Download a converted file
/// GET /download/:id
///
/// Every failure, including a malformed id, is reported as 404.
pub async fn download(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let blob = BlobService::get_data(&state.db, state.storage.as_ref(), &id)
        .await
        .map_err(|e| match e {
            AppError::NotFound(msg) => AppError::NotFound(msg),
            other => {
                tracing::warn!("Download of {} failed: {}", id, other);
                AppError::NotFound("File not found".to_string())
            }
        })?;

    let fallback_name = blob.filename.replace(['"', '\\'], "_");
    let encoded_name = urlencoding::encode(&blob.filename);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, blob.content_type)
        .header(header::CONTENT_LENGTH, blob.data.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"; filename*=UTF-8''{}",
                fallback_name, encoded_name
            ),
        )
        .body(Body::from(blob.data))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}
