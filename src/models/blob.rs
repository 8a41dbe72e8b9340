use bytes::Bytes;
use serde::Serialize;
use sqlx::FromRow;

/// Blob model - a stored conversion output
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Blob {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub storage_path: String,
    pub size: i64,
    pub created_at: String,
}

/// Blob contents together with the name it should be served under
#[derive(Debug, Clone)]
pub struct BlobData {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}
