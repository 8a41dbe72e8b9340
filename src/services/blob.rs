use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::path::Path;
use uuid::Uuid;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{timestamp, Blob, BlobData};
use crate::storage::StorageProvider;

/// Blob service: named binary objects keyed by generated ids.
///
/// Bytes live in the storage provider under a sharded path; the `blobs` table
/// maps the id to that path and the name the bytes are served under.
pub struct BlobService;

/// Storage path for a blob id: `{first-2}/{next-2}/{id}.bin`
fn storage_path(id: &str) -> String {
    format!("{}/{}/{}.bin", &id[0..2], &id[2..4], id)
}

fn content_type_for(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .to_string()
}

/// Parse a caller-supplied id. Anything that is not a UUID cannot name a blob.
fn parse_id(id: &str) -> Result<String> {
    Uuid::parse_str(id)
        .map(|u| u.to_string())
        .map_err(|_| AppError::NotFound("File not found".to_string()))
}

impl BlobService {
    /// Store bytes under a display filename and return the new blob
    pub async fn put(
        db: &Database,
        storage: &dyn StorageProvider,
        filename: &str,
        data: Bytes,
    ) -> Result<Blob> {
        let id = Uuid::new_v4().to_string();
        let path = storage_path(&id);
        let size = data.len() as i64;

        storage.put(&path, data).await?;
        Self::insert_row(db, storage, id, filename, path, size).await
    }

    /// Store the contents of a local file under a display filename
    pub async fn put_file(
        db: &Database,
        storage: &dyn StorageProvider,
        filename: &str,
        local_path: &Path,
    ) -> Result<Blob> {
        let id = Uuid::new_v4().to_string();
        let path = storage_path(&id);
        let size = tokio::fs::metadata(local_path).await?.len() as i64;

        storage.put_file(&path, local_path).await?;
        Self::insert_row(db, storage, id, filename, path, size).await
    }

    async fn insert_row(
        db: &Database,
        storage: &dyn StorageProvider,
        id: String,
        filename: &str,
        path: String,
        size: i64,
    ) -> Result<Blob> {
        let now = timestamp(Utc::now());
        let inserted = sqlx::query(
            r#"
            INSERT INTO blobs (id, filename, content_type, storage_path, size, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(filename)
        .bind(content_type_for(filename))
        .bind(&path)
        .bind(size)
        .bind(&now)
        .execute(db.pool())
        .await;

        if let Err(e) = inserted {
            // Bytes without a row are unreachable; remove them
            if let Err(cleanup) = storage.delete(&path).await {
                tracing::warn!("Failed to remove unindexed blob data {}: {}", path, cleanup);
            }
            return Err(e.into());
        }

        tracing::debug!("Stored blob {} ({} bytes) as {}", id, size, filename);
        Self::get(db, &id).await
    }

    /// Get blob metadata by id
    pub async fn get(db: &Database, id: &str) -> Result<Blob> {
        let id = parse_id(id)?;
        let blob: Blob = sqlx::query_as("SELECT * FROM blobs WHERE id = ?")
            .bind(&id)
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        Ok(blob)
    }

    /// Get blob bytes and display name
    pub async fn get_data(db: &Database, storage: &dyn StorageProvider, id: &str) -> Result<BlobData> {
        let blob = Self::get(db, id).await?;
        let data = storage.get(&blob.storage_path).await?;

        Ok(BlobData {
            filename: blob.filename,
            content_type: blob.content_type,
            data,
        })
    }

    /// Delete a blob's bytes and then its row. Deleting an unknown blob is a no-op.
    pub async fn delete(db: &Database, storage: &dyn StorageProvider, id: &str) -> Result<()> {
        let blob = match Self::get(db, id).await {
            Ok(blob) => blob,
            Err(AppError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        };

        storage.delete(&blob.storage_path).await?;

        sqlx::query("DELETE FROM blobs WHERE id = ?")
            .bind(&blob.id)
            .execute(db.pool())
            .await?;

        tracing::debug!("Deleted blob {}", blob.id);
        Ok(())
    }

    /// Blobs created before `cutoff` that no conversion record references
    pub async fn list_orphans(db: &Database, cutoff: DateTime<Utc>) -> Result<Vec<Blob>> {
        let blobs: Vec<Blob> = sqlx::query_as(
            r#"
            SELECT b.* FROM blobs b
            LEFT JOIN conversions c ON c.blob_id = b.id
            WHERE c.id IS NULL AND b.created_at < ?
            ORDER BY b.created_at ASC
            "#,
        )
        .bind(timestamp(cutoff))
        .fetch_all(db.pool())
        .await?;

        Ok(blobs)
    }
}
