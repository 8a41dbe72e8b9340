use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{
    timestamp, ConversionListItem, ConversionRecord, ConversionStatus, NewConversion,
    PendingDeletion,
};

/// Conversion metadata service
pub struct ConversionService;

impl ConversionService {
    /// Record a finished conversion
    pub async fn insert(db: &Database, new: NewConversion) -> Result<ConversionRecord> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO conversions (id, filename, original_format, converted_format, status, blob_id, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.filename)
        .bind(new.original_format.as_str())
        .bind(new.converted_format.as_str())
        .bind(ConversionStatus::Converted.as_str())
        .bind(&new.blob_id)
        .bind(timestamp(new.uploaded_at))
        .execute(db.pool())
        .await?;

        Self::get(db, &id).await
    }

    /// Get a conversion record by ID
    pub async fn get(db: &Database, id: &str) -> Result<ConversionRecord> {
        let record: ConversionRecord = sqlx::query_as("SELECT * FROM conversions WHERE id = ?")
            .bind(id)
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound("Conversion not found".to_string()))?;

        Ok(record)
    }

    /// All records, newest first
    pub async fn list(db: &Database) -> Result<Vec<ConversionRecord>> {
        let records: Vec<ConversionRecord> =
            sqlx::query_as("SELECT * FROM conversions ORDER BY uploaded_at DESC")
                .fetch_all(db.pool())
                .await?;

        Ok(records)
    }

    /// `{filename, blob_id}` for every record, newest first
    pub async fn list_items(db: &Database) -> Result<Vec<ConversionListItem>> {
        let items: Vec<ConversionListItem> = sqlx::query_as(
            "SELECT filename, blob_id FROM conversions ORDER BY uploaded_at DESC",
        )
        .fetch_all(db.pool())
        .await?;

        Ok(items)
    }

    /// Records uploaded strictly before `cutoff`
    pub async fn expired(db: &Database, cutoff: DateTime<Utc>) -> Result<Vec<ConversionRecord>> {
        let records: Vec<ConversionRecord> = sqlx::query_as(
            "SELECT * FROM conversions WHERE uploaded_at < ? ORDER BY uploaded_at ASC",
        )
        .bind(timestamp(cutoff))
        .fetch_all(db.pool())
        .await?;

        Ok(records)
    }

    /// Write the deletion intent for a record and its blob
    pub async fn begin_deletion(db: &Database, record: &ConversionRecord) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO pending_deletions (record_id, blob_id, requested_at) VALUES (?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.blob_id)
        .bind(timestamp(Utc::now()))
        .execute(db.pool())
        .await?;

        Ok(())
    }

    /// Delete the record and clear its intent in one transaction
    pub async fn finish_deletion(db: &Database, record_id: &str) -> Result<()> {
        let mut tx = db.pool().begin().await?;

        sqlx::query("DELETE FROM conversions WHERE id = ?")
            .bind(record_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM pending_deletions WHERE record_id = ?")
            .bind(record_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Intents left behind by an interrupted sweep
    pub async fn pending_deletions(db: &Database) -> Result<Vec<PendingDeletion>> {
        let pending: Vec<PendingDeletion> =
            sqlx::query_as("SELECT * FROM pending_deletions ORDER BY requested_at ASC")
                .fetch_all(db.pool())
                .await?;

        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_database;
    use crate::models::Format;
    use chrono::Duration;

    fn new_conversion(name: &str, uploaded_at: DateTime<Utc>) -> NewConversion {
        NewConversion {
            filename: name.to_string(),
            original_format: Format::Pdf,
            converted_format: Format::Docx,
            blob_id: Uuid::new_v4().to_string(),
            uploaded_at,
        }
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_database(dir.path()).await;
        let now = Utc::now();

        let older = ConversionService::insert(&db, new_conversion("old.pdf", now - Duration::hours(1)))
            .await
            .unwrap();
        let newer = ConversionService::insert(&db, new_conversion("new.pdf", now))
            .await
            .unwrap();

        assert_eq!(newer.status, "converted");
        assert_eq!(newer.original_format(), Some(Format::Pdf));
        assert_eq!(newer.converted_format(), Some(Format::Docx));

        let items = ConversionService::list_items(&db).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].filename, "new.pdf");
        assert_eq!(items[0].blob_id, newer.blob_id);
        assert_eq!(items[1].blob_id, older.blob_id);

        let records = ConversionService::list(&db).await.unwrap();
        assert_eq!(records[0].id, newer.id);
    }

    #[tokio::test]
    async fn test_expired_uses_cutoff() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_database(dir.path()).await;
        let now = Utc::now();

        let stale = ConversionService::insert(&db, new_conversion("stale.pdf", now - Duration::days(8)))
            .await
            .unwrap();
        ConversionService::insert(&db, new_conversion("fresh.pdf", now - Duration::days(6)))
            .await
            .unwrap();

        let expired = ConversionService::expired(&db, now - Duration::days(7)).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, stale.id);
    }

    #[tokio::test]
    async fn test_deletion_intent_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_database(dir.path()).await;

        let record = ConversionService::insert(&db, new_conversion("x.pdf", Utc::now()))
            .await
            .unwrap();
        ConversionService::begin_deletion(&db, &record).await.unwrap();
        // Writing the same intent twice is harmless
        ConversionService::begin_deletion(&db, &record).await.unwrap();

        let pending = ConversionService::pending_deletions(&db).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].record_id, record.id);
        assert_eq!(pending[0].blob_id, record.blob_id);

        ConversionService::finish_deletion(&db, &record.id).await.unwrap();
        assert!(ConversionService::pending_deletions(&db).await.unwrap().is_empty());
        assert!(matches!(
            ConversionService::get(&db, &record.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
