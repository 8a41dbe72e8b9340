use bytes::Bytes;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

use crate::convert::Converter;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{ConversionKind, ConversionResponse, Format, NewConversion};
use crate::services::{BlobService, ConversionService};
use crate::storage::StorageProvider;

/// An uploaded file as received from the client
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: Option<String>,
    pub data: Bytes,
}

/// Reduce a client-supplied filename to a safe single path component.
///
/// Directory parts are dropped and the rest is NFKD-normalized so accented
/// letters keep their base letter. Whitespace becomes `_`, anything other than
/// ASCII alphanumerics and `.-_` is removed, and dots or underscores are
/// trimmed from both ends. May return an empty string.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let decomposed: String = base.nfkd().collect();

    let cleaned: String = decomposed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    cleaned.trim_matches(['.', '_']).to_string()
}

/// Conversion orchestrator: validate, stage, convert, store, record
pub struct ConvertService;

impl ConvertService {
    /// Check an upload against a conversion's allow-list.
    /// Returns the sanitized filename and its source format.
    pub fn validate(kind: ConversionKind, upload: &Upload) -> Result<(String, Format)> {
        let raw = upload
            .filename
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| AppError::InvalidRequest("No file uploaded".to_string()))?;

        if upload.data.is_empty() {
            return Err(AppError::InvalidRequest("Uploaded file is empty".to_string()));
        }

        let filename = secure_filename(raw);
        if filename.is_empty() {
            return Err(AppError::InvalidRequest("Invalid filename".to_string()));
        }

        let format = Format::from_filename(&filename)
            .filter(|format| kind.accepts().contains(format))
            .ok_or_else(|| {
                AppError::UnsupportedFormat(format!(
                    "{} accepts only {}",
                    kind.label(),
                    kind.accepts()
                        .iter()
                        .map(|f| format!(".{}", f.as_str()))
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })?;

        Ok((filename, format))
    }

    /// Run one conversion end to end.
    ///
    /// On success exactly one blob and one record exist for the output. The
    /// staging directory is removed on every path.
    pub async fn convert(
        db: &Database,
        storage: &dyn StorageProvider,
        converter: Arc<dyn Converter>,
        work_dir: &Path,
        kind: ConversionKind,
        upload: Upload,
    ) -> Result<ConversionResponse> {
        let (filename, original_format) = Self::validate(kind, &upload)?;
        let target = kind.target();

        tokio::fs::create_dir_all(work_dir).await?;
        let workspace = tempfile::Builder::new()
            .prefix("docshift_")
            .tempdir_in(work_dir)?;

        let input = workspace.path().join(&filename);
        let output = workspace.path().join(format!("converted.{}", target.as_str()));
        tokio::fs::write(&input, &upload.data).await?;

        tracing::debug!(
            "Converting {} ({} bytes) with {}",
            filename,
            upload.data.len(),
            converter.name()
        );

        let task = {
            let converter = converter.clone();
            let input = input.clone();
            let output = output.clone();
            tokio::task::spawn_blocking(move || converter.convert(&input, &output))
        };
        task.await
            .map_err(|e| AppError::Internal(format!("Converter task failed: {}", e)))??;

        let stem = filename
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&filename);
        let output_name = format!("{}.{}", stem, target.as_str());

        let blob = BlobService::put_file(db, storage, &output_name, &output).await?;

        let record = match ConversionService::insert(
            db,
            NewConversion {
                filename: filename.clone(),
                original_format,
                converted_format: target,
                blob_id: blob.id.clone(),
                uploaded_at: Utc::now(),
            },
        )
        .await
        {
            Ok(record) => record,
            Err(e) => {
                // A blob no record points to would never be served or swept by age
                if let Err(cleanup) = BlobService::delete(db, storage, &blob.id).await {
                    tracing::warn!("Failed to remove blob {} after insert error: {}", blob.id, cleanup);
                }
                return Err(e);
            }
        };

        if let Err(e) = workspace.close() {
            tracing::warn!("Failed to remove conversion workspace: {}", e);
        }

        tracing::info!(
            "Converted {} to {} (record {}, blob {})",
            filename,
            output_name,
            record.id,
            blob.id
        );

        Ok(ConversionResponse {
            record_id: record.id,
            download_id: blob.id,
            filename: output_name,
            converted_format: target,
        })
    }
}
