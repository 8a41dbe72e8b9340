use axum::{
    extract::{Multipart, State},
    response::Html,
};
use bytes::BytesMut;
use quick_xml::escape::escape;

use crate::convert::converter_for;
use crate::error::{AppError, Result};
use crate::models::ConversionKind;
use crate::services::{ConvertService, Upload};
use crate::AppState;

/// Convert PDF to Word
/// POST /convert/pdf-to-word
pub async fn pdf_to_word(state: State<AppState>, multipart: Multipart) -> Result<Html<String>> {
    run(state, ConversionKind::PdfToDocx, multipart).await
}

/// Convert Word to PDF
/// POST /convert/word-to-pdf
pub async fn word_to_pdf(state: State<AppState>, multipart: Multipart) -> Result<Html<String>> {
    run(state, ConversionKind::DocxToPdf, multipart).await
}

/// Convert a JPEG or PNG image to SVG
/// POST /convert/jpg-svg
pub async fn jpg_svg(state: State<AppState>, multipart: Multipart) -> Result<Html<String>> {
    run(state, ConversionKind::ImageToSvg, multipart).await
}

async fn run(
    State(state): State<AppState>,
    kind: ConversionKind,
    multipart: Multipart,
) -> Result<Html<String>> {
    let upload = read_upload(multipart).await?;
    let converter = converter_for(kind, &state.config.conversion);

    let response = ConvertService::convert(
        &state.db,
        state.storage.as_ref(),
        converter,
        std::path::Path::new(&state.config.storage.work_dir),
        kind,
        upload,
    )
    .await?;

    Ok(Html(format!(
        r#"<div class="result"><p>{} finished: <strong>{}</strong></p><a href="/download/{}">Download</a></div>"#,
        kind.label(),
        escape(response.filename.as_str()),
        response.download_id
    )))
}

/// Pull the `file` part out of a multipart body. Other parts are ignored.
async fn read_upload(mut multipart: Multipart) -> Result<Upload> {
    let mut upload = Upload {
        filename: None,
        data: Default::default(),
    };

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        AppError::InvalidRequest(format!("Failed to process multipart: {}", e))
    })? {
        if field.name() != Some("file") {
            continue;
        }

        upload.filename = field.file_name().map(|s| s.to_string());

        let mut data = BytesMut::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| {
            AppError::InvalidRequest(format!("Failed to read file chunk: {}", e))
        })? {
            data.extend_from_slice(&chunk);
        }
        upload.data = data.freeze();
    }

    Ok(upload)
}
