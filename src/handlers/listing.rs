use axum::{extract::State, response::Html, Json};
use quick_xml::escape::escape;

use crate::error::{ApiResponse, Result};
use crate::models::ConversionRecord;
use crate::services::ConversionService;
use crate::AppState;

/// List converted files
/// GET /converted-files
pub async fn converted_files(State(state): State<AppState>) -> Result<Html<String>> {
    let items = ConversionService::list_items(&state.db).await?;

    let mut html = String::from("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Converted files</title></head><body>\n<h1>Converted files</h1>\n");
    if items.is_empty() {
        html.push_str("<p>No converted files yet.</p>\n");
    } else {
        html.push_str("<ul>\n");
        for item in &items {
            html.push_str(&format!(
                "<li><a href=\"/download/{}\">{}</a></li>\n",
                escape(item.blob_id.as_str()),
                escape(item.filename.as_str())
            ));
        }
        html.push_str("</ul>\n");
    }
    html.push_str("<p><a href=\"/\">Convert another file</a></p>\n</body></html>\n");

    Ok(Html(html))
}

/// List conversion records
/// GET /api/v1/conversions
pub async fn list_conversions(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ConversionRecord>>>> {
    let records = ConversionService::list(&state.db).await?;
    Ok(Json(ApiResponse::success(records)))
}

/// GET /health
pub async fn health() -> Json<ApiResponse<()>> {
    Json(ApiResponse::<()>::success_message("ok"))
}
