pub mod config;
pub mod convert;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod storage;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Database;
use crate::storage::StorageProvider;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub storage: Arc<dyn StorageProvider>,
}

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/conversions", get(handlers::listing::list_conversions));

    Router::new()
        .route("/", get(handlers::page::index))
        .route("/health", get(handlers::listing::health))
        .route("/convert/pdf-to-word", post(handlers::convert::pdf_to_word))
        .route("/convert/word-to-pdf", post(handlers::convert::word_to_pdf))
        .route("/convert/jpg-svg", post(handlers::convert::jpg_svg))
        .route("/download/:id", get(handlers::download::download))
        .route("/converted-files", get(handlers::listing::converted_files))
        .nest("/api/v1", api_routes)
        .layer(DefaultBodyLimit::max(state.config.server.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
