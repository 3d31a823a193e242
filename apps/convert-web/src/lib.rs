//! File conversion web service
//!
//! Server-rendered forms for five conversions, each recorded as a
//! `ProcessedFile` row in SQLite with its blobs under a media root:
//!
//! - `/image-to-pdf/` - images to a Letter-sized PDF
//! - `/pdf-merge/` - concatenate PDFs
//! - `/pdf-password/` - password-protect a PDF
//! - `/pdf-to-ppt/` - PDF pages to picture slides
//! - `/ocr-extraction/` - text from an image
//!
//! Outputs are served from `/download/:id/`; `/history/` lists recent work.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pages;
pub mod state;
pub mod storage;
pub mod store;

pub use config::Config;
pub use error::ApiError;
pub use state::AppState;

/// Build the router. `body_limit` caps request bodies in bytes.
pub fn app(state: Arc<AppState>, body_limit: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        // Operations: form on GET, conversion on POST
        .route(
            "/image-to-pdf/",
            get(handlers::image_to_pdf_form).post(handlers::image_to_pdf),
        )
        .route(
            "/pdf-merge/",
            get(handlers::pdf_merge_form).post(handlers::pdf_merge),
        )
        .route(
            "/pdf-password/",
            get(handlers::pdf_password_form).post(handlers::pdf_password),
        )
        .route(
            "/pdf-to-ppt/",
            get(handlers::pdf_to_ppt_form).post(handlers::pdf_to_ppt),
        )
        .route(
            "/ocr-extraction/",
            get(handlers::ocr_extraction_form).post(handlers::ocr_extraction),
        )
        // Results
        .route("/download/:id/", get(handlers::download))
        .route("/history/", get(handlers::history))
        .route("/history/:id/delete/", post(handlers::delete_record))
        .route("/api/history", get(handlers::api_history))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
