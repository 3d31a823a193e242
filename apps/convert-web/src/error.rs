//! Error types for the conversion service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use convert_core::ConvertError;
use serde_json::json;
use thiserror::Error;

use crate::models::Operation;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or insufficient input; nothing was attempted.
    #[error("{0}")]
    Validation(String),

    /// An input of the wrong type, e.g. a non-PDF submitted for merging.
    #[error("{0}")]
    Format(String),

    /// A conversion library failed.
    #[error("Conversion failed: {0}")]
    Library(#[from] ConvertError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Stable name of the error kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::Format(_) => "format",
            ApiError::Library(_) => "library",
            ApiError::NotFound(_) => "not_found",
            ApiError::Database(_) => "database",
            ApiError::Storage(_) => "storage",
            ApiError::Internal(_) => "internal",
        }
    }

    /// What the user sees when `operation` fails with this error.
    ///
    /// Input problems are reported as-is; everything else collapses to the
    /// operation's generic failure message.
    pub fn user_message(&self, operation: Operation) -> String {
        match self {
            ApiError::Validation(msg) | ApiError::Format(msg) => msg.clone(),
            _ => operation.failure_message().to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(msg) | ApiError::Format(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} not found", what)),
            ApiError::Library(e) => {
                tracing::error!("Conversion error: {}", e);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Conversion failed".to_string(),
                )
            }
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            ApiError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage error".to_string(),
                )
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
