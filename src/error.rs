//! Error types for clark.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Result type alias for clark operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for clark.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Search(#[from] crate::search::SearchError),

    #[error(transparent)]
    Fetch(#[from] crate::extract::FetchError),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Search(_) => StatusCode::BAD_GATEWAY,
            Error::Fetch(crate::extract::FetchError::InvalidUrl { .. }) => StatusCode::BAD_REQUEST,
            Error::Fetch(_) => StatusCode::BAD_GATEWAY,
            Error::Provider(_) => StatusCode::BAD_GATEWAY,
            Error::Upstream(_) => StatusCode::BAD_GATEWAY,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": {
                "message": self.to_string(),
                "type": "clark_error",
                "code": status.as_u16()
            }
        });

        (status, axum::Json(body)).into_response()
    }
}
