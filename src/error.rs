use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Config(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Why a single refresh cycle produced no record.
///
/// Transport problems (`Timeout`, `Request`) mean the site was unreachable;
/// `Incomplete` and `NoData` mean it answered with a shape none of the
/// extraction strategies understood.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Timeout loading {url}")]
    Timeout { url: String },

    #[error("Request failed for {url}: {reason}")]
    Request { url: String, reason: String },

    #[error("Response from {url} looks incomplete (no 'zł' or very short, {len} bytes)")]
    Incomplete { url: String, len: usize },

    #[error("No fundraiser data found in {url}")]
    NoData { url: String },

    #[error("API returned no fundraiser data for {slug}")]
    ApiNoData { slug: String },

    #[error("Invalid fundraiser URL or slug: {0:?}")]
    InvalidFundraiser(String),
}
