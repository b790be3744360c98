use axum::{
    http::StatusCode,
    BoxError,
    response::{IntoResponse, Response},
};
use core_types::Series;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error while fetching {series}: {source}")]
    Database {
        series: Series,
        #[source]
        source: database::DbError,
    },
    #[error("Failed to serialise {series} result: {source}")]
    Serialization {
        series: Series,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid query string for {series}: {reason}")]
    InvalidQuery { series: Series, reason: String },
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Converts our custom `AppError` into a plain-text HTTP response.
///
/// The underlying cause is logged server-side only; clients get a generic
/// message naming the series.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Database { series, source } => {
                tracing::error!(series = %series, error = %source, "Database error.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to fetch {} data", series.label()),
                )
            }
            AppError::Serialization { series, source } => {
                tracing::error!(series = %series, error = %source, "Serialization error.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to encode {} data", series.label()),
                )
            }
            AppError::InvalidQuery { series, reason } => {
                tracing::warn!(series = %series, reason = %reason, "Rejected query string.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to fetch {} data", series.label()),
                )
            }
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        };

        (status, message).into_response()
    }
}

/// Turns a failure from the router's middleware stack into a response. The
/// only fallible layer is the request timeout.
pub async fn handle_timeout(err: BoxError) -> (StatusCode, String) {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::error!("Request exceeded the write timeout.");
        (StatusCode::INTERNAL_SERVER_ERROR, "Request timed out".to_string())
    } else {
        tracing::error!(error = %err, "Unhandled middleware error.");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    }
}
