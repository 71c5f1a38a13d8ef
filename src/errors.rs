use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
///
/// Prediction engine failures are deliberately absent: they are absorbed by the
/// fallback policy in [`crate::aggregator`] and never reach a caller.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Required input missing or not numeric, or a body that is not JSON.
    Validation(String),
    /// Request body over the configured limit.
    PayloadTooLarge(String),
    /// Weather collaborator unreachable or location unresolvable.
    WeatherLookup(String),
    /// The report document could not be produced.
    Render(String),
    /// Internal server error.
    Internal(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Walks the context chain and returns the innermost error.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self.root(), AppError::Validation(_))
    }

    pub fn is_weather_lookup(&self) -> bool {
        matches!(self.root(), AppError::WeatherLookup(_))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            AppError::WeatherLookup(msg) => write!(f, "Weather lookup error: {}", msg),
            AppError::Render(msg) => write!(f, "Render error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Maps each error variant to an HTTP status code and JSON body.
    ///
    /// Server-side failures are logged here with their detail; the body only
    /// carries a generic message for them.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Validation(msg) => {
                tracing::warn!("Rejected request: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::PayloadTooLarge(msg) => {
                tracing::warn!("Rejected oversized body: {}", msg);
                (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "Request body too large".to_string(),
                )
            }
            AppError::WeatherLookup(msg) => {
                tracing::error!("Weather lookup error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "Weather service unavailable".to_string(),
                )
            }
            AppError::Render(msg) => {
                tracing::error!("Render error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate report".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::WithContext { source, context } => {
                tracing::error!("Error with context: {} -> {}", context, source);
                // Delegate to underlying error's response
                return source.clone().into_response();
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::WeatherLookup(err.to_string())
    }
}

/// Bodies that are not JSON, or not an object of the expected shape, are
/// client errors reported in the usual `{"error": ...}` form.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge(rejection.body_text());
        }
        AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Background task failed: {}", err))
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}
