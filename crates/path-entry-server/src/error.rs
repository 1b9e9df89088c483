//! Error types for the path entry service

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use path_entry::FieldErrors;
use serde_json::json;

/// Startup failures
#[derive(Debug)]
pub enum ServerError {
    Geocoding(google_geocoding_client::GeocodingError),
    Io(Box<std::io::Error>),
    Seed(serde_json::Error),
    Config(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Geocoding(e) => write!(f, "Geocoding client error: {}", e),
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Seed(e) => write!(f, "Invalid seed file: {}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Geocoding(e) => Some(e),
            Self::Io(e) => Some(e.as_ref()),
            Self::Seed(e) => Some(e),
            Self::Config(_) => None,
        }
    }
}

impl From<google_geocoding_client::GeocodingError> for ServerError {
    fn from(e: google_geocoding_client::GeocodingError) -> Self {
        Self::Geocoding(e)
    }
}

impl From<std::io::Error> for ServerError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(Box::new(e))
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Seed(e)
    }
}

impl From<tracing_subscriber::filter::ParseError> for ServerError {
    fn from(e: tracing_subscriber::filter::ParseError) -> Self {
        Self::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// Request error that converts to an HTTP response
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    /// Inline field errors, returned as-is so the form can show them
    Invalid(FieldErrors),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))).into_response()
            }
            AppError::Invalid(errors) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(errors)).into_response()
            }
        }
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Invalid(errors)
    }
}
