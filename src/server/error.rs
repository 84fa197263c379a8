//! HTTP-layer errors and their responses.
//!
//! Form endpoints answer in plain text; `/convert` wraps the same error in
//! [`JsonError`] to answer `{"error": "..."}`. Conversion failures never
//! leak their details to the client, only to the log.

use crate::error::ConvertError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Body of every 413.
pub const TOO_LARGE_MESSAGE: &str =
    "Request entity too large. Please try uploading a smaller file.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("No file or pasted image selected")]
    NothingSubmitted,

    #[error("No file part")]
    NoFilePart,

    #[error("No selected file")]
    NoSelectedFile,

    #[error("File type not allowed: '{0}'. Allowed: pdf, png, jpg, jpeg")]
    DisallowedExtension(String),

    #[error("{}", TOO_LARGE_MESSAGE)]
    PayloadTooLarge(String),

    #[error("Could not read upload")]
    MalformedUpload(String),

    #[error("Could not decode pasted image")]
    UndecodableImage(String),

    #[error("File not found")]
    NotFound(String),

    #[error("Conversion failed")]
    Conversion(#[from] ConvertError),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NothingSubmitted
            | AppError::NoFilePart
            | AppError::NoSelectedFile
            | AppError::DisallowedExtension(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::MalformedUpload(_) | AppError::UndecodableImage(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conversion(e) => match e {
                ConvertError::ImageDecodeFailed { .. } | ConvertError::CorruptPdf { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                ConvertError::UnsupportedFormat { .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn log(&self) {
        match self {
            AppError::PayloadTooLarge(detail) => error!("Request entity too large: {}", detail),
            AppError::Conversion(e) => error!("Conversion failed: {}", e),
            AppError::Internal(detail) => error!("Internal error: {}", detail),
            AppError::MalformedUpload(detail) | AppError::UndecodableImage(detail) => {
                warn!("{}: {}", self, detail)
            }
            AppError::NotFound(name) => warn!("Download of missing file '{}'", name),
            _ => warn!("Rejected request: {}", self),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        (self.status_code(), self.to_string()).into_response()
    }
}

/// [`AppError`] rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct JsonError(pub AppError);

impl From<AppError> for JsonError {
    fn from(e: AppError) -> Self {
        JsonError(e)
    }
}

impl From<ConvertError> for JsonError {
    fn from(e: ConvertError) -> Self {
        JsonError(e.into())
    }
}

impl From<std::io::Error> for JsonError {
    fn from(e: std::io::Error) -> Self {
        JsonError(e.into())
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        // 413 is plain text on every route.
        if matches!(self.0, AppError::PayloadTooLarge(_)) {
            return self.0.into_response();
        }
        self.0.log();
        let body = Json(json!({ "error": self.0.to_string() }));
        (self.0.status_code(), body).into_response()
    }
}
