//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` to provide consistent error formatting.

use crate::receipts::StoreError;
use axum::{
    extract::multipart::MultipartRejection,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Application-level error types
///
/// All errors that can occur in the application are represented by this enum.
/// Each variant implements automatic conversion to HTTP responses via `IntoResponse`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Receipt with the given ID was not found
    #[error("Receipt not found with id: {0}")]
    ReceiptNotFound(Uuid),

    /// Receipt exists but has no stored image
    #[error("No image stored for receipt: {0}")]
    ImageNotFound(Uuid),

    /// Uploaded file is missing, empty, or malformed
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    /// Request body exceeded the configured upload limit
    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    /// Reading the upload stream failed
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// Error occurred in the receipt store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Request could not be extracted (bad path id, malformed body)
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Status chosen by the rejecting extractor
        status: StatusCode,
        /// Rejection text
        message: String,
    },
}

impl AppError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ReceiptNotFound(_) => StatusCode::NOT_FOUND,
            AppError::ImageNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UploadFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidRequest { status, .. } => *status,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidRequest {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::InvalidRequest {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status.as_u16(), error = %error_message, "Request failed");
        }

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
