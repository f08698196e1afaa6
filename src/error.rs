// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
///
/// Messages carried by the Garmin variants are already sanitized; raw
/// vendor text never reaches this type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Garmin account not connected: {0}")]
    NotConnected(String),

    #[error("Garmin authentication failed: {0}")]
    GarminAuth(String),

    #[error("Garmin Connect unavailable: {0}")]
    GarminUnavailable(String),

    #[error("Garmin Connect timed out: {0}")]
    Timeout(String),

    #[error("Garmin Connect error: {0}")]
    Garmin(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption error: {0}")]
    Decryption(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Transient failures: the credential is kept and the caller may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::GarminUnavailable(_) | AppError::Timeout(_))
    }

    /// User-facing text for this error, safe to persist on a record.
    pub fn public_message(&self) -> String {
        match self {
            AppError::NotConnected(msg)
            | AppError::GarminAuth(msg)
            | AppError::GarminUnavailable(msg)
            | AppError::Timeout(msg)
            | AppError::Garmin(msg)
            | AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Forbidden(msg) => msg.clone(),
            AppError::Unauthorized | AppError::InvalidToken => self.to_string(),
            AppError::Encryption(_)
            | AppError::Decryption(_)
            | AppError::Database(_)
            | AppError::Internal(_) => {
                "An internal error occurred. Please try again later.".to_string()
            }
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", Some(msg.clone())),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::NotConnected(msg) => {
                (StatusCode::CONFLICT, "not_connected", Some(msg.clone()))
            }
            AppError::GarminAuth(msg) => (
                StatusCode::BAD_REQUEST,
                "garmin_auth_failed",
                Some(msg.clone()),
            ),
            AppError::GarminUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "garmin_unavailable",
                Some(msg.clone()),
            ),
            AppError::Timeout(msg) => (
                StatusCode::GATEWAY_TIMEOUT,
                "garmin_timeout",
                Some(msg.clone()),
            ),
            AppError::Garmin(msg) => (StatusCode::BAD_GATEWAY, "garmin_error", Some(msg.clone())),
            AppError::Encryption(msg) => {
                tracing::error!(error = %msg, "Credential encryption failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "encryption_error", None)
            }
            AppError::Decryption(msg) => {
                tracing::error!(error = %msg, "Credential decryption failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "decryption_error", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
