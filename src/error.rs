// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::config::ConfigError;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Failed to refresh Spotify token. Please reconnect your account.")]
    TokenRefresh(String),

    #[error("Spotify token lifetime out of range: {0}s")]
    TokenLifetime(i64),

    #[error("No Spotify token found. Please reconnect your Spotify account.")]
    NoToken,

    #[error("No tracks found in your Spotify account")]
    NoTracks,

    #[error("{message}")]
    UpstreamFetch { status: u16, message: String },

    #[error("User lookup failed: {0}")]
    UserLookup(String),

    #[error("User creation failed: {0}")]
    UserCreation(String),

    #[error("Sign-in link generation failed: {0}")]
    LinkGeneration(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Build an upstream failure from a Spotify response status.
    pub fn upstream(status: reqwest::StatusCode, message: impl Into<String>) -> Self {
        AppError::UpstreamFetch {
            status: status.as_u16(),
            message: message.into(),
        }
    }

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidToken | AppError::TokenRefresh(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::NoToken | AppError::NoTracks | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UpstreamFetch { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::TokenExchange(_) | AppError::TokenLifetime(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::UserLookup(_)
            | AppError::UserCreation(_)
            | AppError::LinkGeneration(_)
            | AppError::Database(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Server-side failures are logged with detail but returned generically.
        let error = if status.is_server_error() && !matches!(self, AppError::UpstreamFetch { .. })
        {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
            self.to_string()
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
