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
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    /// The user has never completed the authorization flow.
    #[error("No Spotify credential on file")]
    NoCredential,

    /// The stored refresh token was rejected; the user must log in again.
    #[error("Spotify reauthentication required")]
    ReauthenticationRequired,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// The Spotify token endpoint rejected an exchange.
    #[error("Spotify token endpoint returned {status}: {body}")]
    UpstreamAuth { status: u16, body: String },

    /// A Spotify Web API call returned a non-success status.
    #[error("Spotify API returned {status}: {body}")]
    SpotifyApi { status: u16, body: String },

    /// Spotify could not be reached (connect error or timeout).
    #[error("Spotify unavailable: {0}")]
    SpotifyUnavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::SpotifyUnavailable(err.to_string())
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
            AppError::NoCredential => (StatusCode::UNAUTHORIZED, "no_credential", None),
            AppError::ReauthenticationRequired => {
                (StatusCode::UNAUTHORIZED, "reauthentication_required", None)
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::UpstreamAuth { status, body } => {
                tracing::warn!(status, body = %body, "Spotify token exchange rejected");
                (StatusCode::BAD_GATEWAY, "spotify_auth_error", None)
            }
            AppError::SpotifyApi { status, body } => {
                if *status == 429 {
                    tracing::warn!("Spotify rate limit hit (429)");
                    (StatusCode::TOO_MANY_REQUESTS, "spotify_rate_limited", None)
                } else {
                    (
                        StatusCode::BAD_GATEWAY,
                        "spotify_error",
                        Some(format!("HTTP {}: {}", status, body)),
                    )
                }
            }
            AppError::SpotifyUnavailable(msg) => {
                tracing::warn!(error = %msg, "Spotify unreachable");
                (StatusCode::GATEWAY_TIMEOUT, "spotify_unavailable", None)
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
