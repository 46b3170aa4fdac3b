// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Secrets are injected as environment variables by the deployment
//! (or a local `.env` file) and read once at startup.

use std::env;
use std::time::Duration;

/// Which backend persists users and tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Google Cloud Firestore (production, or the emulator).
    Firestore,
    /// Process-local maps, lost on restart. Local development only.
    Memory,
}

impl StorageBackend {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::Invalid("STORAGE_BACKEND")),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Spotify OAuth client ID (public)
    pub spotify_client_id: String,
    /// Redirect URI registered with Spotify for the authorization callback
    pub spotify_redirect_uri: String,
    /// Base URL of the Spotify accounts service (token endpoint lives here)
    pub spotify_accounts_url: String,
    /// Base URL of the Spotify Web API
    pub spotify_api_url: String,
    /// Frontend URL for post-login redirects and CORS
    pub frontend_url: String,
    /// Also accept CORS requests from `http://localhost` and
    /// `http://127.0.0.1` origins (local frontend dev servers)
    pub allow_localhost_origins: bool,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Persistence backend
    pub storage_backend: StorageBackend,
    /// Upper bound on every upstream HTTP call
    pub http_timeout: Duration,
    /// Server port
    pub port: u16,

    // --- Secrets ---
    /// Spotify OAuth client secret
    pub spotify_client_secret: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// HMAC key for the OAuth `state` parameter (raw bytes)
    pub oauth_state_key: Vec<u8>,
}

pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

impl Config {
    /// Config for tests only. Spotify URLs point nowhere useful; tests that
    /// talk to a mock server override them.
    pub fn test_default() -> Self {
        Self {
            spotify_client_id: "test_client_id".to_string(),
            spotify_redirect_uri: "http://127.0.0.1:8080/auth/spotify/callback".to_string(),
            spotify_accounts_url: DEFAULT_ACCOUNTS_URL.to_string(),
            spotify_api_url: DEFAULT_API_URL.to_string(),
            frontend_url: "http://localhost:4200".to_string(),
            allow_localhost_origins: true,
            gcp_project_id: "test-project".to_string(),
            storage_backend: StorageBackend::Memory,
            http_timeout: Duration::from_secs(5),
            port: 8080,
            spotify_client_secret: "test_secret".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            oauth_state_key: b"test_state_key_32_bytes_minimum!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let http_timeout = env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(raw) => StorageBackend::parse(&raw)?,
            Err(_) => StorageBackend::Firestore,
        };

        let frontend_url = env::var("FRONTEND_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| "http://127.0.0.1:4200".to_string());

        // Defaults to on only for a plain-http (development) frontend.
        let allow_localhost_origins = match env::var("ALLOW_LOCALHOST_ORIGINS") {
            Ok(raw) => parse_flag(&raw).ok_or(ConfigError::Invalid("ALLOW_LOCALHOST_ORIGINS"))?,
            Err(_) => !frontend_url.starts_with("https://"),
        };

        Ok(Self {
            spotify_client_id: required("SPOTIFY_CLIENT_ID")?,
            spotify_redirect_uri: env::var("SPOTIFY_REDIRECT_URI").unwrap_or_else(|_| {
                format!("http://127.0.0.1:{}/auth/spotify/callback", port)
            }),
            spotify_accounts_url: base_url("SPOTIFY_ACCOUNTS_URL", DEFAULT_ACCOUNTS_URL),
            spotify_api_url: base_url("SPOTIFY_API_URL", DEFAULT_API_URL),
            frontend_url,
            allow_localhost_origins,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            storage_backend,
            http_timeout: Duration::from_secs(http_timeout),
            port,

            spotify_client_secret: required("SPOTIFY_CLIENT_SECRET")?,
            jwt_signing_key: required("JWT_SIGNING_KEY")?.into_bytes(),
            oauth_state_key: required("OAUTH_STATE_KEY")?.into_bytes(),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn base_url(name: &str, default: &str) -> String {
    env::var(name)
        .map(|v| v.trim_end_matches('/').to_string())
        .unwrap_or_else(|_| default.to_string())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
