// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{DateTime, Duration, Utc};
use rhythmics::config::Config;
use rhythmics::db::{CredentialStore, FirestoreDb, MemoryDb};
use rhythmics::models::TokenRecord;
use rhythmics::routes::create_router;
use rhythmics::services::{AccountsClient, TokenManager};
use rhythmics::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Config whose Spotify endpoints all point at a mock server.
#[allow(dead_code)]
pub fn config_for_mock(mock_uri: &str) -> Config {
    Config {
        spotify_accounts_url: mock_uri.to_string(),
        spotify_api_url: format!("{}/v1", mock_uri),
        ..Config::test_default()
    }
}

/// Create a test app backed by an in-memory store.
/// Returns the router, the shared state and the store for inspection.
#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>, MemoryDb) {
    let db = MemoryDb::new();
    let state = Arc::new(
        AppState::new(config, Arc::new(db.clone()), Arc::new(db.clone()))
            .expect("Failed to build app state"),
    );

    (create_router(state.clone()), state, db)
}

/// Create a test app with default config (Spotify unreachable).
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, MemoryDb) {
    create_test_app_with_config(Config::test_default())
}

/// Create a test app whose frontend lives at `frontend_url`.
#[allow(dead_code)]
pub fn create_test_app_with_frontend_url(
    frontend_url: &str,
) -> (axum::Router, Arc<AppState>, MemoryDb) {
    create_test_app_with_config(Config {
        frontend_url: frontend_url.to_string(),
        ..Config::test_default()
    })
}

/// Token manager talking to a mock accounts service.
#[allow(dead_code)]
pub fn token_manager(mock_uri: &str, store: Arc<dyn CredentialStore>) -> TokenManager {
    let config = config_for_mock(mock_uri);
    let accounts = AccountsClient::new(
        &config.spotify_accounts_url,
        &config.spotify_client_id,
        &config.spotify_client_secret,
        config.http_timeout,
    )
    .expect("Failed to build accounts client");
    TokenManager::new(accounts, store)
}

/// A token record expiring at `expires_at`.
#[allow(dead_code)]
pub fn token_record(access: &str, refresh: &str, expires_at: DateTime<Utc>) -> TokenRecord {
    TokenRecord {
        spotify_id: "user_42".to_string(),
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        expires_at,
        scope: Some("user-top-read".to_string()),
    }
}

/// A record that expired a minute ago.
#[allow(dead_code)]
pub fn expired_record(access: &str, refresh: &str) -> TokenRecord {
    token_record(access, refresh, Utc::now() - Duration::minutes(1))
}

/// Session cookie header value for `user_id`.
#[allow(dead_code)]
pub fn session_cookie(user_id: &str, config: &Config) -> String {
    let jwt = rhythmics::middleware::auth::create_jwt(user_id, &config.jwt_signing_key)
        .expect("Failed to create JWT");
    format!("{}={}", rhythmics::middleware::auth::SESSION_COOKIE, jwt)
}
