// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rhythmics API Server
//!
//! Logs users in with Spotify and serves their listening insights, keeping
//! each user's access token fresh behind the scenes.

use rhythmics::{
    config::{Config, StorageBackend},
    db::{CredentialStore, FirestoreDb, IdentityStore, MemoryDb},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Rhythmics API");

    let (identities, credentials): (Arc<dyn IdentityStore>, Arc<dyn CredentialStore>) =
        match config.storage_backend {
            StorageBackend::Firestore => {
                let db = FirestoreDb::new(&config.gcp_project_id).await?;
                tracing::info!(project = %config.gcp_project_id, "Using Firestore storage");
                (Arc::new(db.clone()), Arc::new(db))
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; users and tokens are lost on restart");
                let db = MemoryDb::new();
                (Arc::new(db.clone()), Arc::new(db))
            }
        };

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), identities, credentials)?);

    // Build router
    let app = rhythmics::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rhythmics=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
