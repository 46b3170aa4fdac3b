// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Rhythmics: Spotify listening insights
//!
//! This crate provides the backend API that logs users in with Spotify,
//! keeps their OAuth tokens fresh and serves trimmed views of their
//! top artists, tracks, genres and playback.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::{CredentialStore, IdentityStore};
use error::AppError;
use services::{AccountsClient, IdentityBinder, SpotifyClient, SpotifyService, TokenManager};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub spotify_service: SpotifyService,
}

impl AppState {
    /// Wire the services together over the given stores.
    pub fn new(
        config: Config,
        identities: Arc<dyn IdentityStore>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, AppError> {
        let accounts = AccountsClient::new(
            &config.spotify_accounts_url,
            &config.spotify_client_id,
            &config.spotify_client_secret,
            config.http_timeout,
        )?;
        let client = SpotifyClient::new(&config.spotify_api_url, config.http_timeout)?;
        let tokens = TokenManager::new(accounts.clone(), credentials);
        let binder = IdentityBinder::new(identities);

        let spotify_service = SpotifyService::new(
            client,
            accounts,
            tokens,
            binder,
            config.spotify_redirect_uri.clone(),
        );

        Ok(Self {
            config,
            spotify_service,
        })
    }
}
