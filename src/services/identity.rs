// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Binds Spotify accounts to local users.

use crate::db::{CreateOutcome, IdentityStore};
use crate::error::AppError;
use crate::models::UserIdentity;
use std::sync::Arc;

#[derive(Clone)]
pub struct IdentityBinder {
    store: Arc<dyn IdentityStore>,
}

impl IdentityBinder {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Return the user bound to `spotify_id`, creating one on first login.
    ///
    /// Concurrent first logins for one account race on the store's
    /// uniqueness constraint; the loser reads back the winner's user.
    pub async fn resolve_or_create_user(&self, spotify_id: &str) -> Result<UserIdentity, AppError> {
        if spotify_id.is_empty() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "Spotify profile has an empty user ID"
            )));
        }

        if let Some(user) = self.store.find_by_spotify_id(spotify_id).await? {
            return Ok(user);
        }

        let candidate = UserIdentity::new(spotify_id);
        match self.store.try_create_user(&candidate).await? {
            CreateOutcome::Created => {
                tracing::info!(user_id = %candidate.id, "New user bound to Spotify account");
                Ok(candidate)
            }
            CreateOutcome::AlreadyBound => {
                tracing::debug!("Lost first-login race, reading back existing user");
                self.store
                    .find_by_spotify_id(spotify_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::Database(format!(
                            "Spotify account {} bound but user missing",
                            spotify_id
                        ))
                    })
            }
        }
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<UserIdentity>, AppError> {
        self.store.get_user(user_id).await
    }

    /// Delete the user and, by cascade, its tokens.
    pub async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        if self.get_user(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }
        self.store.delete_user(user_id).await
    }
}
