// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store for local development and tests.

use super::{CreateOutcome, CredentialStore, IdentityStore};
use crate::error::AppError;
use crate::models::{TokenRecord, UserIdentity};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Process-local store. Clones share the same maps.
#[derive(Clone, Default)]
pub struct MemoryDb {
    users: Arc<DashMap<String, UserIdentity>>,
    /// Spotify ID -> local user ID
    accounts: Arc<DashMap<String, String>>,
    tokens: Arc<DashMap<String, TokenRecord>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users stored.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Number of token records stored.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryDb {
    async fn load(&self, user_id: &str) -> Result<Option<TokenRecord>, AppError> {
        Ok(self.tokens.get(user_id).map(|r| r.value().clone()))
    }

    async fn save(&self, user_id: &str, record: &TokenRecord) -> Result<(), AppError> {
        self.tokens.insert(user_id.to_string(), record.clone());
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<(), AppError> {
        self.tokens.remove(user_id);
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for MemoryDb {
    async fn find_by_spotify_id(
        &self,
        spotify_id: &str,
    ) -> Result<Option<UserIdentity>, AppError> {
        let user_id = match self.accounts.get(spotify_id) {
            Some(id) => id.value().clone(),
            None => return Ok(None),
        };
        Ok(self.users.get(&user_id).map(|u| u.value().clone()))
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserIdentity>, AppError> {
        Ok(self.users.get(user_id).map(|u| u.value().clone()))
    }

    async fn try_create_user(&self, user: &UserIdentity) -> Result<CreateOutcome, AppError> {
        // The entry guard holds the shard lock, so the user row is visible
        // before any reader can observe the binding.
        match self.accounts.entry(user.spotify_id.clone()) {
            Entry::Occupied(_) => Ok(CreateOutcome::AlreadyBound),
            Entry::Vacant(slot) => {
                self.users.insert(user.id.clone(), user.clone());
                slot.insert(user.id.clone());
                Ok(CreateOutcome::Created)
            }
        }
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        self.tokens.remove(user_id);
        if let Some((_, user)) = self.users.remove(user_id) {
            self.accounts
                .remove_if(&user.spotify_id, |_, bound| bound == user_id);
        }
        Ok(())
    }
}
