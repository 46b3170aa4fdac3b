// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistence layer.
//!
//! Two stores sit behind traits so the token manager and identity binder
//! don't care where records live: Firestore in production and a
//! process-local map for development and tests.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{TokenRecord, UserIdentity};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Reverse index keyed by Spotify user ID; enforces uniqueness.
    pub const SPOTIFY_ACCOUNTS: &str = "spotify_accounts";
    pub const TOKENS: &str = "tokens";
}

/// Keyed persistence for each user's single token set.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self, user_id: &str) -> Result<Option<TokenRecord>, AppError>;

    /// Full upsert; every field of the stored record is replaced.
    async fn save(&self, user_id: &str, record: &TokenRecord) -> Result<(), AppError>;

    async fn delete(&self, user_id: &str) -> Result<(), AppError>;
}

/// Result of attempting to create a user for a Spotify account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// Another user already holds this Spotify ID.
    AlreadyBound,
}

/// Local users with a uniqueness constraint on the Spotify user ID.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_spotify_id(&self, spotify_id: &str)
        -> Result<Option<UserIdentity>, AppError>;

    async fn get_user(&self, user_id: &str) -> Result<Option<UserIdentity>, AppError>;

    /// Insert `user` unless its Spotify ID is already bound. Must be atomic
    /// with respect to concurrent calls for the same Spotify ID.
    async fn try_create_user(&self, user: &UserIdentity) -> Result<CreateOutcome, AppError>;

    /// Delete the user, its Spotify binding and its tokens.
    async fn delete_user(&self, user_id: &str) -> Result<(), AppError>;
}
