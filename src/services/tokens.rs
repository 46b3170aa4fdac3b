// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token lifecycle: hand out a currently-valid Spotify access token per
//! user, refreshing on demand.
//!
//! A record is expired once `now >= expires_at`; there is no background
//! refresh. Refreshes for one user are serialized by a per-user mutex so a
//! single expiry triggers a single refresh grant, which matters because
//! Spotify may rotate the refresh token on use.

use crate::db::CredentialStore;
use crate::error::AppError;
use crate::models::{TokenRecord, UserIdentity};
use crate::services::accounts::{AccountsClient, TokenGrant};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Lock table: local user ID to the mutex guarding that user's refresh.
type RefreshLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Owns every write to a user's [`TokenRecord`].
#[derive(Clone)]
pub struct TokenManager {
    accounts: AccountsClient,
    store: Arc<dyn CredentialStore>,
    /// Per-user mutex to serialize token refresh operations.
    refresh_locks: RefreshLocks,
}

impl TokenManager {
    pub fn new(accounts: AccountsClient, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            accounts,
            store,
            refresh_locks: Arc::new(DashMap::new()),
        }
    }

    fn lock_for(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.refresh_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop our handle on the user's lock and remove the table entry if no
    /// other task holds or awaits it. Must be called after the guard is gone.
    fn release_lock(&self, user_id: &str, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.refresh_locks
            .remove_if(user_id, |_, entry| Arc::strong_count(entry) == 1);
    }

    /// Persist the token set from a completed authorization-code exchange.
    ///
    /// Replaces any record left from an earlier login.
    pub async fn store_initial_tokens(
        &self,
        user: &UserIdentity,
        grant: TokenGrant,
        issued_at: DateTime<Utc>,
    ) -> Result<TokenRecord, AppError> {
        let refresh_token = grant.refresh_token.ok_or_else(|| AppError::UpstreamAuth {
            status: 200,
            body: "missing refresh_token".to_string(),
        })?;

        let record = TokenRecord {
            spotify_id: user.spotify_id.clone(),
            access_token: grant.access_token,
            refresh_token,
            expires_at: TokenRecord::expiry_from(issued_at, grant.expires_in),
            scope: grant.scope,
        };

        let lock = self.lock_for(&user.id);
        let saved = {
            let _guard = lock.lock().await;
            self.store.save(&user.id, &record).await
        };
        self.release_lock(&user.id, lock);
        saved?;

        tracing::info!(user_id = %user.id, expires_at = %record.expires_at, "Tokens stored");
        Ok(record)
    }

    /// Get a valid (non-expired) access token for the given user.
    ///
    /// Fails with [`AppError::NoCredential`] if the user never authorized,
    /// or [`AppError::ReauthenticationRequired`] if Spotify rejected the
    /// refresh. In the latter case the stored record is left untouched.
    pub async fn get_valid_access_token(&self, user_id: &str) -> Result<String, AppError> {
        // Fast path, no lock
        let record = self.store.load(user_id).await?.ok_or(AppError::NoCredential)?;
        if !record.is_expired_at(Utc::now()) {
            return Ok(record.access_token);
        }

        let lock = self.lock_for(user_id);
        let result = {
            let _guard = lock.lock().await;
            self.reload_or_refresh_locked(user_id).await
        };
        self.release_lock(user_id, lock);
        result
    }

    async fn reload_or_refresh_locked(&self, user_id: &str) -> Result<String, AppError> {
        // Another task may have refreshed while we were waiting.
        let record = self.store.load(user_id).await?.ok_or(AppError::NoCredential)?;
        if !record.is_expired_at(Utc::now()) {
            return Ok(record.access_token);
        }

        self.refresh_locked(user_id, record).await
    }

    /// Refresh grant plus persist. Caller must hold the user's lock.
    async fn refresh_locked(&self, user_id: &str, stale: TokenRecord) -> Result<String, AppError> {
        tracing::info!(user_id, "Access token expired, refreshing");

        let issued_at = Utc::now();
        let grant = match self.accounts.exchange_refresh_token(&stale.refresh_token).await {
            Ok(grant) => grant,
            Err(AppError::UpstreamAuth { status, body }) => {
                tracing::warn!(user_id, status, body = %body, "Token refresh rejected");
                return self.recover_from_rejected_refresh(user_id, &stale).await;
            }
            Err(e) => return Err(e),
        };

        let record = TokenRecord {
            spotify_id: stale.spotify_id,
            access_token: grant.access_token,
            refresh_token: grant.refresh_token.unwrap_or(stale.refresh_token),
            expires_at: TokenRecord::expiry_from(issued_at, grant.expires_in),
            scope: grant.scope.or(stale.scope),
        };

        self.store.save(user_id, &record).await?;

        tracing::info!(user_id, expires_at = %record.expires_at, "Token refreshed");
        Ok(record.access_token)
    }

    /// Another server instance may have refreshed first, leaving us holding a
    /// rotated-out refresh token. The store is authoritative: if it now holds
    /// a different, valid record, use it.
    async fn recover_from_rejected_refresh(
        &self,
        user_id: &str,
        stale: &TokenRecord,
    ) -> Result<String, AppError> {
        match self.store.load(user_id).await? {
            Some(current) if current != *stale && !current.is_expired_at(Utc::now()) => {
                tracing::info!(user_id, "Refresh race lost to another instance, using its token");
                Ok(current.access_token)
            }
            _ => Err(AppError::ReauthenticationRequired),
        }
    }

    /// Drop the user's tokens and lock entry (account deletion).
    pub async fn forget(&self, user_id: &str) -> Result<(), AppError> {
        let lock = self.lock_for(user_id);
        let deleted = {
            let _guard = lock.lock().await;
            self.store.delete(user_id).await
        };
        self.release_lock(user_id, lock);
        deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Store where another instance "wins" the refresh: after `swap_after`
    /// loads, the stored record is replaced with a freshly refreshed one.
    struct RacingStore {
        inner: MemoryDb,
        loads: AtomicUsize,
        swap_after: usize,
        winner: TokenRecord,
    }

    #[async_trait]
    impl CredentialStore for RacingStore {
        async fn load(&self, user_id: &str) -> Result<Option<TokenRecord>, AppError> {
            if self.loads.fetch_add(1, Ordering::SeqCst) + 1 == self.swap_after {
                self.inner.save(user_id, &self.winner).await?;
            }
            self.inner.load(user_id).await
        }

        async fn save(&self, user_id: &str, record: &TokenRecord) -> Result<(), AppError> {
            self.inner.save(user_id, record).await
        }

        async fn delete(&self, user_id: &str) -> Result<(), AppError> {
            self.inner.delete(user_id).await
        }
    }

    fn record(access: &str, refresh: &str, expires_at: DateTime<Utc>) -> TokenRecord {
        TokenRecord {
            spotify_id: "user_42".to_string(),
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
            expires_at,
            scope: None,
        }
    }

    async fn rejecting_accounts() -> (MockServer, AccountsClient) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#))
            .expect(1)
            .mount(&server)
            .await;
        let accounts =
            AccountsClient::new(&server.uri(), "id", "secret", Duration::from_secs(5)).unwrap();
        (server, accounts)
    }

    #[tokio::test]
    async fn test_rejected_refresh_uses_record_written_by_other_instance() {
        let (_server, accounts) = rejecting_accounts().await;
        let inner = MemoryDb::new();
        let stale = record("A1", "R1", Utc::now() - chrono::Duration::minutes(1));
        inner.save("u1", &stale).await.unwrap();

        // Loads: fast path, under lock, then recovery sees the winner.
        let store = Arc::new(RacingStore {
            inner: inner.clone(),
            loads: AtomicUsize::new(0),
            swap_after: 3,
            winner: record("A9", "R9", Utc::now() + chrono::Duration::hours(1)),
        });
        let tokens = TokenManager::new(accounts, store);

        assert_eq!(tokens.get_valid_access_token("u1").await.unwrap(), "A9");
    }

    #[tokio::test]
    async fn test_rejected_refresh_without_winner_requires_reauth() {
        let (_server, accounts) = rejecting_accounts().await;
        let inner = MemoryDb::new();
        inner
            .save("u1", &record("A1", "R1", Utc::now() - chrono::Duration::minutes(1)))
            .await
            .unwrap();
        let tokens = TokenManager::new(accounts, Arc::new(inner));

        assert!(matches!(
            tokens.get_valid_access_token("u1").await,
            Err(AppError::ReauthenticationRequired)
        ));
    }

    #[tokio::test]
    async fn test_lock_entries_released_after_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"access_token":"A2","refresh_token":"R2","expires_in":3600}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;
        let accounts =
            AccountsClient::new(&server.uri(), "id", "secret", Duration::from_secs(5)).unwrap();
        let db = MemoryDb::new();
        db.save("u1", &record("A1", "R1", Utc::now() - chrono::Duration::minutes(1)))
            .await
            .unwrap();
        let tokens = TokenManager::new(accounts, Arc::new(db));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tokens = tokens.clone();
                tokio::spawn(async move { tokens.get_valid_access_token("u1").await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "A2");
        }

        assert!(tokens.refresh_locks.is_empty());
    }

    #[tokio::test]
    async fn test_lock_entry_kept_while_another_task_holds_it() {
        let accounts =
            AccountsClient::new("http://127.0.0.1:1", "id", "secret", Duration::from_secs(1))
                .unwrap();
        let db = MemoryDb::new();
        let tokens = TokenManager::new(accounts, Arc::new(db));

        let held = tokens.lock_for("u1");
        let mine = tokens.lock_for("u1");
        tokens.release_lock("u1", mine);
        assert!(tokens.refresh_locks.contains_key("u1"));

        tokens.release_lock("u1", held);
        assert!(tokens.refresh_locks.is_empty());
    }

    #[tokio::test]
    async fn test_store_initial_tokens_requires_refresh_token() {
        let accounts = AccountsClient::new(
            "http://127.0.0.1:1",
            "id",
            "secret",
            Duration::from_secs(1),
        )
        .unwrap();
        let db = MemoryDb::new();
        let tokens = TokenManager::new(accounts, Arc::new(db.clone()));
        let user = UserIdentity::new("user_42");
        let grant = TokenGrant {
            access_token: "A1".to_string(),
            refresh_token: None,
            expires_in: 3600,
            scope: None,
        };

        let result = tokens.store_initial_tokens(&user, grant, Utc::now()).await;

        assert!(matches!(result, Err(AppError::UpstreamAuth { .. })));
        assert_eq!(db.token_count(), 0);
    }
}
