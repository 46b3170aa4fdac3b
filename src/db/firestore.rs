// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (local identities)
//! - Spotify accounts (unique reverse index: Spotify ID -> user ID)
//! - Tokens (OAuth tokens, one document per user)

use super::{collections, CreateOutcome, CredentialStore, IdentityStore};
use crate::error::AppError;
use crate::models::{TokenRecord, UserIdentity};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Document in `spotify_accounts/{spotify_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccountBinding {
    user_id: String,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator accepts any bearer token; skip real credentials.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    async fn get_binding(&self, spotify_id: &str) -> Result<Option<AccountBinding>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SPOTIFY_ACCOUNTS)
            .obj()
            .one(spotify_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

// ─── Token Operations ────────────────────────────────────────

#[async_trait]
impl CredentialStore for FirestoreDb {
    async fn load(&self, user_id: &str) -> Result<Option<TokenRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::TOKENS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn save(&self, user_id: &str, record: &TokenRecord) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::TOKENS)
            .document_id(user_id)
            .object(record)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::TOKENS)
            .document_id(user_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

// ─── User Operations ─────────────────────────────────────────

#[async_trait]
impl IdentityStore for FirestoreDb {
    async fn find_by_spotify_id(
        &self,
        spotify_id: &str,
    ) -> Result<Option<UserIdentity>, AppError> {
        match self.get_binding(spotify_id).await? {
            Some(binding) => self.get_user(&binding.user_id).await,
            None => Ok(None),
        }
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserIdentity>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Writes the binding (guarded by an "absent" precondition) and the user
    /// document in one transaction, so either both exist or neither does.
    async fn try_create_user(&self, user: &UserIdentity) -> Result<CreateOutcome, AppError> {
        let client = self.get_client()?;
        let binding = AccountBinding {
            user_id: user.id.clone(),
        };

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::SPOTIFY_ACCOUNTS)
            .precondition(firestore::FirestoreWritePrecondition::Exists(false))
            .document_id(&user.spotify_id)
            .object(&binding)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add binding to transaction: {}", e))
            })?;

        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add user to transaction: {}", e)))?;

        match transaction.commit().await {
            Ok(_) => {
                tracing::info!(user_id = %user.id, "User created");
                Ok(CreateOutcome::Created)
            }
            Err(e) => {
                // A failed precondition means another writer bound the
                // account first. Anything else is a real failure.
                if self.get_binding(&user.spotify_id).await?.is_some() {
                    tracing::debug!(error = %e, "Spotify account already bound");
                    Ok(CreateOutcome::AlreadyBound)
                } else {
                    Err(AppError::Database(format!(
                        "Transaction commit failed: {}",
                        e
                    )))
                }
            }
        }
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        let client = self.get_client()?;
        let user = self.get_user(user_id).await?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let mut targets = vec![
            (collections::TOKENS, user_id.to_string()),
            (collections::USERS, user_id.to_string()),
        ];
        if let Some(user) = &user {
            targets.push((collections::SPOTIFY_ACCOUNTS, user.spotify_id.clone()));
        }

        for (collection, doc_id) in &targets {
            client
                .fluent()
                .delete()
                .from(*collection)
                .document_id(doc_id)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!(
                        "Failed to add deletion to transaction for {}: {}",
                        collection, e
                    ))
                })?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit user deletion: {}", e)))?;

        tracing::info!(user_id, deleted = targets.len(), "User data deletion complete");
        Ok(())
    }
}
