//! Local user identity and the OAuth credential bound to it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Local user record.
///
/// Stored at `users/{id}`. The Spotify user ID is unique across all users;
/// `spotify_accounts/{spotify_id}` holds the reverse mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Opaque local ID (UUID v4)
    pub id: String,
    /// Spotify user ID
    pub spotify_id: String,
    /// When the user first connected
    pub created_at: DateTime<Utc>,
}

impl UserIdentity {
    /// A fresh identity for a Spotify account seen for the first time.
    pub fn new(spotify_id: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            spotify_id: spotify_id.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// User's Spotify OAuth tokens.
///
/// Stored at `tokens/{user_id}`; exactly one per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Copy of the owning user's Spotify ID
    pub spotify_id: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Issuance time plus the lifetime Spotify declared
    pub expires_at: DateTime<Utc>,
    /// Granted OAuth scopes, space separated
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenRecord {
    /// Whether the access token is past its expiry at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Expiry for a token issued at `issued_at` with the given lifetime.
    ///
    /// Saturates at the latest representable time; the lifetime comes from
    /// Spotify and is not trusted to be sane.
    pub fn expiry_from(issued_at: DateTime<Utc>, expires_in_secs: u64) -> DateTime<Utc> {
        i64::try_from(expires_in_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
