// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify Web API client for the read-only "top items" queries.
//!
//! Handles:
//! - Profile lookup (also used to learn the Spotify user ID at login)
//! - Top artists / top tracks
//! - Recently played and currently playing

use crate::error::AppError;
use serde::Deserialize;
use std::time::Duration;

/// Ranking window for top items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    /// About 4 weeks
    ShortTerm,
    /// About 6 months
    #[default]
    MediumTerm,
    /// About a year
    LongTerm,
}

impl TimeRange {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }

    /// Parse a query value; anything unrecognized falls back to the default.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("short_term") => TimeRange::ShortTerm,
            Some("medium_term") => TimeRange::MediumTerm,
            Some("long_term") => TimeRange::LongTerm,
            _ => TimeRange::default(),
        }
    }
}

/// Spotify Web API client.
#[derive(Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    base_url: String,
}

impl SpotifyClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the current user's profile.
    pub async fn get_profile(&self, access_token: &str) -> Result<SpotifyProfile, AppError> {
        let url = format!("{}/me", self.base_url);
        self.get_json(&url, access_token, &[]).await
    }

    pub async fn get_top_artists(
        &self,
        access_token: &str,
        time_range: TimeRange,
        limit: u32,
    ) -> Result<Vec<SpotifyArtist>, AppError> {
        let url = format!("{}/me/top/artists", self.base_url);
        let page: Paging<SpotifyArtist> = self
            .get_json(
                &url,
                access_token,
                &[
                    ("time_range", time_range.as_str().to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(page.items)
    }

    pub async fn get_top_tracks(
        &self,
        access_token: &str,
        time_range: TimeRange,
        limit: u32,
    ) -> Result<Vec<SpotifyTrack>, AppError> {
        let url = format!("{}/me/top/tracks", self.base_url);
        let page: Paging<SpotifyTrack> = self
            .get_json(
                &url,
                access_token,
                &[
                    ("time_range", time_range.as_str().to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(page.items)
    }

    pub async fn get_recently_played(
        &self,
        access_token: &str,
        limit: u32,
    ) -> Result<Vec<PlayHistoryItem>, AppError> {
        let url = format!("{}/me/player/recently-played", self.base_url);
        let page: Paging<PlayHistoryItem> = self
            .get_json(&url, access_token, &[("limit", limit.to_string())])
            .await?;
        Ok(page.items)
    }

    /// `None` when nothing is playing (Spotify answers 204 No Content).
    pub async fn get_currently_playing(
        &self,
        access_token: &str,
    ) -> Result<Option<SpotifyPlayback>, AppError> {
        let url = format!("{}/me/player/currently-playing", self.base_url);
        let response = self.http.get(&url).bearer_auth(access_token).send().await?;

        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }

        self.check_response_json(response).await.map(Some)
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await?;

        self.check_response_json(response).await
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 401 {
                tracing::warn!("Spotify rejected access token (401)");
            }
            return Err(AppError::SpotifyApi {
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(|e| AppError::SpotifyApi {
            status: status.as_u16(),
            body: format!("JSON parse error: {}", e),
        })
    }
}

// ─── Upstream Shapes ─────────────────────────────────────────────────────────
//
// Only the fields we forward are modeled; serde ignores the rest.

#[derive(Debug, Clone, Deserialize)]
pub struct Paging<T> {
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Followers {
    #[serde(default)]
    pub total: u64,
}

/// User profile from `GET /me`.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyProfile {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub product: Option<String>,
    #[serde(default)]
    pub followers: Followers,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

/// Full artist object.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub popularity: u32,
    #[serde(default)]
    pub followers: Followers,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimpleArtist {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimpleAlbum {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
}

/// Full track object.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrack {
    /// Null for local files
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SimpleArtist>,
    #[serde(default)]
    pub album: SimpleAlbum,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub popularity: u32,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayHistoryItem {
    pub track: SpotifyTrack,
    pub played_at: String,
}

/// Playback state from `GET /me/player/currently-playing`.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlayback {
    #[serde(default)]
    pub is_playing: bool,
    pub progress_ms: Option<u64>,
    /// Only tracks are modeled; episodes fail to parse and come through as None.
    #[serde(default, deserialize_with = "lenient_track")]
    pub item: Option<SpotifyTrack>,
}

fn lenient_track<'de, D>(deserializer: D) -> Result<Option<SpotifyTrack>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

// ─────────────────────────────────────────────────────────────────────────────
// SpotifyService - High-level service with token management
// ─────────────────────────────────────────────────────────────────────────────

use crate::models::{
    ArtistSummary, CurrentlyPlayingResponse, GenreChart, ProfileResponse, RecentTrack,
    TrackSummary, UserIdentity,
};
use crate::services::accounts::AccountsClient;
use crate::services::identity::IdentityBinder;
use crate::services::insights;
use crate::services::tokens::TokenManager;
use chrono::Utc;

/// Artists sampled for the genre tally.
const GENRE_SAMPLE_ARTISTS: u32 = 50;
/// Genres shown in the chart; the rest only count toward `total_genres`.
const GENRE_CHART_SIZE: usize = 10;

/// High-level Spotify service: login completion plus token-managed API calls.
#[derive(Clone)]
pub struct SpotifyService {
    client: SpotifyClient,
    accounts: AccountsClient,
    tokens: TokenManager,
    identities: IdentityBinder,
    redirect_uri: String,
}

impl SpotifyService {
    pub fn new(
        client: SpotifyClient,
        accounts: AccountsClient,
        tokens: TokenManager,
        identities: IdentityBinder,
        redirect_uri: String,
    ) -> Self {
        Self {
            client,
            accounts,
            tokens,
            identities,
            redirect_uri,
        }
    }

    // ─── OAuth Callback Handling ─────────────────────────────────────────────

    /// Exchange the code, learn who the user is, bind them, store tokens.
    ///
    /// Nothing is written until the exchange and profile lookup succeed.
    pub async fn handle_oauth_callback(&self, code: &str) -> Result<UserIdentity, AppError> {
        let issued_at = Utc::now();
        let grant = self
            .accounts
            .exchange_authorization_code(code, &self.redirect_uri)
            .await?;

        let profile = self.client.get_profile(&grant.access_token).await?;
        let user = self.identities.resolve_or_create_user(&profile.id).await?;
        self.tokens.store_initial_tokens(&user, grant, issued_at).await?;

        tracing::info!(user_id = %user.id, "OAuth callback handled, user and tokens stored");
        Ok(user)
    }

    // ─── API Wrappers ────────────────────────────────────────────────────────

    pub async fn profile(&self, user_id: &str) -> Result<ProfileResponse, AppError> {
        let access_token = self.tokens.get_valid_access_token(user_id).await?;
        let profile = self.client.get_profile(&access_token).await?;
        Ok(insights::profile(profile))
    }

    pub async fn top_artists(
        &self,
        user_id: &str,
        time_range: TimeRange,
        limit: u32,
    ) -> Result<Vec<ArtistSummary>, AppError> {
        let access_token = self.tokens.get_valid_access_token(user_id).await?;
        let artists = self
            .client
            .get_top_artists(&access_token, time_range, limit)
            .await?;
        Ok(insights::rank_artists(artists))
    }

    pub async fn top_tracks(
        &self,
        user_id: &str,
        time_range: TimeRange,
        limit: u32,
    ) -> Result<Vec<TrackSummary>, AppError> {
        let access_token = self.tokens.get_valid_access_token(user_id).await?;
        let tracks = self
            .client
            .get_top_tracks(&access_token, time_range, limit)
            .await?;
        Ok(insights::rank_tracks(tracks))
    }

    pub async fn top_genres(
        &self,
        user_id: &str,
        time_range: TimeRange,
    ) -> Result<GenreChart, AppError> {
        let access_token = self.tokens.get_valid_access_token(user_id).await?;
        let artists = self
            .client
            .get_top_artists(&access_token, time_range, GENRE_SAMPLE_ARTISTS)
            .await?;
        Ok(insights::genre_chart(&artists, GENRE_CHART_SIZE))
    }

    pub async fn recently_played(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<RecentTrack>, AppError> {
        let access_token = self.tokens.get_valid_access_token(user_id).await?;
        let items = self.client.get_recently_played(&access_token, limit).await?;
        Ok(insights::recent_tracks(items))
    }

    pub async fn currently_playing(
        &self,
        user_id: &str,
    ) -> Result<CurrentlyPlayingResponse, AppError> {
        let access_token = self.tokens.get_valid_access_token(user_id).await?;
        let playback = self.client.get_currently_playing(&access_token).await?;
        Ok(insights::now_playing(playback))
    }

    // ─── Account Deletion ────────────────────────────────────────────────────

    /// Remove the user and everything stored for them.
    pub async fn delete_user_data(&self, user_id: &str) -> Result<(), AppError> {
        self.identities.delete_user(user_id).await?;
        self.tokens.forget(user_id).await?;
        tracing::info!(user_id, "User data deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_parse_or_default() {
        assert_eq!(
            TimeRange::parse_or_default(Some("short_term")),
            TimeRange::ShortTerm
        );
        assert_eq!(
            TimeRange::parse_or_default(Some("long_term")),
            TimeRange::LongTerm
        );
        assert_eq!(
            TimeRange::parse_or_default(Some("forever")),
            TimeRange::MediumTerm
        );
        assert_eq!(TimeRange::parse_or_default(None), TimeRange::MediumTerm);
    }

    #[test]
    fn test_playback_with_episode_item_parses() {
        let playback: SpotifyPlayback = serde_json::from_str(
            r#"{"is_playing":true,"progress_ms":1000,"item":{"type":"episode","show":{}}}"#,
        )
        .unwrap();
        assert!(playback.is_playing);
        assert!(playback.item.is_none());
    }

    #[test]
    fn test_track_with_null_id_parses() {
        let track: SpotifyTrack = serde_json::from_str(
            r#"{"id":null,"name":"Local","artists":[{"name":"Me"}],"album":{"name":"Tape","images":[]},"duration_ms":1}"#,
        )
        .unwrap();
        assert!(track.id.is_none());
        assert_eq!(track.artists[0].name, "Me");
    }
}
