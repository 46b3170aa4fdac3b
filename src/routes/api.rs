// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::Result;
use crate::middleware::auth::{end_session, AuthUser};
use crate::models::{
    ArtistSummary, CurrentlyPlayingResponse, GenreChart, ItemsResponse, ProfileResponse,
    RecentTrack, TrackSummary,
};
use crate::services::TimeRange;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{delete, get},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 50;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/top-tracks", get(get_top_tracks))
        .route("/api/top-artists", get(get_top_artists))
        .route("/api/top-genres", get(get_top_genres))
        .route("/api/recently-played", get(get_recently_played))
        .route("/api/currently-playing", get(get_currently_playing))
        .route("/api/account", delete(delete_account))
}

// ─── Query Parsing ───────────────────────────────────────────

/// Raw query parameters. Kept as strings so a malformed value falls back to
/// the default instead of rejecting the request.
#[derive(Deserialize, Default)]
struct TopItemsQuery {
    time_range: Option<String>,
    limit: Option<String>,
}

#[derive(Deserialize, Default)]
struct LimitQuery {
    limit: Option<String>,
}

/// Parse `limit`, keeping it within Spotify's 1..=50 window.
fn parse_limit(raw: Option<&str>) -> u32 {
    match raw.and_then(|s| s.trim().parse::<i64>().ok()) {
        Some(n) if n < 1 => 1,
        Some(n) if n > i64::from(MAX_LIMIT) => MAX_LIMIT,
        Some(n) => n as u32,
        None => DEFAULT_LIMIT,
    }
}

// ─── User Profile ────────────────────────────────────────────

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let profile = state.spotify_service.profile(&user.user_id).await?;
    Ok(Json(profile))
}

// ─── Top Items ───────────────────────────────────────────────

async fn get_top_tracks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<TopItemsQuery>,
) -> Result<Json<ItemsResponse<TrackSummary>>> {
    let time_range = TimeRange::parse_or_default(query.time_range.as_deref());
    let limit = parse_limit(query.limit.as_deref());

    let items = state
        .spotify_service
        .top_tracks(&user.user_id, time_range, limit)
        .await?;
    Ok(Json(ItemsResponse { items }))
}

async fn get_top_artists(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<TopItemsQuery>,
) -> Result<Json<ItemsResponse<ArtistSummary>>> {
    let time_range = TimeRange::parse_or_default(query.time_range.as_deref());
    let limit = parse_limit(query.limit.as_deref());

    let items = state
        .spotify_service
        .top_artists(&user.user_id, time_range, limit)
        .await?;
    Ok(Json(ItemsResponse { items }))
}

/// Genre distribution over the user's top artists, shaped for Chart.js.
async fn get_top_genres(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<TopItemsQuery>,
) -> Result<Json<GenreChart>> {
    let time_range = TimeRange::parse_or_default(query.time_range.as_deref());
    let chart = state
        .spotify_service
        .top_genres(&user.user_id, time_range)
        .await?;
    Ok(Json(chart))
}

// ─── Playback ────────────────────────────────────────────────

async fn get_recently_played(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ItemsResponse<RecentTrack>>> {
    let limit = parse_limit(query.limit.as_deref());
    let items = state
        .spotify_service
        .recently_played(&user.user_id, limit)
        .await?;
    Ok(Json(ItemsResponse { items }))
}

async fn get_currently_playing(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CurrentlyPlayingResponse>> {
    let playing = state
        .spotify_service
        .currently_playing(&user.user_id)
        .await?;
    Ok(Json(playing))
}

// ─── Account Deletion ────────────────────────────────────────

/// Delete the user's binding and stored tokens, then end the session.
async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode)> {
    tracing::info!(user_id = %user.user_id, "User-initiated account deletion");

    state.spotify_service.delete_user_data(&user.user_id).await?;

    Ok((end_session(jar, &state.config), StatusCode::NO_CONTENT))
}
