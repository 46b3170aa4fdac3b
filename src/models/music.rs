//! Trimmed music data returned to the browser.
//!
//! These are the reshaped forms of Spotify Web API objects; the raw upstream
//! shapes live in `services::spotify`.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Wrapper for list endpoints, matching Spotify's `items` convention.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/app/generated/")
)]
pub struct ItemsResponse<T> {
    pub items: Vec<T>,
}

/// Current user's Spotify profile.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/app/generated/")
)]
pub struct ProfileResponse {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub product: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub followers: u64,
    pub image_url: Option<String>,
    pub spotify_url: Option<String>,
}

/// One of the user's top artists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/app/generated/")
)]
pub struct ArtistSummary {
    pub id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub popularity: u32,
    pub genres: Vec<String>,
    pub spotify_url: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub followers: u64,
    /// 1-based position in the ranking
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/app/generated/")
)]
pub struct ArtistName {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/app/generated/")
)]
pub struct AlbumSummary {
    pub name: String,
    pub image_url: Option<String>,
}

/// One of the user's top tracks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/app/generated/")
)]
pub struct TrackSummary {
    pub id: String,
    pub name: String,
    pub artists: Vec<ArtistName>,
    pub album: AlbumSummary,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub duration_ms: u64,
    pub popularity: u32,
    pub spotify_url: Option<String>,
    pub rank: u32,
}

/// A play-history entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/app/generated/")
)]
pub struct RecentTrack {
    pub id: String,
    pub name: String,
    pub artists: Vec<ArtistName>,
    pub album: AlbumSummary,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub duration_ms: u64,
    /// ISO 8601, as reported by Spotify
    pub played_at: String,
    pub spotify_url: Option<String>,
    pub popularity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/app/generated/")
)]
pub struct PlayingTrack {
    pub id: String,
    pub name: String,
    pub artists: Vec<ArtistName>,
    pub album: AlbumSummary,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub duration_ms: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub progress_ms: Option<u64>,
    pub spotify_url: Option<String>,
}

/// Playback state. `track` is null when nothing is playing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/app/generated/")
)]
pub struct CurrentlyPlayingResponse {
    pub is_playing: bool,
    pub track: Option<PlayingTrack>,
}

/// Genre frequencies shaped for a pie chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/app/generated/")
)]
pub struct GenreChart {
    pub labels: Vec<String>,
    pub datasets: Vec<GenreDataset>,
    /// Distinct genres seen, including those not charted
    pub total_genres: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/app/generated/")
)]
pub struct GenreDataset {
    pub data: Vec<u32>,
    #[serde(rename = "backgroundColor")]
    pub background_color: Vec<String>,
}
