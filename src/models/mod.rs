// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod music;
pub mod user;

pub use music::{
    AlbumSummary, ArtistName, ArtistSummary, CurrentlyPlayingResponse, GenreChart, GenreDataset,
    ItemsResponse, PlayingTrack, ProfileResponse, RecentTrack, TrackSummary,
};
pub use user::{TokenRecord, UserIdentity};
