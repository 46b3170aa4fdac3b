// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reshape Spotify objects into the trimmed forms the browser uses.

use crate::models::{
    AlbumSummary, ArtistName, ArtistSummary, CurrentlyPlayingResponse, GenreChart, GenreDataset,
    PlayingTrack, ProfileResponse, RecentTrack, TrackSummary,
};
use crate::services::spotify::{
    PlayHistoryItem, SimpleAlbum, SimpleArtist, SpotifyArtist, SpotifyImage, SpotifyPlayback,
    SpotifyProfile, SpotifyTrack,
};
use std::collections::HashMap;

/// Chart colors, assigned to genres in rank order.
pub const GENRE_PALETTE: [&str; 12] = [
    "#1DB954", "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FECA57", "#FF9FF3", "#54A0FF",
    "#5F27CD", "#FF9F43", "#00D2D3", "#C44569",
];

fn first_image(images: &[SpotifyImage]) -> Option<String> {
    images.first().map(|i| i.url.clone())
}

fn artist_names(artists: Vec<SimpleArtist>) -> Vec<ArtistName> {
    artists
        .into_iter()
        .map(|a| ArtistName { name: a.name })
        .collect()
}

fn album(album: SimpleAlbum) -> AlbumSummary {
    AlbumSummary {
        image_url: first_image(&album.images),
        name: album.name,
    }
}

pub fn profile(p: SpotifyProfile) -> ProfileResponse {
    ProfileResponse {
        image_url: first_image(&p.images),
        id: p.id,
        display_name: p.display_name,
        email: p.email,
        country: p.country,
        product: p.product,
        followers: p.followers.total,
        spotify_url: p.external_urls.spotify,
    }
}

/// Trim artists, numbering them from 1 in Spotify's order.
pub fn rank_artists(artists: Vec<SpotifyArtist>) -> Vec<ArtistSummary> {
    artists
        .into_iter()
        .zip(1..)
        .map(|(a, rank)| ArtistSummary {
            image_url: first_image(&a.images),
            id: a.id,
            name: a.name,
            popularity: a.popularity,
            genres: a.genres,
            spotify_url: a.external_urls.spotify,
            followers: a.followers.total,
            rank,
        })
        .collect()
}

pub fn rank_tracks(tracks: Vec<SpotifyTrack>) -> Vec<TrackSummary> {
    tracks
        .into_iter()
        .zip(1..)
        .map(|(t, rank)| TrackSummary {
            id: t.id.unwrap_or_default(),
            name: t.name,
            artists: artist_names(t.artists),
            album: album(t.album),
            duration_ms: t.duration_ms,
            popularity: t.popularity,
            spotify_url: t.external_urls.spotify,
            rank,
        })
        .collect()
}

pub fn recent_tracks(items: Vec<PlayHistoryItem>) -> Vec<RecentTrack> {
    items
        .into_iter()
        .map(|item| {
            let t = item.track;
            RecentTrack {
                id: t.id.unwrap_or_default(),
                name: t.name,
                artists: artist_names(t.artists),
                album: album(t.album),
                duration_ms: t.duration_ms,
                played_at: item.played_at,
                spotify_url: t.external_urls.spotify,
                popularity: t.popularity,
            }
        })
        .collect()
}

pub fn now_playing(playback: Option<SpotifyPlayback>) -> CurrentlyPlayingResponse {
    let Some(playback) = playback else {
        return CurrentlyPlayingResponse {
            is_playing: false,
            track: None,
        };
    };

    let progress_ms = playback.progress_ms;
    CurrentlyPlayingResponse {
        is_playing: playback.is_playing,
        track: playback.item.map(|t| PlayingTrack {
            id: t.id.unwrap_or_default(),
            name: t.name,
            artists: artist_names(t.artists),
            album: album(t.album),
            duration_ms: t.duration_ms,
            progress_ms,
            spotify_url: t.external_urls.spotify,
        }),
    }
}

/// Count how many artists carry each genre.
///
/// Sorted by count descending, ties broken alphabetically so the output is
/// stable across calls.
pub fn tally_genres(artists: &[SpotifyArtist]) -> Vec<(String, u32)> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for artist in artists {
        for genre in &artist.genres {
            *counts.entry(genre.as_str()).or_insert(0) += 1;
        }
    }

    let mut tally: Vec<(String, u32)> = counts
        .into_iter()
        .map(|(genre, count)| (genre.to_string(), count))
        .collect();
    tally.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    tally
}

/// Chart payload of the `top_n` most frequent genres.
pub fn genre_chart(artists: &[SpotifyArtist], top_n: usize) -> GenreChart {
    let tally = tally_genres(artists);
    let total_genres = u32::try_from(tally.len()).unwrap_or(u32::MAX);

    let (labels, data): (Vec<String>, Vec<u32>) = tally.into_iter().take(top_n).unzip();
    let background_color = GENRE_PALETTE
        .iter()
        .cycle()
        .take(labels.len())
        .map(|c| c.to_string())
        .collect();

    GenreChart {
        labels,
        datasets: vec![GenreDataset {
            data,
            background_color,
        }],
        total_genres,
    }
}
