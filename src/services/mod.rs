// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod accounts;
pub mod identity;
pub mod insights;
pub mod spotify;
pub mod tokens;

pub use accounts::{AccountsClient, TokenGrant};
pub use identity::IdentityBinder;
pub use spotify::{SpotifyClient, SpotifyService, TimeRange};
pub use tokens::TokenManager;
