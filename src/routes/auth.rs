// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify OAuth authentication routes.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::middleware::auth::{cookies_secure, end_session, establish_session};
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

const CALLBACK_PATH: &str = "/auth/spotify/callback";
const NONCE_COOKIE: &str = "rhythmics_oauth_nonce";
/// How long a login attempt may take between redirect and callback.
const STATE_MAX_AGE_MS: u128 = 10 * 60 * 1000;
const NONCE_BYTES: usize = 16;

/// Scopes requested from Spotify.
pub const SPOTIFY_SCOPES: &str = "user-read-private user-read-email user-top-read \
     user-read-recently-played user-read-currently-playing playlist-read-private";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/spotify/login", get(auth_start))
        .route(CALLBACK_PATH, get(auth_callback))
        .route("/auth/logout", post(logout))
}

fn now_millis() -> Result<u128> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis())
}

fn nonce_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((NONCE_COOKIE, value))
        .path(CALLBACK_PATH)
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(10))
        .build()
}

/// Start OAuth flow - redirect to Spotify authorization.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect)> {
    let mut nonce = [0u8; NONCE_BYTES];
    SystemRandom::new()
        .fill(&mut nonce)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Random nonce generation failed")))?;
    let nonce = hex::encode(nonce);

    let oauth_state = sign_state(&nonce, now_millis()?, &state.config.oauth_state_key)?;

    let auth_url = format!(
        "{}/authorize?\
         response_type=code&\
         client_id={}&\
         scope={}&\
         redirect_uri={}&\
         state={}",
        state.config.spotify_accounts_url,
        urlencoding::encode(&state.config.spotify_client_id),
        urlencoding::encode(SPOTIFY_SCOPES),
        urlencoding::encode(&state.config.spotify_redirect_uri),
        oauth_state
    );

    tracing::info!(
        client_id = %state.config.spotify_client_id,
        "Starting OAuth flow, redirecting to Spotify"
    );

    let jar = jar.add(nonce_cookie(nonce, cookies_secure(&state.config)));
    Ok((jar, Redirect::temporary(&auth_url)))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code for tokens, create session.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect)> {
    let frontend_url = &state.config.frontend_url;
    let secure = cookies_secure(&state.config);

    // The nonce cookie is single-use whatever the outcome.
    let cookie_nonce = jar.get(NONCE_COOKIE).map(|c| c.value().to_string());
    let jar = jar.remove(nonce_cookie(String::new(), secure));

    // User denied access, or Spotify reported a problem
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Spotify");
        let redirect = format!("{}?error={}", frontend_url, urlencoding::encode(&error));
        return Ok((jar, Redirect::temporary(&redirect)));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Authorization code not provided".to_string()))?;

    let now = now_millis()?;
    let state_nonce = params
        .state
        .as_deref()
        .and_then(|s| verify_state(s, &state.config.oauth_state_key, now))
        .ok_or_else(|| {
            tracing::warn!("Invalid, expired or tampered OAuth state parameter");
            AppError::BadRequest("Invalid OAuth state".to_string())
        })?;

    // The state must belong to the browser that started the login.
    let bound = cookie_nonce
        .map(|c| bool::from(c.as_bytes().ct_eq(state_nonce.as_bytes())))
        .unwrap_or(false);
    if !bound {
        tracing::warn!("OAuth state not bound to this browser");
        return Err(AppError::BadRequest("Invalid OAuth state".to_string()));
    }

    tracing::info!("Exchanging authorization code for tokens");

    let user = state.spotify_service.handle_oauth_callback(&code).await?;

    let jar = establish_session(jar, &user, &state.config)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Session creation failed: {}", e)))?;

    tracing::info!(user_id = %user.id, "OAuth successful, session established");

    let redirect_url = format!("{}/dashboard", frontend_url);
    Ok((jar, Redirect::temporary(&redirect_url)))
}

/// Logout - clear the session cookie. Tokens stay stored for the next login.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, StatusCode) {
    (end_session(jar, &state.config), StatusCode::NO_CONTENT)
}

/// Build the signed `state` parameter: base64("nonce|timestamp_hex|signature_hex").
pub fn sign_state(nonce: &str, timestamp_ms: u128, secret: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}", nonce, timestamp_ms);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Verify signature and age of a `state` parameter, returning its nonce.
pub fn verify_state(state: &str, secret: &[u8], now_ms: u128) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    let [nonce, timestamp_hex, signature_hex] = parts.as_slice() else {
        return None;
    };

    let payload = format!("{}|{}", nonce, timestamp_hex);
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if !bool::from(expected.as_bytes().ct_eq(signature_hex.as_bytes())) {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    let issued = u128::from_str_radix(timestamp_hex, 16).ok()?;
    if issued > now_ms || now_ms - issued > STATE_MAX_AGE_MS {
        return None;
    }

    Some(nonce.to_string())
}
