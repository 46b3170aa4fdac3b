// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify accounts service client: the two OAuth token grants.
//!
//! Both grants are a single form-encoded POST to `/api/token` with HTTP
//! Basic client authentication. Neither is retried here: authorization
//! codes are single-use, and whether to retry a refresh is the caller's
//! call.

use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use std::time::Duration;

/// Token set returned by either grant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Always present for the authorization-code grant; optional on refresh.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds from issuance
    pub expires_in: u64,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Client for the Spotify token endpoint.
#[derive(Clone)]
pub struct AccountsClient {
    http: reqwest::Client,
    accounts_url: String,
    basic_auth: String,
}

impl AccountsClient {
    /// Create a client; `accounts_url` is the accounts service base URL.
    pub fn new(
        accounts_url: &str,
        client_id: &str,
        client_secret: &str,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            accounts_url: accounts_url.trim_end_matches('/').to_string(),
            basic_auth: BASE64.encode(format!("{}:{}", client_id, client_secret)),
        })
    }

    /// Exchange a one-time authorization code for a token set.
    ///
    /// A code grant without a refresh token is useless to us, so it is
    /// rejected here before the caller writes anything.
    pub async fn exchange_authorization_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenGrant, AppError> {
        let grant = self
            .post_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .await?;

        if grant.refresh_token.as_deref().map_or(true, str::is_empty) {
            tracing::error!("Authorization code grant returned no refresh_token");
            return Err(AppError::UpstreamAuth {
                status: 200,
                body: "missing refresh_token".to_string(),
            });
        }
        Ok(grant)
    }

    /// Mint a new access token from a refresh token.
    pub async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, AppError> {
        self.post_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn post_token(&self, form: &[(&str, &str)]) -> Result<TokenGrant, AppError> {
        let response = self
            .http
            .post(format!("{}/api/token", self.accounts_url))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Basic {}", self.basic_auth),
            )
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::SpotifyUnavailable(format!("Token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::SpotifyUnavailable(format!("Token response read failed: {}", e)))?;

        if !status.is_success() {
            return Err(AppError::UpstreamAuth {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "Unparseable token response");
            AppError::UpstreamAuth {
                status: status.as_u16(),
                body: format!("JSON parse error: {}", e),
            }
        })
    }
}
