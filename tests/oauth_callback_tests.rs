// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth login flow tests.
//!
//! Drives `/auth/spotify/login` and `/auth/spotify/callback` through the
//! router with Spotify replaced by a mock server.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use rhythmics::db::{CredentialStore, IdentityStore};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header as header_is, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{config_for_mock, create_test_app, create_test_app_with_config};

fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

fn cookie_value(headers: &[String], name: &str) -> Option<String> {
    headers.iter().find_map(|value| {
        let rest = value.strip_prefix(&format!("{name}="))?;
        Some(rest.split(';').next().unwrap_or_default().to_string())
    })
}

fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect location")
        .to_str()
        .unwrap()
        .to_string()
}

/// Hit the login route and return (state, nonce cookie value).
async fn start_login(app: &axum::Router) -> (String, String) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/auth/spotify/login")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let url = location(&response);
    let state = url
        .split("state=")
        .nth(1)
        .expect("state in authorize URL")
        .split('&')
        .next()
        .unwrap()
        .to_string();
    let nonce = cookie_value(&set_cookie_headers(&response), "rhythmics_oauth_nonce")
        .expect("nonce cookie");
    (state, nonce)
}

async fn mount_spotify(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(header_is(
            "authorization",
            "Basic dGVzdF9jbGllbnRfaWQ6dGVzdF9zZWNyZXQ=",
        ))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=abc123"))
        .and(body_string_contains("redirect_uri="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A1",
            "token_type": "Bearer",
            "refresh_token": "R1",
            "expires_in": 3600,
            "scope": "user-top-read"
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/me"))
        .and(header_is("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user_42",
            "display_name": "Test User",
            "followers": { "href": null, "total": 3 },
            "images": []
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_redirects_to_spotify_authorize() {
    let (app, state, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/spotify/login")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let url = location(&response);
    assert!(url.starts_with(&format!(
        "{}/authorize?",
        state.config.spotify_accounts_url
    )));
    assert!(url.contains("response_type=code"));
    assert!(url.contains("client_id=test_client_id"));
    assert!(url.contains("user-top-read"));
    assert!(url.contains("state="));

    let cookies = set_cookie_headers(&response);
    let nonce = cookies
        .iter()
        .find(|c| c.starts_with("rhythmics_oauth_nonce="))
        .expect("nonce cookie");
    assert!(nonce.contains("HttpOnly"));
    assert!(nonce.contains("Path=/auth/spotify/callback"));
}

#[tokio::test]
async fn test_callback_creates_user_and_tokens() {
    let server = MockServer::start().await;
    mount_spotify(&server).await;
    let (app, state, db) = create_test_app_with_config(config_for_mock(&server.uri()));

    let (oauth_state, nonce) = start_login(&app).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/auth/spotify/callback?code=abc123&state={}",
                    oauth_state
                ))
                .header(header::COOKIE, format!("rhythmics_oauth_nonce={}", nonce))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response),
        format!("{}/dashboard", state.config.frontend_url)
    );
    assert!(cookie_value(&set_cookie_headers(&response), "rhythmics_session").is_some());

    assert_eq!(db.user_count(), 1);
    assert_eq!(db.token_count(), 1);

    let user = db
        .find_by_spotify_id("user_42")
        .await
        .unwrap()
        .expect("user bound");
    let record = db.load(&user.id).await.unwrap().expect("tokens stored");
    assert_eq!(record.access_token, "A1");
    assert_eq!(record.refresh_token, "R1");
    assert_eq!(record.spotify_id, "user_42");
}

#[tokio::test]
async fn test_callback_missing_code_is_bad_request() {
    let (app, _, db) = create_test_app();
    let (oauth_state, nonce) = start_login(&app).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/auth/spotify/callback?state={}", oauth_state))
                .header(header::COOKIE, format!("rhythmics_oauth_nonce={}", nonce))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(db.user_count(), 0);
}

#[tokio::test]
async fn test_callback_rejects_state_from_other_browser() {
    let (app, _, db) = create_test_app();
    let (oauth_state, _) = start_login(&app).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/auth/spotify/callback?code=abc123&state={}",
                    oauth_state
                ))
                .header(header::COOKIE, "rhythmics_oauth_nonce=someone-else")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(db.user_count(), 0);
}

#[tokio::test]
async fn test_callback_rejects_tampered_state() {
    let (app, _, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/spotify/callback?code=abc123&state=bm9uY2V8MXxiYWQ")
                .header(header::COOKIE, "rhythmics_oauth_nonce=nonce")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_callback_provider_error_redirects_to_frontend() {
    let (app, state, db) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/spotify/callback?error=access_denied")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response),
        format!("{}?error=access_denied", state.config.frontend_url)
    );
    assert_eq!(db.user_count(), 0);
}

#[tokio::test]
async fn test_callback_rejected_code_stores_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid authorization code"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let (app, _, db) = create_test_app_with_config(config_for_mock(&server.uri()));
    let (oauth_state, nonce) = start_login(&app).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/auth/spotify/callback?code=stale&state={}",
                    oauth_state
                ))
                .header(header::COOKIE, format!("rhythmics_oauth_nonce={}", nonce))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(db.user_count(), 0);
    assert_eq!(db.token_count(), 0);
}

#[tokio::test]
async fn test_callback_grant_without_refresh_token_stores_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "A1",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user_42",
            "display_name": "Test User",
            "images": []
        })))
        .expect(0)
        .mount(&server)
        .await;
    let (app, _, db) = create_test_app_with_config(config_for_mock(&server.uri()));
    let (oauth_state, nonce) = start_login(&app).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/auth/spotify/callback?code=abc123&state={}",
                    oauth_state
                ))
                .header(header::COOKIE, format!("rhythmics_oauth_nonce={}", nonce))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(db.user_count(), 0);
    assert_eq!(db.token_count(), 0);
    assert!(db.find_by_spotify_id("user_42").await.unwrap().is_none());
}
