// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and header tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without valid session tokens
//! 2. Protected routes accept the session from a cookie or a Bearer header
//! 3. Security headers and `Cache-Control: no-store` are applied

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app_with_config, get, seed_user, session_cookie};

/// Create a test JWT with an arbitrary audience.
fn create_test_jwt(sub: &str, aud: &str, signing_key: &[u8]) -> String {
    #[derive(Serialize)]
    struct Claims {
        sub: String,
        aud: String,
        exp: usize,
        iat: usize,
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;

    let claims = Claims {
        sub: sub.to_string(),
        aud: aud.to_string(),
        exp: now + 86400,
        iat: now,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .unwrap()
}

fn test_app() -> (axum::Router, std::sync::Arc<judgify::AppState>) {
    create_test_app_with_config(judgify::config::Config::test_default())
}

#[tokio::test]
async fn test_protected_routes_without_token() {
    for uri in ["/api/me", "/api/snapshot", "/api/summary"] {
        let (app, _) = test_app();
        let response = app.oneshot(get(uri, None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Unauthorized");
    }
}

#[tokio::test]
async fn test_protected_route_with_invalid_token() {
    let (app, _) = test_app();

    let response = app
        .oneshot(get("/api/me", Some("judgify_token=not-a-jwt")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_with_session_cookie() {
    let (app, state) = test_app();
    let user = seed_user(&state, "user-1", "ada@example.com").await;
    let cookie = session_cookie(&state, &user.id);

    let response = app.oneshot(get("/api/me", Some(&cookie))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["id"], "user-1");
    assert_eq!(json["email"], "ada@example.com");
    assert_eq!(json["displayName"], "Listener");
    assert_eq!(json["externalId"], "spotify-user");
}

#[tokio::test]
async fn test_me_with_bearer_token() {
    let (app, state) = test_app();
    seed_user(&state, "user-1", "ada@example.com").await;
    let jwt = judgify::middleware::auth::create_jwt("user-1", &state.config.jwt_signing_key)
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", jwt))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_stale_cookie_falls_back_to_bearer() {
    let (app, state) = test_app();
    seed_user(&state, "user-1", "ada@example.com").await;
    let jwt = judgify::middleware::auth::create_jwt("user-1", &state.config.jwt_signing_key)
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(header::COOKIE, "judgify_token=expired-or-garbage")
                .header(header::AUTHORIZATION, format!("Bearer {}", jwt))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["id"], "user-1");
}

#[tokio::test]
async fn test_valid_cookie_wins_over_bearer() {
    let (app, state) = test_app();
    seed_user(&state, "user-1", "ada@example.com").await;
    seed_user(&state, "user-2", "grace@example.com").await;
    let bearer = judgify::middleware::auth::create_jwt("user-2", &state.config.jwt_signing_key)
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(header::COOKIE, session_cookie(&state, "user-1"))
                .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let json = body_json(response).await;
    assert_eq!(json["id"], "user-1");
}

#[tokio::test]
async fn test_sign_in_link_token_is_not_a_session() {
    let (app, state) = test_app();
    seed_user(&state, "user-1", "ada@example.com").await;
    let jwt = create_test_jwt("user-1", "judgify-sign-in", &state.config.jwt_signing_key);

    let response = app
        .oneshot(get("/api/me", Some(&format!("judgify_token={}", jwt))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_key_rejected() {
    let (app, _) = test_app();
    let jwt = create_test_jwt("user-1", "judgify-session", b"wrong_key_wrong_key_wrong_key!!");

    let response = app
        .oneshot(get("/api/me", Some(&format!("judgify_token={}", jwt))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_for_unknown_user_is_not_found() {
    let (app, state) = test_app();
    let cookie = session_cookie(&state, "ghost");

    let response = app.oneshot(get("/api/me", Some(&cookie))).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_snapshot_without_stored_token_is_bad_request() {
    let (app, state) = test_app();
    seed_user(&state, "user-1", "ada@example.com").await;
    let cookie = session_cookie(&state, "user-1");

    let response = app
        .oneshot(get("/api/snapshot", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-store"
    );
    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        "No Spotify token found. Please reconnect your Spotify account."
    );
}

#[tokio::test]
async fn test_security_headers_on_public_route() {
    let (app, _) = test_app();

    let response = app.oneshot(get("/health", None)).await.unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("X-Content-Type-Options").unwrap(), "nosniff");
    assert_eq!(headers.get("X-Frame-Options").unwrap(), "DENY");
    assert!(headers.get("Strict-Transport-Security").is_some());
    assert!(headers.get(header::CACHE_CONTROL).is_none());
}
