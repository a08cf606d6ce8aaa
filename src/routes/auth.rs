// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify OAuth authentication routes.
//!
//! Login runs: `/auth/spotify` -> Spotify consent -> `/auth/spotify/callback`
//! -> one-time sign-in link -> `/auth/verify` (session cookie set).

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, removal_cookie, session_cookie};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/spotify", get(auth_start))
        .route("/auth/spotify/url", get(auth_url))
        .route("/auth/spotify/callback", get(auth_callback))
        .route("/auth/verify", get(verify))
        .route("/auth/logout", post(logout))
}

/// 302 Found redirect (`Redirect::to` answers 303).
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

// ─── Login Start ─────────────────────────────────────────────

/// Start OAuth flow - redirect to Spotify authorization.
async fn auth_start(State(state): State<Arc<AppState>>) -> Result<Redirect> {
    let auth_url = state.spotify.authorize_url()?;

    tracing::info!(
        client_id = %state.config.spotify_client_id,
        "Starting OAuth flow, redirecting to Spotify"
    );

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AuthUrlResponse {
    pub auth_url: String,
}

/// Authorization URL as JSON, for frontends that navigate themselves.
async fn auth_url(State(state): State<Arc<AppState>>) -> Result<Json<AuthUrlResponse>> {
    Ok(Json(AuthUrlResponse {
        auth_url: state.spotify.authorize_url()?,
    }))
}

// ─── Callback ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// A failed callback step. Always rendered as a redirect to the frontend
/// with `?error=<tag>`, never as JSON.
#[derive(Debug)]
pub struct CallbackFailure {
    pub tag: String,
    pub source: Option<AppError>,
    frontend_url: String,
}

impl CallbackFailure {
    fn new(frontend_url: &str, tag: &str, source: Option<AppError>) -> Self {
        Self {
            tag: tag.to_string(),
            source,
            frontend_url: frontend_url.to_string(),
        }
    }

    /// Where the browser is sent.
    pub fn location(&self) -> String {
        format!(
            "{}/?error={}",
            self.frontend_url,
            urlencoding::encode(&self.tag)
        )
    }
}

impl IntoResponse for CallbackFailure {
    fn into_response(self) -> Response {
        match &self.source {
            Some(e) => tracing::error!(tag = %self.tag, error = %e, "OAuth callback failed"),
            None => tracing::warn!(tag = %self.tag, "OAuth callback rejected"),
        }
        found(&self.location())
    }
}

/// OAuth callback - exchange code, bind local user, store tokens, and
/// redirect to a one-time sign-in link.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> std::result::Result<Response, CallbackFailure> {
    let frontend_url = state.config.frontend_url.as_str();
    let fail = |tag: &str, source: Option<AppError>| CallbackFailure::new(frontend_url, tag, source);

    if let Some(error) = params.error {
        return Err(fail(error.as_str(), None));
    }
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| fail("no_code", None))?;

    tracing::info!("Exchanging authorization code for tokens");
    let tokens = state
        .spotify
        .exchange_code(&code)
        .await
        .map_err(|e| fail("token_exchange_failed", Some(e)))?;

    // A profile without an email cannot be bound to a user; any other
    // profile failure is unexpected.
    let identity = state
        .spotify
        .get_profile(&tokens.access_token)
        .await
        .map_err(|e| match e {
            AppError::UserLookup(_) => fail("user_lookup_failed", Some(e)),
            _ => fail("callback_failed", Some(e)),
        })?;

    let user = state
        .sessions
        .resolve_or_create_user(&identity)
        .await
        .map_err(|e| {
            let tag = match e {
                AppError::UserLookup(_) => "user_lookup_failed",
                AppError::UserCreation(_) => "user_creation_failed",
                _ => "callback_failed",
            };
            fail(tag, Some(e))
        })?;

    let refresh_token = tokens.refresh_token.unwrap_or_else(|| {
        tracing::warn!(user_id = %user.id, "Code exchange returned no refresh token");
        String::new()
    });
    state
        .sessions
        .persist_tokens(
            &user.id,
            &tokens.access_token,
            &refresh_token,
            tokens.expires_in,
        )
        .await
        .map_err(|e| fail("token_storage_failed", Some(e)))?;

    let link = state
        .sessions
        .issue_sign_in_link(&user.email, &format!("{}/results", frontend_url))
        .map_err(|e| fail("auth_link_failed", Some(e)))?;

    tracing::info!(user_id = %user.id, "OAuth successful, redirecting to sign-in link");
    Ok(found(&link))
}

// ─── Sign-in Link ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyParams {
    #[serde(default)]
    token: Option<String>,
}

/// Consume a sign-in link and start a cookie session.
async fn verify(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<VerifyParams>,
) -> Response {
    let invalid = || found(&format!("{}/?error=auth_link_invalid", state.config.frontend_url));

    let Some(token) = params.token.filter(|t| !t.is_empty()) else {
        return invalid();
    };

    let (user, redirect_to) = match state.sessions.consume_sign_in_link(&token).await {
        Ok(consumed) => consumed,
        Err(e) => {
            tracing::warn!(error = %e, "Sign-in link rejected");
            return invalid();
        }
    };

    let jwt = match create_jwt(&user.id, &state.config.jwt_signing_key) {
        Ok(jwt) => jwt,
        Err(e) => {
            tracing::error!(error = %e, "JWT creation failed");
            return invalid();
        }
    };

    tracing::info!(user_id = %user.id, "Session started");
    let jar = jar.add(session_cookie(jwt, state.config.secure_cookies()));
    (jar, found(&redirect_to)).into_response()
}

/// Logout - expire the session cookie.
///
/// The removal is always sent, even if the request carried no cookie.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    let jar = jar.add(removal_cookie(state.config.secure_cookies()));
    (jar, StatusCode::NO_CONTENT)
}
