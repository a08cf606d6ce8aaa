// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::MusicSnapshot;
use crate::services::aggregator::build_snapshot;
use crate::services::{render_summary, TasteSummary};
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/summary", get(get_summary))
}

// ─── User Profile ────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub external_id: String,
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let profile = state
        .db
        .get_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;

    Ok(Json(UserResponse {
        id: profile.id,
        email: profile.email,
        display_name: profile.metadata.display_name,
        external_id: profile.metadata.external_id,
    }))
}

// ─── Listening Data ──────────────────────────────────────────

/// Get the user's listening snapshot.
async fn get_snapshot(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MusicSnapshot>> {
    let snapshot = build_snapshot(&state.spotify, &state.db, &user.user_id).await?;
    Ok(Json(snapshot))
}

/// Snapshot plus the rendered taste summary.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SummaryResponse {
    pub summary: TasteSummary,
    pub snapshot: MusicSnapshot,
}

/// Get the taste summary for the user's listening snapshot.
async fn get_summary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SummaryResponse>> {
    let snapshot = build_snapshot(&state.spotify, &state.db, &user.user_id).await?;
    let summary = render_summary(&snapshot.audio_features);

    tracing::info!(
        user_id = %user.user_id,
        aesthetic = %summary.aesthetic,
        "Summary rendered"
    );

    Ok(Json(SummaryResponse { summary, snapshot }))
}
