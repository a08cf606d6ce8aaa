// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Builds a [`MusicSnapshot`] from a user's Spotify listening history.
//!
//! Steps, per request:
//! 1. Load the stored token, refreshing (and persisting) it if expired
//! 2. Fetch top artists and top tracks (concurrently; either failing is fatal)
//! 3. Fetch audio features (failure degrades to default values)
//! 4. Rank genres and average features
//! 5. Sample recommendations from a search on the top genre

use crate::db::Database;
use crate::error::AppError;
use crate::models::{
    rank_genres, ArtistSummary, AudioFeatures, FeatureRecord, MusicSnapshot, Recommendation,
    TokenRecord, TrackSummary,
};
use crate::services::session::persist_tokens;
use crate::services::spotify::{SpotifyClient, SpotifyTrack};
use crate::time_utils::parse_utc_rfc3339;
use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;

pub const TOP_ARTIST_LIMIT: u32 = 5;
pub const TOP_TRACK_LIMIT: u32 = 10;
pub const SEARCH_LIMIT: u32 = 50;
pub const RECOMMENDATION_COUNT: usize = 3;

/// Return a usable access token for the user, refreshing it if expired.
///
/// The refreshed token is persisted before it is returned. A failed write is
/// logged and the fresh token is still used for this request. A lifetime
/// that cannot be stored fails the refresh.
pub async fn valid_access_token(
    client: &SpotifyClient,
    db: &Database,
    user_id: &str,
) -> Result<String, AppError> {
    let record = db.get_tokens(user_id).await?.ok_or(AppError::NoToken)?;

    if !is_expired(&record, Utc::now()) {
        return Ok(record.access_token);
    }

    tracing::info!(user_id, "Access token expired, refreshing");
    let refreshed = client.refresh_token(&record.refresh_token).await?;

    // Spotify does not always rotate the refresh token.
    let refresh_token = refreshed
        .refresh_token
        .as_deref()
        .unwrap_or(&record.refresh_token);

    match persist_tokens(
        db,
        user_id,
        &refreshed.access_token,
        refresh_token,
        refreshed.expires_in,
    )
    .await
    {
        Ok(_) => tracing::info!(user_id, "Token refreshed and stored"),
        Err(AppError::TokenLifetime(secs)) => {
            return Err(AppError::TokenRefresh(format!(
                "Refreshed token lifetime out of range: {}s",
                secs
            )));
        }
        Err(e) => {
            tracing::warn!(error = %e, user_id, "Failed to store refreshed token, continuing");
        }
    }

    Ok(refreshed.access_token)
}

/// Whether the access token is expired at `now`.
///
/// An unparseable expiry is treated as expired.
pub fn is_expired(record: &TokenRecord, now: DateTime<Utc>) -> bool {
    match parse_utc_rfc3339(&record.expires_at) {
        Some(expires_at) => now >= expires_at,
        None => {
            tracing::warn!(user_id = %record.user_id, expires_at = %record.expires_at, "Unparseable token expiry");
            true
        }
    }
}

/// Build the listening snapshot for a user.
pub async fn build_snapshot(
    client: &SpotifyClient,
    db: &Database,
    user_id: &str,
) -> Result<MusicSnapshot, AppError> {
    let access_token = valid_access_token(client, db, user_id).await?;
    let token = access_token.as_str();

    let (artists, tracks) = tokio::try_join!(
        client.get_top_artists(token, TOP_ARTIST_LIMIT),
        client.get_top_tracks(token, TOP_TRACK_LIMIT),
    )?;

    tracing::debug!(
        user_id,
        artists = artists.len(),
        tracks = tracks.len(),
        "Fetched top items"
    );

    if tracks.is_empty() {
        return Err(AppError::NoTracks);
    }

    let track_ids: Vec<&str> = tracks.iter().map(|t| t.id.as_str()).collect();
    let features = match client.get_audio_features(token, &track_ids).await {
        Ok(features) => features,
        Err(e) => {
            tracing::warn!(error = %e, user_id, "Audio features unavailable, using defaults");
            default_features(tracks.len())
        }
    };
    let audio_features = AudioFeatures::average(&features).unwrap_or(AudioFeatures::DEFAULT);

    let genres = rank_genres(artists.iter().map(|a| &a.genres));

    let recommendations = match genres.first() {
        Some(top) => match client
            .search_tracks_by_genre(token, &top.name, SEARCH_LIMIT)
            .await
        {
            Ok(found) => {
                let mut rng = rand::rng();
                sample_recommendations(&found, &mut rng)
            }
            Err(e) => {
                tracing::warn!(error = %e, genre = %top.name, "Genre search failed");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    tracing::info!(
        user_id,
        genres = genres.len(),
        recommendations = recommendations.len(),
        "Snapshot built"
    );

    Ok(MusicSnapshot {
        top_artists: artists
            .iter()
            .map(|a| ArtistSummary {
                name: a.name.clone(),
                image: a.image(),
                genres: a.genres.clone(),
            })
            .collect(),
        top_tracks: tracks
            .iter()
            .map(|t| TrackSummary {
                name: t.name.clone(),
                artist: t.artist(),
                album: t.album_name(),
                image: t.image(),
            })
            .collect(),
        genres,
        audio_features,
        recommendations,
    })
}

fn default_features(count: usize) -> Vec<Option<FeatureRecord>> {
    vec![Some(FeatureRecord::from(AudioFeatures::DEFAULT)); count]
}

/// Pick up to [`RECOMMENDATION_COUNT`] tracks uniformly without replacement.
pub fn sample_recommendations<R: Rng + ?Sized>(
    tracks: &[SpotifyTrack],
    rng: &mut R,
) -> Vec<Recommendation> {
    tracks
        .choose_multiple(rng, RECOMMENDATION_COUNT)
        .map(|t| Recommendation {
            name: t.name.clone(),
            artist: t.artist(),
            image: t.image(),
            uri: t.uri.clone(),
        })
        .collect()
}
