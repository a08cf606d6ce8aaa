// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify API client.
//!
//! Handles:
//! - Authorization URL construction and code exchange
//! - Access token refresh
//! - Profile, top items, audio features and search reads

use crate::config::{Config, ConfigError};
use crate::error::AppError;
use crate::models::{ExternalIdentity, FeatureRecord};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;

/// Scopes requested at login.
pub const SCOPES: [&str; 4] = [
    "user-read-email",
    "user-top-read",
    "user-read-recently-played",
    "user-read-playback-state",
];

/// Aggregation window for top items.
const TIME_RANGE: &str = "medium_term";

/// Spotify API client.
#[derive(Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    accounts_url: String,
    api_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl SpotifyClient {
    /// Create a client from application config.
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            accounts_url: config.spotify_accounts_url.clone(),
            api_url: config.spotify_api_url.clone(),
            client_id: config.spotify_client_id.clone(),
            client_secret: config.spotify_client_secret.clone(),
            redirect_uri: config.oauth_redirect_uri(),
        }
    }

    // ─── OAuth ───────────────────────────────────────────────────

    /// Build the authorization URL the browser is sent to.
    ///
    /// `show_dialog=true` forces Spotify to ask for consent every time.
    pub fn authorize_url(&self) -> Result<String, ConfigError> {
        if self.client_id.is_empty() {
            return Err(ConfigError::Missing("SPOTIFY_CLIENT_ID"));
        }

        Ok(format!(
            "{}/authorize?\
             client_id={}&\
             response_type=code&\
             redirect_uri={}&\
             scope={}&\
             show_dialog=true",
            self.accounts_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&SCOPES.join(" ")),
        ))
    }

    /// Exchange an authorization code for an access/refresh token pair.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        let response = self
            .token_request(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .await
            .map_err(|e| AppError::TokenExchange(format!("Token exchange request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Spotify token exchange failed");
            return Err(AppError::TokenExchange(format!(
                "Token exchange failed with status {}",
                status
            )));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::TokenExchange(format!("Failed to parse token response: {}", e)))?;
        tokens.check_lifetime().map_err(AppError::TokenExchange)
    }

    /// Refresh an expired access token.
    ///
    /// Spotify may or may not rotate the refresh token; see
    /// [`TokenResponse::refresh_token`].
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AppError> {
        let response = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await
            .map_err(|e| AppError::TokenRefresh(format!("Token refresh request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Spotify token refresh failed");
            return Err(AppError::TokenRefresh(format!(
                "Token refresh failed with status {}",
                status
            )));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::TokenRefresh(format!("Failed to parse refresh response: {}", e)))?;
        tokens.check_lifetime().map_err(AppError::TokenRefresh)
    }

    /// POST to the token endpoint with Basic client credentials.
    async fn token_request(
        &self,
        form: &[(&str, &str)],
    ) -> Result<reqwest::Response, reqwest::Error> {
        let credentials = BASE64.encode(format!("{}:{}", self.client_id, self.client_secret));

        self.http
            .post(format!("{}/api/token", self.accounts_url))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Basic {}", credentials),
            )
            .form(form)
            .send()
            .await
    }

    // ─── Web API ─────────────────────────────────────────────────

    /// Get the authenticated user's profile.
    pub async fn get_profile(&self, access_token: &str) -> Result<ExternalIdentity, AppError> {
        let url = format!("{}/me", self.api_url);
        let profile: SpotifyProfile = self.get_json(&url, access_token, &[], "profile").await?;

        let email = profile
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| AppError::UserLookup("Spotify profile has no email".to_string()))?;

        Ok(ExternalIdentity {
            external_id: profile.id,
            email,
            display_name: profile.display_name,
        })
    }

    /// Get the user's top artists over the medium-term window.
    pub async fn get_top_artists(
        &self,
        access_token: &str,
        limit: u32,
    ) -> Result<Vec<SpotifyArtist>, AppError> {
        let url = format!("{}/me/top/artists", self.api_url);
        let page: Paging<SpotifyArtist> = self
            .get_json(
                &url,
                access_token,
                &[("limit", limit.to_string()), ("time_range", TIME_RANGE.to_string())],
                "top artists",
            )
            .await?;
        Ok(page.items)
    }

    /// Get the user's top tracks over the medium-term window.
    pub async fn get_top_tracks(
        &self,
        access_token: &str,
        limit: u32,
    ) -> Result<Vec<SpotifyTrack>, AppError> {
        let url = format!("{}/me/top/tracks", self.api_url);
        let page: Paging<SpotifyTrack> = self
            .get_json(
                &url,
                access_token,
                &[("limit", limit.to_string()), ("time_range", TIME_RANGE.to_string())],
                "top tracks",
            )
            .await?;
        Ok(page.items)
    }

    /// Get audio features for the given track IDs.
    ///
    /// Entries are `None` where Spotify has no features for a track.
    pub async fn get_audio_features(
        &self,
        access_token: &str,
        track_ids: &[&str],
    ) -> Result<Vec<Option<FeatureRecord>>, AppError> {
        let url = format!("{}/audio-features", self.api_url);
        let response: AudioFeaturesResponse = self
            .get_json(
                &url,
                access_token,
                &[("ids", track_ids.join(","))],
                "audio features",
            )
            .await?;
        Ok(response.audio_features)
    }

    /// Search tracks tagged with a genre.
    pub async fn search_tracks_by_genre(
        &self,
        access_token: &str,
        genre: &str,
        limit: u32,
    ) -> Result<Vec<SpotifyTrack>, AppError> {
        let url = format!("{}/search", self.api_url);
        let response: SearchResponse = self
            .get_json(
                &url,
                access_token,
                &[
                    ("q", format!("genre:\"{}\"", genre)),
                    ("type", "track".to_string()),
                    ("limit", limit.to_string()),
                ],
                "genre search",
            )
            .await?;
        Ok(response.tracks.map(|t| t.items).unwrap_or_default())
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                AppError::upstream(
                    reqwest::StatusCode::BAD_GATEWAY,
                    format!("Failed to fetch {} from Spotify: {}", what, e),
                )
            })?;

        self.check_response_json(response, what).await
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
        what: &str,
    ) -> Result<T, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, what, "Spotify request failed");
            return Err(AppError::upstream(
                status,
                format!("Failed to fetch {} from Spotify", what),
            ));
        }

        response.json().await.map_err(|e| {
            AppError::upstream(
                reqwest::StatusCode::BAD_GATEWAY,
                format!("Failed to parse {} response: {}", what, e),
            )
        })
    }
}

/// Token endpoint response (code exchange or refresh).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Absent on refresh when Spotify does not rotate the refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    pub expires_in: i64,
}

impl TokenResponse {
    /// Reject tokens that are already expired on arrival.
    fn check_lifetime(self) -> Result<Self, String> {
        if self.expires_in <= 0 {
            return Err(format!("Token response has expires_in {}", self.expires_in));
        }
        Ok(self)
    }
}

#[derive(Debug, Deserialize)]
struct SpotifyProfile {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Paging<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct AudioFeaturesResponse {
    #[serde(default)]
    audio_features: Vec<Option<FeatureRecord>>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    tracks: Option<Paging<SpotifyTrack>>,
}

/// Image attached to an artist or album (largest first).
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
}

/// Artist object from top-items responses.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
}

impl SpotifyArtist {
    pub fn image(&self) -> Option<String> {
        self.images.first().map(|i| i.url.clone())
    }
}

/// Simplified artist nested in a track.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtistRef {
    pub name: String,
}

/// Album nested in a track.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbum {
    pub name: String,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
}

/// Track object from top-items and search responses.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub artists: Vec<SpotifyArtistRef>,
    #[serde(default)]
    pub album: Option<SpotifyAlbum>,
}

impl SpotifyTrack {
    /// Name of the first credited artist.
    pub fn artist(&self) -> Option<String> {
        self.artists.first().map(|a| a.name.clone())
    }

    pub fn album_name(&self) -> Option<String> {
        self.album.as_ref().map(|a| a.name.clone())
    }

    pub fn image(&self) -> Option<String> {
        self.album
            .as_ref()
            .and_then(|a| a.images.first())
            .map(|i| i.url.clone())
    }
}
