// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test helpers: app construction and a fake Spotify server.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use judgify::config::Config;
use judgify::db::{Database, Fault, FirestoreDb};
use judgify::middleware::auth::create_jwt;
use judgify::models::{email_key, EmailIndex, LocalUser, TokenRecord, UserMetadata};
use judgify::routes::create_router;
use judgify::AppState;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

// ─── Fake Spotify ────────────────────────────────────────────

/// One request received by the fake server.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub query: String,
    pub authorization: Option<String>,
    pub body: String,
    /// Access token in storage when the call arrived (if observing a db)
    pub stored_access_token: Option<String>,
}

/// Knobs for the fake server's responses.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Behavior {
    pub token_status: u16,
    /// `expires_in` returned by the code exchange
    pub token_expires_in: i64,
    pub refresh_status: u16,
    pub refresh_expires_in: i64,
    /// Whether a refresh returns a new refresh token
    pub refresh_rotates: bool,
    pub profile_status: u16,
    pub profile_email: Option<String>,
    pub artists_status: u16,
    pub artist_genres: Vec<Vec<String>>,
    pub tracks_status: u16,
    pub track_count: usize,
    pub features_status: u16,
    pub search_status: u16,
    pub search_count: usize,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            token_status: 200,
            token_expires_in: 3600,
            refresh_status: 200,
            refresh_expires_in: 3600,
            refresh_rotates: false,
            profile_status: 200,
            profile_email: Some("listener@example.com".to_string()),
            artists_status: 200,
            artist_genres: vec![
                vec!["pop".to_string(), "rock".to_string()],
                vec!["pop".to_string()],
                vec!["jazz".to_string()],
            ],
            tracks_status: 200,
            track_count: 4,
            features_status: 200,
            search_status: 200,
            search_count: 50,
        }
    }
}

#[derive(Default)]
struct FakeState {
    behavior: Mutex<Behavior>,
    calls: Mutex<Vec<Call>>,
    observed: Mutex<Option<(Database, String)>>,
}

/// In-process stand-in for the Spotify accounts and Web API hosts.
#[derive(Clone)]
pub struct FakeSpotify {
    pub base_url: String,
    state: Arc<FakeState>,
}

#[allow(dead_code)]
impl FakeSpotify {
    pub async fn start() -> Self {
        Self::start_with(Behavior::default()).await
    }

    pub async fn start_with(behavior: Behavior) -> Self {
        let state = Arc::new(FakeState {
            behavior: Mutex::new(behavior),
            ..Default::default()
        });

        let app = Router::new().fallback(fake_handler).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn set_behavior(&self, f: impl FnOnce(&mut Behavior)) {
        f(&mut self.state.behavior.lock().unwrap());
    }

    /// Record the stored access token for `user_id` on every call.
    pub fn observe(&self, db: Database, user_id: &str) {
        *self.state.observed.lock().unwrap() = Some((db, user_id.to_string()));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.path == path).collect()
    }

    /// Point a config at this server.
    pub fn configure(&self, config: &mut Config) {
        config.spotify_accounts_url = self.base_url.clone();
        config.spotify_api_url = format!("{}/v1", self.base_url);
    }
}

async fn fake_handler(
    State(state): State<Arc<FakeState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body = String::from_utf8_lossy(&body).to_string();
    let observed = state.observed.lock().unwrap().clone();
    let stored_access_token = match observed {
        Some((db, user_id)) => db
            .get_tokens(&user_id)
            .await
            .ok()
            .flatten()
            .map(|t| t.access_token),
        None => None,
    };

    state.calls.lock().unwrap().push(Call {
        method,
        path: uri.path().to_string(),
        query: uri.query().unwrap_or_default().to_string(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: body.clone(),
        stored_access_token,
    });

    let behavior = state.behavior.lock().unwrap().clone();
    let query = uri.query().unwrap_or_default();

    match uri.path() {
        "/api/token" if body.contains("grant_type=refresh_token") => {
            let mut token = json!({
                "access_token": "refreshed-access",
                "expires_in": behavior.refresh_expires_in,
            });
            if behavior.refresh_rotates {
                token["refresh_token"] = json!("rotated-refresh");
            }
            reply(behavior.refresh_status, token)
        }
        "/api/token" => reply(
            behavior.token_status,
            json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "expires_in": behavior.token_expires_in,
            }),
        ),
        "/v1/me" => reply(
            behavior.profile_status,
            json!({
                "id": "spotify-user",
                "email": behavior.profile_email,
                "display_name": "Listener",
            }),
        ),
        "/v1/me/top/artists" => {
            let items: Vec<Value> = behavior
                .artist_genres
                .iter()
                .enumerate()
                .map(|(i, genres)| {
                    json!({
                        "name": format!("Artist {}", i),
                        "genres": genres,
                        "images": [{"url": format!("https://img/{}", i)}],
                    })
                })
                .collect();
            reply(behavior.artists_status, json!({ "items": items }))
        }
        "/v1/me/top/tracks" => {
            let items: Vec<Value> = (0..behavior.track_count).map(track).collect();
            reply(behavior.tracks_status, json!({ "items": items }))
        }
        "/v1/audio-features" => {
            let ids = query
                .split('&')
                .find_map(|kv| kv.strip_prefix("ids="))
                .unwrap_or_default();
            let features: Vec<Value> = ids
                .split("%2C")
                .flat_map(|chunk| chunk.split(','))
                .filter(|id| !id.is_empty())
                .map(|_| {
                    json!({
                        "energy": 0.9,
                        "danceability": 0.8,
                        "valence": 0.9,
                        "acousticness": 0.1,
                    })
                })
                .collect();
            reply(behavior.features_status, json!({ "audio_features": features }))
        }
        "/v1/search" => {
            let items: Vec<Value> = (100..100 + behavior.search_count).map(track).collect();
            reply(behavior.search_status, json!({ "tracks": { "items": items } }))
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

fn track(i: usize) -> Value {
    json!({
        "id": format!("t{}", i),
        "name": format!("Track {}", i),
        "uri": format!("spotify:track:t{}", i),
        "artists": [{"name": format!("Artist {}", i)}],
        "album": {"name": "Album", "images": [{"url": "https://img/album"}]},
    })
}

fn reply(status: u16, body: Value) -> Response {
    let status = StatusCode::from_u16(status).unwrap();
    if status.is_success() {
        (status, Json(body)).into_response()
    } else {
        (status, Json(json!({"error": {"status": status.as_u16()}}))).into_response()
    }
}

// ─── App Construction ────────────────────────────────────────

/// Create a test app backed by in-memory storage and the fake server.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app(spotify: &FakeSpotify) -> (Router, Arc<AppState>) {
    let mut config = Config::test_default();
    spotify.configure(&mut config);
    create_test_app_with_config(config)
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, Database::in_memory()));
    (create_router(state.clone()), state)
}

/// Create a test app with a specific frontend URL (no Spotify calls).
#[allow(dead_code)]
pub fn create_test_app_with_frontend_url(frontend_url: &str) -> (Router, Arc<AppState>) {
    let mut config = Config::test_default();
    config.frontend_url = frontend_url.to_string();
    create_test_app_with_config(config)
}

/// Store a user plus email index directly.
#[allow(dead_code)]
pub async fn seed_user(state: &AppState, user_id: &str, email: &str) -> LocalUser {
    let user = LocalUser {
        id: user_id.to_string(),
        email: email.to_string(),
        email_confirmed: true,
        metadata: UserMetadata {
            external_id: "spotify-user".to_string(),
            display_name: Some("Listener".to_string()),
        },
        created_at: "2026-01-01T00:00:00Z".to_string(),
    };
    state.db.upsert_user(&user).await.unwrap();
    state
        .db
        .insert_email_index(
            &email_key(email),
            &EmailIndex {
                user_id: user_id.to_string(),
                email: email.to_string(),
            },
        )
        .await
        .unwrap();
    user
}

/// Store a token record directly.
#[allow(dead_code)]
pub async fn seed_tokens(state: &AppState, user_id: &str, access: &str, expires_at: &str) {
    state
        .db
        .set_tokens(&TokenRecord {
            user_id: user_id.to_string(),
            access_token: access.to_string(),
            refresh_token: "refresh-0".to_string(),
            expires_at: expires_at.to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        })
        .await
        .unwrap();
}

/// Make a storage operation fail from now on.
#[allow(dead_code)]
pub fn inject_fault(state: &AppState, fault: Fault) {
    match &state.db {
        Database::Memory(db) => db.inject(fault),
        Database::Firestore(_) => panic!("faults need in-memory storage"),
    }
}

/// `Cookie` header value carrying a session for `user_id`.
#[allow(dead_code)]
pub fn session_cookie(state: &AppState, user_id: &str) -> String {
    let jwt = create_jwt(user_id, &state.config.jwt_signing_key).unwrap();
    format!("judgify_token={}", jwt)
}

/// GET with an optional Cookie header.
#[allow(dead_code)]
pub fn get(uri: &str, cookie: Option<&str>) -> axum::http::Request<Body> {
    let mut builder = axum::http::Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}
