// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Judgify: a verdict on your Spotify listening taste
//!
//! This crate provides the backend API: Spotify OAuth login, local user
//! binding, and the listening snapshot and taste summary endpoints.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use services::{SessionBinder, SpotifyClient};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub spotify: SpotifyClient,
    pub sessions: SessionBinder,
}

impl AppState {
    /// Wire up services for a config and an opened database.
    pub fn new(config: Config, db: Database) -> Self {
        let spotify = SpotifyClient::new(&config);
        let sessions = SessionBinder::new(
            db.clone(),
            config.jwt_signing_key.clone(),
            config.api_url.clone(),
        );

        Self {
            config,
            db,
            spotify,
            sessions,
        }
    }
}
