// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod snapshot;
pub mod user;

pub use snapshot::{
    rank_genres, ArtistSummary, AudioFeatures, FeatureRecord, GenreCount, MusicSnapshot,
    Recommendation, TrackSummary,
};
pub use user::{
    email_key, EmailIndex, ExternalIdentity, LocalUser, SignInLinkRecord, TokenRecord, UserMetadata,
};
