// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Listening snapshot returned to the frontend, and the statistics behind it.
//!
//! The math here is pure: genre frequency ranking and audio-feature averaging
//! take already-fetched data so they can be tested without Spotify.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Number of genres kept in the ranking.
pub const TOP_GENRE_COUNT: usize = 5;

/// Average perceptual descriptors of a set of tracks, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AudioFeatures {
    pub energy: f64,
    pub danceability: f64,
    pub valence: f64,
    pub acousticness: f64,
}

impl AudioFeatures {
    /// Substituted for every track when audio features cannot be fetched.
    pub const DEFAULT: AudioFeatures = AudioFeatures {
        energy: 0.6,
        danceability: 0.6,
        valence: 0.5,
        acousticness: 0.3,
    };

    /// Arithmetic mean over feature records.
    ///
    /// Null records and missing fields count as 0 but stay in the
    /// denominator, so partial data biases the result toward 0.
    /// Returns `None` for an empty slice.
    pub fn average(records: &[Option<FeatureRecord>]) -> Option<AudioFeatures> {
        if records.is_empty() {
            return None;
        }

        let mut sum = AudioFeatures {
            energy: 0.0,
            danceability: 0.0,
            valence: 0.0,
            acousticness: 0.0,
        };
        for record in records.iter().flatten() {
            sum.energy += record.energy.unwrap_or(0.0);
            sum.danceability += record.danceability.unwrap_or(0.0);
            sum.valence += record.valence.unwrap_or(0.0);
            sum.acousticness += record.acousticness.unwrap_or(0.0);
        }

        let n = records.len() as f64;
        Some(AudioFeatures {
            energy: sum.energy / n,
            danceability: sum.danceability / n,
            valence: sum.valence / n,
            acousticness: sum.acousticness / n,
        })
    }
}

/// Per-track audio features as Spotify reports them (fields may be absent).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    #[serde(default)]
    pub energy: Option<f64>,
    #[serde(default)]
    pub danceability: Option<f64>,
    #[serde(default)]
    pub valence: Option<f64>,
    #[serde(default)]
    pub acousticness: Option<f64>,
}

impl From<AudioFeatures> for FeatureRecord {
    fn from(f: AudioFeatures) -> Self {
        Self {
            energy: Some(f.energy),
            danceability: Some(f.danceability),
            valence: Some(f.valence),
            acousticness: Some(f.acousticness),
        }
    }
}

/// A genre and how many top artists carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GenreCount {
    pub name: String,
    pub count: u32,
}

/// Rank genres by frequency across artists.
///
/// Sorted descending by count; ties keep first-seen order. Truncated to
/// [`TOP_GENRE_COUNT`].
pub fn rank_genres<'a, I, G>(artist_genres: I) -> Vec<GenreCount>
where
    I: IntoIterator<Item = G>,
    G: IntoIterator<Item = &'a String>,
{
    let mut ranking: Vec<GenreCount> = Vec::new();
    let mut positions: HashMap<&'a str, usize> = HashMap::new();

    for genres in artist_genres {
        for genre in genres {
            match positions.get(genre.as_str()) {
                Some(&idx) => ranking[idx].count += 1,
                None => {
                    positions.insert(genre.as_str(), ranking.len());
                    ranking.push(GenreCount {
                        name: genre.clone(),
                        count: 1,
                    });
                }
            }
        }
    }

    // sort_by is stable, which preserves discovery order among equal counts
    ranking.sort_by(|a, b| b.count.cmp(&a.count));
    ranking.truncate(TOP_GENRE_COUNT);
    ranking
}

/// Top artist summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ArtistSummary {
    pub name: String,
    pub image: Option<String>,
    pub genres: Vec<String>,
}

/// Top track summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TrackSummary {
    pub name: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub image: Option<String>,
}

/// Recommended track from the top-genre search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Recommendation {
    pub name: String,
    pub artist: Option<String>,
    pub image: Option<String>,
    pub uri: String,
}

/// Point-in-time summary of a user's listening data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MusicSnapshot {
    pub top_artists: Vec<ArtistSummary>,
    pub top_tracks: Vec<TrackSummary>,
    pub genres: Vec<GenreCount>,
    pub audio_features: AudioFeatures,
    pub recommendations: Vec<Recommendation>,
}
