// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Turns averaged audio features into human-readable taste descriptions.
//!
//! All thresholds are strict: a value exactly on a boundary falls to the
//! lower bucket.

use crate::models::AudioFeatures;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Overall listening aesthetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aesthetic {
    PartyStarter,
    AcousticSoul,
    NightThinker,
    EclecticExplorer,
}

impl Aesthetic {
    pub fn label(self) -> &'static str {
        match self {
            Aesthetic::PartyStarter => "Party Starter",
            Aesthetic::AcousticSoul => "Acoustic Soul",
            Aesthetic::NightThinker => "Night Thinker",
            Aesthetic::EclecticExplorer => "Eclectic Explorer",
        }
    }

    pub fn tagline(self) -> &'static str {
        match self {
            Aesthetic::PartyStarter => "Energetic, upbeat, and vibrant",
            Aesthetic::AcousticSoul => "Raw, organic, and intimate",
            Aesthetic::NightThinker => "Introspective, moody, and deep",
            Aesthetic::EclecticExplorer => "Diverse, adventurous, and unique",
        }
    }
}

pub fn describe_mood(features: &AudioFeatures) -> &'static str {
    if features.energy > 0.7 {
        "high-energy and dynamic"
    } else if features.energy > 0.4 {
        "balanced and versatile"
    } else {
        "calm and introspective"
    }
}

pub fn describe_rhythm(features: &AudioFeatures) -> &'static str {
    if features.danceability > 0.6 {
        "strong rhythmic"
    } else {
        "laid-back"
    }
}

pub fn describe_valence(features: &AudioFeatures) -> &'static str {
    if features.valence > 0.5 {
        "uplifting and positive"
    } else {
        "thoughtful and emotional"
    }
}

/// Classify the aesthetic. Rules overlap, so the first match wins.
pub fn describe_aesthetic(features: &AudioFeatures) -> Aesthetic {
    if features.energy > 0.7 && features.valence > 0.6 {
        Aesthetic::PartyStarter
    } else if features.acousticness > 0.5 {
        Aesthetic::AcousticSoul
    } else if features.energy < 0.4 && features.valence < 0.5 {
        Aesthetic::NightThinker
    } else {
        Aesthetic::EclecticExplorer
    }
}

/// Rendered taste summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TasteSummary {
    pub mood: String,
    pub rhythm: String,
    pub vibe: String,
    /// Full sentence combining mood, rhythm and vibe
    pub verdict: String,
    pub aesthetic: String,
    pub tagline: String,
}

pub fn render_summary(features: &AudioFeatures) -> TasteSummary {
    let mood = describe_mood(features);
    let rhythm = describe_rhythm(features);
    let vibe = describe_valence(features);
    let aesthetic = describe_aesthetic(features);

    TasteSummary {
        mood: mood.to_string(),
        rhythm: rhythm.to_string(),
        vibe: vibe.to_string(),
        verdict: format!(
            "Your music taste is {} with a {} feel. You enjoy {} vibes.",
            mood, rhythm, vibe
        ),
        aesthetic: aesthetic.label().to_string(),
        tagline: aesthetic.tagline().to_string(),
    }
}
