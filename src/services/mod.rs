// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod aggregator;
pub mod session;
pub mod spotify;
pub mod summary;

pub use session::SessionBinder;
pub use spotify::SpotifyClient;
pub use summary::{render_summary, Aesthetic, TasteSummary};
