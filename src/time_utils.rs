// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Timestamp helpers. Stored timestamps are RFC 3339 strings in UTC.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a stored RFC 3339 timestamp (any offset) into UTC.
pub fn parse_utc_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Expiry `expires_in` seconds after `now`, as a stored timestamp.
///
/// `None` if the result does not fit in a `DateTime`.
pub fn expiry_after(now: DateTime<Utc>, expires_in: i64) -> Option<String> {
    let lifetime = Duration::try_seconds(expires_in)?;
    now.checked_add_signed(lifetime).map(format_utc_rfc3339)
}
