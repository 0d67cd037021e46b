//! Lenient timestamp parsing and display helpers.
//!
//! Upstream connection data carries RFC 3339 strings; anything that fails to
//! parse degrades to a zero contribution (durations) or a fixed placeholder
//! (display) rather than an error.

use chrono::{DateTime, FixedOffset};

/// Placeholder rendered for malformed or missing timestamps.
pub const TIME_PLACEHOLDER: &str = "--:--";

/// Parses an RFC 3339 timestamp, returning `None` for anything malformed.
pub fn parse_ts(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw.trim()).ok()
}

/// Whole minutes from `from` to `to`, rounded half-away-from-zero.
pub fn minutes_between(from: DateTime<FixedOffset>, to: DateTime<FixedOffset>) -> i64 {
    let secs = (to - from).num_seconds();
    (secs as f64 / 60.0).round() as i64
}

/// Renders an RFC 3339 timestamp as `HH:MM` in its own UTC offset.
///
/// Malformed input renders as [`TIME_PLACEHOLDER`].
pub fn format_hm(raw: &str) -> String {
    match parse_ts(raw) {
        Some(ts) => ts.format("%H:%M").to_string(),
        None => TIME_PLACEHOLDER.to_string(),
    }
}
