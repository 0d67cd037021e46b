//! Connection and leg data model.
//!
//! Connections arrive already normalized from the upstream fetch layer; this
//! module defines the shapes the decision pipeline consumes. Walk legs carry
//! no line or delay information, which the `Leg` enum encodes directly.

use serde::{Deserialize, Serialize};

use crate::gtfs::resolve::TransportMode;

/// Reliability score assumed when a connection carries no estimate.
pub const DEFAULT_RELIABILITY: f64 = 0.7;

/// Reliability reason code emitted for peak-time departures.
pub const PEAK_HOUR_CODE: &str = "peak_hour";

/// One endpoint of a leg: station name, planned time, and live overrides.
///
/// `actual` is present only when it differs from `planned`. A platform value
/// containing `!` marks a live platform change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegPoint {
    pub name: String,
    pub planned: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl LegPoint {
    /// The live timestamp when present, the planned one otherwise.
    pub fn effective_time(&self) -> &str {
        self.actual.as_deref().unwrap_or(&self.planned)
    }

    /// True when the platform value carries the live-change marker.
    pub fn has_platform_change(&self) -> bool {
        self.platform.as_deref().is_some_and(|p| p.contains('!'))
    }
}

/// Line details carried by ride legs only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideLine {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<TransportMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_minutes: Option<i64>,
}

/// One segment of an itinerary, in itinerary order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Leg {
    Ride {
        from: LegPoint,
        to: LegPoint,
        line: RideLine,
    },
    Walk {
        from: LegPoint,
        to: LegPoint,
    },
}

impl Leg {
    pub fn from_point(&self) -> &LegPoint {
        match self {
            Leg::Ride { from, .. } | Leg::Walk { from, .. } => from,
        }
    }

    pub fn to_point(&self) -> &LegPoint {
        match self {
            Leg::Ride { to, .. } | Leg::Walk { to, .. } => to,
        }
    }

    pub fn line(&self) -> Option<&RideLine> {
        match self {
            Leg::Ride { line, .. } => Some(line),
            Leg::Walk { .. } => None,
        }
    }

    pub fn is_ride(&self) -> bool {
        matches!(self, Leg::Ride { .. })
    }
}

/// Reliability estimate attached by the upstream reliability model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityEstimate {
    /// 0–1, higher means more reliable.
    pub score: f64,
    /// Reason codes, e.g. [`PEAK_HOUR_CODE`].
    #[serde(default)]
    pub reasons: Vec<String>,
}

/// One weather forecast sample along the journey.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastSample {
    #[serde(default)]
    pub precipitation_mm: f64,
    #[serde(default)]
    pub snowfall_cm: f64,
    #[serde(default)]
    pub wind_speed_kmh: f64,
}

/// Wind speed at or above this is treated as windy for reason selection.
pub const WINDY_KMH: f64 = 30.0;

/// Pre-computed weather insight for a connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherInsight {
    /// Exposure penalty, 0–1.
    pub penalty: f64,
    /// Coarse level string supplied upstream ("low"/"moderate"/"severe").
    pub level: String,
    /// Short condition text, e.g. "Rain" or "Snow showers".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Ranked human-readable reasons.
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub samples: Vec<ForecastSample>,
}

impl WeatherInsight {
    /// True when the first forecast sample shows any precipitation or snow.
    pub fn is_wet(&self) -> bool {
        self.samples
            .first()
            .is_some_and(|s| s.precipitation_mm > 0.0 || s.snowfall_cm > 0.0)
    }

    /// True when the first forecast sample is wet or windy.
    pub fn is_wet_or_windy(&self) -> bool {
        self.is_wet()
            || self
                .samples
                .first()
                .is_some_and(|s| s.wind_speed_kmh >= WINDY_KMH)
    }
}

/// A complete origin-to-destination itinerary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub departure: String,
    pub arrival: String,
    pub duration_minutes: i64,
    pub transfers_count: u32,
    pub legs: Vec<Leg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliability: Option<ReliabilityEstimate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherInsight>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Connection {
    /// Derives the deterministic connection identifier from a departure time
    /// and the line identifiers of its ride legs, sanitized to lowercase
    /// alphanumerics and dashes.
    pub fn derive_id<'a>(departure: &str, line_ids: impl IntoIterator<Item = &'a str>) -> String {
        let mut raw = departure.to_string();
        for id in line_ids {
            raw.push('-');
            raw.push_str(id);
        }

        let mut out = String::with_capacity(raw.len());
        let mut last_dash = false;
        for c in raw.chars() {
            if c.is_ascii_alphanumeric() {
                out.push(c.to_ascii_lowercase());
                last_dash = false;
            } else if !last_dash && !out.is_empty() {
                out.push('-');
                last_dash = true;
            }
        }
        while out.ends_with('-') {
            out.pop();
        }
        out
    }

    /// Reliability score, falling back to [`DEFAULT_RELIABILITY`].
    pub fn reliability_score(&self) -> f64 {
        self.reliability
            .as_ref()
            .map(|r| r.score)
            .unwrap_or(DEFAULT_RELIABILITY)
    }

    /// True when the reliability model flagged a peak-time departure.
    pub fn has_peak_hour_flag(&self) -> bool {
        self.reliability
            .as_ref()
            .is_some_and(|r| r.reasons.iter().any(|c| c == PEAK_HOUR_CODE))
    }

    pub fn ride_legs(&self) -> impl Iterator<Item = &Leg> {
        self.legs.iter().filter(|l| l.is_ride())
    }
}
