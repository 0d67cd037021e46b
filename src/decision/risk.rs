//! Risk model: combines the reliability estimate, weather exposure, and
//! tight-transfer slack into a 0–1 score and a three-level label.

use serde::{Deserialize, Serialize};

/// Score at or above this is high risk.
pub const HIGH_RISK_THRESHOLD: f64 = 0.6;
/// Score at or above this (and below high) is medium risk.
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.35;

/// Exposure minutes at which the weather multiplier saturates.
const EXPOSURE_SATURATION_MINUTES: f64 = 20.0;

/// Transfer slack below this many minutes takes the full penalty.
const TIGHT_TRANSFER_MINUTES: i64 = 6;
/// Transfer slack below this (and at least the tight bound) takes half.
const SNUG_TRANSFER_MINUTES: i64 = 8;

const TIGHT_TRANSFER_PENALTY: f64 = 0.12;
const SNUG_TRANSFER_PENALTY: f64 = 0.06;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// Computes the composite risk score, clamped to [0, 1].
///
/// `weather_penalty` is 0 when no weather insight exists; a 20-minute
/// exposure saturates the weather multiplier at 1.0.
pub fn risk_score(
    reliability: f64,
    weather_penalty: f64,
    exposure_minutes: i64,
    min_transfer_minutes: Option<i64>,
) -> f64 {
    let delay_likelihood = 1.0 - reliability;

    let exposure_factor = (exposure_minutes as f64 / EXPOSURE_SATURATION_MINUTES).clamp(0.0, 1.0);
    let weather_exposure_risk = weather_penalty * (0.3 + 0.7 * exposure_factor);

    let tight_transfer_penalty = match min_transfer_minutes {
        Some(m) if m < TIGHT_TRANSFER_MINUTES => TIGHT_TRANSFER_PENALTY,
        Some(m) if m < SNUG_TRANSFER_MINUTES => SNUG_TRANSFER_PENALTY,
        _ => 0.0,
    };

    (delay_likelihood + weather_exposure_risk + tight_transfer_penalty).clamp(0.0, 1.0)
}

/// Maps a score to its level. Thresholds are fixed, not configurable.
pub fn risk_level(score: f64) -> RiskLevel {
    if score >= HIGH_RISK_THRESHOLD {
        RiskLevel::High
    } else if score >= MEDIUM_RISK_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}
