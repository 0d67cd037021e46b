//! Data types produced and consumed by the decision pipeline.

use serde::{Deserialize, Serialize};

use crate::connection::Connection;
use crate::decision::risk::RiskLevel;

/// Uniform per-connection metrics derived from the leg sequence.
///
/// Computed fresh for every connection on every request, never cached.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionMetrics {
    /// Total walking time over all walk legs, in whole minutes.
    pub walking_minutes: i64,
    /// Wait between each adjacent pair of ride legs, in itinerary order.
    pub transfer_waits: Vec<i64>,
    pub transfer_wait_total: i64,
    /// Smallest transfer wait; absent when the connection is direct.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_transfer_minutes: Option<i64>,
    /// Station where the minimum transfer occurs (first occurrence on ties).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_transfer_station: Option<String>,
    /// Sum of positive per-leg delays.
    pub delay_minutes: i64,
    /// Deduplicated delay alert labels, first-seen order.
    pub delay_alerts: Vec<String>,
    /// Deduplicated platform-change labels, first-seen order.
    pub platform_changes: Vec<String>,
    /// Walking plus transfer-wait minutes; weather-risk multiplier basis.
    pub exposure_minutes: i64,
}

/// Whether the query anchors on departure or arrival time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    DepartAt,
    ArriveBy,
}

/// The request context the decision pipeline ranks against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionQuery {
    pub from: String,
    pub to: String,
    pub mode: QueryMode,
    /// Departure or arrival target, depending on `mode`.
    pub target_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_transfers: Option<u32>,
    #[serde(default)]
    pub prefer_low_walking: bool,
    #[serde(default)]
    pub minimize_outdoor: bool,
    /// Requested safety buffer in minutes (leave-early in depart mode,
    /// arrive-early in arrival mode).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_minutes: Option<i64>,
}

/// One ranked travel option.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionOption {
    pub connection: Connection,
    pub metrics: ConnectionMetrics,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    /// Weighted composite used for ordering; lower is better.
    pub decision_score: f64,
    /// 1-based position after the final sort.
    pub rank: u32,
    /// Display label: `Option A`, `Option B`, … `Option 27`.
    pub label: String,
    /// Up to three prioritized reasons.
    pub reasons: Vec<String>,
    /// Minutes of slack before the requested arrival (arrival mode only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival_buffer_minutes: Option<i64>,
    /// Suggested leave-by time (departure mode with a requested buffer).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leave_by: Option<String>,
}

/// Which upstream signal categories the summary can ever reflect.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DataCoverage {
    pub delays: bool,
    pub platform_changes: bool,
    pub cancellations: bool,
    pub service_notices: bool,
}

impl DataCoverage {
    /// Delay and platform data are always considered; cancellations and
    /// service notices are not modeled.
    pub const CURRENT: DataCoverage = DataCoverage {
        delays: true,
        platform_changes: true,
        cancellations: false,
        service_notices: false,
    };
}

/// The full response object: ranked options, recommendation, and narrative.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionSummary {
    pub query: DecisionQuery,
    pub options: Vec<DecisionOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_option_id: Option<String>,
    /// Present when the max-transfers filter had to be relaxed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint_note: Option<String>,
    pub narrative: String,
    pub data_coverage: DataCoverage,
}
