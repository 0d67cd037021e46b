//! Weighted ranking of connections and per-option reason selection.

use chrono::Duration;
use tracing::{debug, info};

use crate::connection::Connection;
use crate::decision::metrics::compute_metrics;
use crate::decision::risk::{risk_level, risk_score};
use crate::decision::types::{
    ConnectionMetrics, DecisionOption, DecisionQuery, QueryMode,
};
use crate::timefmt::{minutes_between, parse_ts};

const RISK_WEIGHT: f64 = 0.55;
const DURATION_WEIGHT: f64 = 0.2;
const TRANSFERS_WEIGHT: f64 = 0.1;
const WALKING_WEIGHT: f64 = 0.1;
const EXPOSURE_WEIGHT: f64 = 0.1;

/// Reason priority tiers; lower sorts first. Kept as one table so the
/// ordering contract is visible and testable in one place.
const PRIORITY_TIGHT_TRANSFER: u8 = 1;
const PRIORITY_DELAY: u8 = 2;
const PRIORITY_WEATHER_EXPOSURE: u8 = 3;
const PRIORITY_WEATHER_REASON: u8 = 4;
const PRIORITY_WALKING: u8 = 5;
const PRIORITY_TRANSFER_COUNT: u8 = 6;
const PRIORITY_PLATFORM_CHANGES: u8 = 7;
const PRIORITY_RUSH_HOUR: u8 = 8;

const MAX_REASONS: usize = 3;

/// Minimum transfer slack below this is called out as tight.
const TIGHT_TRANSFER_REASON_MINUTES: i64 = 8;
/// Walking minutes worth mentioning, normally and under a low-walking
/// preference.
const WALKING_REASON_MINUTES: i64 = 6;
const WALKING_REASON_MINUTES_LOW_PREF: i64 = 1;

/// Named weights for the decision score.
///
/// Walking and exposure are zero unless their preference is active, so the
/// total of active weights is always at least [`RISK_WEIGHT`] and the
/// normalizing division can never hit zero.
#[derive(Debug, Clone, Copy)]
struct ScoreWeights {
    risk: f64,
    duration: f64,
    transfers: f64,
    walking: f64,
    exposure: f64,
}

impl ScoreWeights {
    fn for_connection(query: &DecisionQuery, classed_wet: bool) -> Self {
        ScoreWeights {
            risk: RISK_WEIGHT,
            duration: DURATION_WEIGHT,
            transfers: TRANSFERS_WEIGHT,
            walking: if query.prefer_low_walking {
                WALKING_WEIGHT
            } else {
                0.0
            },
            exposure: if query.minimize_outdoor && classed_wet {
                EXPOSURE_WEIGHT
            } else {
                0.0
            },
        }
    }

    fn total(&self) -> f64 {
        self.risk + self.duration + self.transfers + self.walking + self.exposure
    }
}

/// Ranking output: ordered options plus the note attached when the
/// max-transfers filter had to be relaxed.
#[derive(Debug)]
pub struct RankedSet {
    pub options: Vec<DecisionOption>,
    pub constraint_note: Option<String>,
}

/// Scores, sorts, labels, and explains the given connections.
///
/// A max-transfers constraint that would empty the result is advisory: the
/// full set is ranked instead and the relaxation is disclosed via the
/// constraint note. Sorting is stable, so identical inputs always produce
/// identical order, ranks, and labels.
pub fn rank_connections(query: &DecisionQuery, connections: &[Connection]) -> RankedSet {
    let (candidates, constraint_note) = apply_transfer_filter(query, connections);

    let metrics: Vec<ConnectionMetrics> =
        candidates.iter().map(|c| compute_metrics(c)).collect();

    let min_duration = candidates.iter().map(|c| c.duration_minutes).min().unwrap_or(0);
    let max_duration = candidates.iter().map(|c| c.duration_minutes).max().unwrap_or(0);
    let max_transfers = candidates
        .iter()
        .map(|c| c.transfers_count as i64)
        .max()
        .unwrap_or(0)
        .max(1);
    let max_walking = metrics.iter().map(|m| m.walking_minutes).max().unwrap_or(0).max(1);
    let max_exposure = metrics.iter().map(|m| m.exposure_minutes).max().unwrap_or(0).max(1);

    let mut options: Vec<DecisionOption> = candidates
        .iter()
        .copied()
        .zip(metrics)
        .map(|(conn, metrics)| {
            let weather_penalty = conn.weather.as_ref().map(|w| w.penalty).unwrap_or(0.0);
            let score = risk_score(
                conn.reliability_score(),
                weather_penalty,
                metrics.exposure_minutes,
                metrics.min_transfer_minutes,
            );

            let classed_wet = conn.weather.as_ref().is_some_and(|w| w.is_wet());
            let weights = ScoreWeights::for_connection(query, classed_wet);

            let duration_norm = span_norm(conn.duration_minutes, min_duration, max_duration);
            let transfers_norm = conn.transfers_count as f64 / max_transfers as f64;
            let walking_norm = metrics.walking_minutes as f64 / max_walking as f64;
            let exposure_norm = metrics.exposure_minutes as f64 / max_exposure as f64;

            let decision_score = (score * weights.risk
                + duration_norm * weights.duration
                + transfers_norm * weights.transfers
                + walking_norm * weights.walking
                + exposure_norm * weights.exposure)
                / weights.total();

            let reasons = select_reasons(conn, &metrics, query);

            DecisionOption {
                arrival_buffer_minutes: arrival_buffer(query, conn),
                leave_by: leave_by_time(query, conn),
                reasons,
                risk_score: score,
                risk_level: risk_level(score),
                decision_score,
                rank: 0,
                label: String::new(),
                metrics,
                connection: conn.clone(),
            }
        })
        .collect();

    // Stable sort keeps input order on ties, which makes ranking total and
    // reproducible.
    options.sort_by(|a, b| {
        a.decision_score
            .partial_cmp(&b.decision_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for (idx, option) in options.iter_mut().enumerate() {
        option.rank = idx as u32 + 1;
        option.label = option_label(idx);
    }

    debug!(
        options = options.len(),
        relaxed = constraint_note.is_some(),
        "Connections ranked"
    );

    RankedSet {
        options,
        constraint_note,
    }
}

/// Applies the optional max-transfers filter, falling back to the full set
/// with a disclosed note when the filter would empty the result.
fn apply_transfer_filter<'a>(
    query: &DecisionQuery,
    connections: &'a [Connection],
) -> (Vec<&'a Connection>, Option<String>) {
    let Some(max) = query.max_transfers else {
        return (connections.iter().collect(), None);
    };

    let filtered: Vec<&Connection> = connections
        .iter()
        .filter(|c| c.transfers_count <= max)
        .collect();

    if filtered.is_empty() && !connections.is_empty() {
        let note = format!(
            "No options with at most {} {}; showing all connections instead.",
            max,
            plural(max as i64, "transfer", "transfers")
        );
        info!(max_transfers = max, "Max-transfers filter relaxed");
        (connections.iter().collect(), Some(note))
    } else {
        (filtered, None)
    }
}

fn span_norm(value: i64, min: i64, max: i64) -> f64 {
    if max <= min {
        0.0
    } else {
        (value - min) as f64 / (max - min) as f64
    }
}

fn option_label(idx: usize) -> String {
    if idx < 26 {
        format!("Option {}", (b'A' + idx as u8) as char)
    } else {
        format!("Option {}", idx + 1)
    }
}

fn plural<'a>(n: i64, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}

/// Picks up to three reasons, ordered by priority tier and deduplicated by
/// exact label text.
fn select_reasons(
    conn: &Connection,
    metrics: &ConnectionMetrics,
    query: &DecisionQuery,
) -> Vec<String> {
    let mut candidates: Vec<(u8, String)> = Vec::new();

    if let Some(m) = metrics.min_transfer_minutes {
        if m < TIGHT_TRANSFER_REASON_MINUTES {
            let label = match &metrics.min_transfer_station {
                Some(station) => format!("Tight transfer: {m} min at {station}"),
                None => format!("Tight transfer: {m} min"),
            };
            candidates.push((PRIORITY_TIGHT_TRANSFER, label));
        }
    }

    if metrics.delay_minutes > 0 {
        candidates.push((
            PRIORITY_DELAY,
            format!("Current delay +{} min", metrics.delay_minutes),
        ));
    }

    if let Some(weather) = &conn.weather {
        if weather.is_wet_or_windy() && metrics.exposure_minutes > 0 {
            let condition = weather
                .condition
                .clone()
                .unwrap_or_else(|| "Wet conditions".to_string());
            candidates.push((
                PRIORITY_WEATHER_EXPOSURE,
                format!("{condition} + {} min exposed", metrics.exposure_minutes),
            ));
        } else if let Some(reason) = weather.reasons.first() {
            candidates.push((PRIORITY_WEATHER_REASON, reason.clone()));
        }
    }

    let walking_threshold = if query.prefer_low_walking {
        WALKING_REASON_MINUTES_LOW_PREF
    } else {
        WALKING_REASON_MINUTES
    };
    if metrics.walking_minutes >= walking_threshold {
        candidates.push((
            PRIORITY_WALKING,
            format!("{} min walking", metrics.walking_minutes),
        ));
    }

    if conn.transfers_count > 0 {
        let n = conn.transfers_count as i64;
        candidates.push((
            PRIORITY_TRANSFER_COUNT,
            format!("{n} {}", plural(n, "transfer", "transfers")),
        ));
    }

    if !metrics.platform_changes.is_empty() {
        let n = metrics.platform_changes.len() as i64;
        candidates.push((
            PRIORITY_PLATFORM_CHANGES,
            format!("{n} {}", plural(n, "platform change", "platform changes")),
        ));
    }

    if conn.has_peak_hour_flag() {
        candidates.push((PRIORITY_RUSH_HOUR, "rush hour".to_string()));
    }

    candidates.sort_by_key(|(priority, _)| *priority);

    let mut reasons: Vec<String> = Vec::new();
    for (_, label) in candidates {
        if !reasons.contains(&label) {
            reasons.push(label);
        }
        if reasons.len() == MAX_REASONS {
            break;
        }
    }
    reasons
}

/// Minutes of slack before the requested arrival, never negative. Arrival
/// mode only; `None` when either timestamp fails to parse.
fn arrival_buffer(query: &DecisionQuery, conn: &Connection) -> Option<i64> {
    if query.mode != QueryMode::ArriveBy {
        return None;
    }
    let target = parse_ts(&query.target_time)?;
    let arrival = parse_ts(actual_arrival(conn))?;
    Some(minutes_between(arrival, target).max(0))
}

/// The connection's live arrival: the last leg's effective time, or the
/// connection-level arrival when there are no legs.
fn actual_arrival(conn: &Connection) -> &str {
    conn.legs
        .last()
        .map(|l| l.to_point().effective_time())
        .unwrap_or(&conn.arrival)
}

/// Suggested leave-by time for departure-mode queries with a requested
/// early-departure buffer.
fn leave_by_time(query: &DecisionQuery, conn: &Connection) -> Option<String> {
    if query.mode != QueryMode::DepartAt {
        return None;
    }
    let buffer = query.buffer_minutes.filter(|b| *b > 0)?;
    let departure = parse_ts(&conn.departure)?;
    Some((departure - Duration::minutes(buffer)).to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{
        ForecastSample, Leg, LegPoint, ReliabilityEstimate, RideLine, WeatherInsight,
    };

    fn point(name: &str, time: &str) -> LegPoint {
        LegPoint {
            name: name.into(),
            planned: time.into(),
            actual: None,
            platform: None,
        }
    }

    fn simple_connection(id: &str, duration: i64, transfers: u32) -> Connection {
        let mut legs = vec![Leg::Ride {
            from: point("A", "2024-05-01T08:00:00Z"),
            to: point("B", "2024-05-01T08:20:00Z"),
            line: RideLine {
                id: "r1".into(),
                label: "S1".into(),
                mode: None,
                operator: None,
                delay_minutes: None,
            },
        }];
        for i in 0..transfers {
            let dep = format!("2024-05-01T08:{:02}:00Z", 30 + i * 10);
            let arr = format!("2024-05-01T08:{:02}:00Z", 35 + i * 10);
            legs.push(Leg::Ride {
                from: point("B", &dep),
                to: point("C", &arr),
                line: RideLine {
                    id: format!("r{}", i + 2),
                    label: format!("S{}", i + 2),
                    mode: None,
                    operator: None,
                    delay_minutes: None,
                },
            });
        }
        Connection {
            id: id.into(),
            departure: "2024-05-01T08:00:00Z".into(),
            arrival: "2024-05-01T09:00:00Z".into(),
            duration_minutes: duration,
            transfers_count: transfers,
            legs,
            reliability: None,
            weather: None,
            tags: vec![],
        }
    }

    fn query() -> DecisionQuery {
        DecisionQuery {
            from: "A".into(),
            to: "C".into(),
            mode: QueryMode::DepartAt,
            target_time: "2024-05-01T08:00:00Z".into(),
            max_transfers: None,
            prefer_low_walking: false,
            minimize_outdoor: false,
            buffer_minutes: None,
        }
    }

    #[test]
    fn test_ranking_is_stable_and_total() {
        let connections = vec![
            simple_connection("slow", 90, 2),
            simple_connection("fast", 50, 0),
            simple_connection("mid", 70, 1),
        ];
        let q = query();
        let first = rank_connections(&q, &connections);
        let second = rank_connections(&q, &connections);

        let order: Vec<&str> = first.options.iter().map(|o| o.connection.id.as_str()).collect();
        let order2: Vec<&str> = second.options.iter().map(|o| o.connection.id.as_str()).collect();
        assert_eq!(order, order2);
        assert_eq!(first.options[0].rank, 1);
        assert_eq!(first.options[0].label, "Option A");
        assert_eq!(first.options[1].label, "Option B");
        assert_eq!(first.options[0].connection.id, "fast");
    }

    #[test]
    fn test_labels_past_the_alphabet() {
        assert_eq!(option_label(0), "Option A");
        assert_eq!(option_label(25), "Option Z");
        assert_eq!(option_label(26), "Option 27");
    }

    #[test]
    fn test_transfer_filter_keeps_matching() {
        let connections = vec![
            simple_connection("direct", 60, 0),
            simple_connection("one", 60, 1),
            simple_connection("two", 60, 2),
        ];
        let mut q = query();
        q.max_transfers = Some(1);
        let ranked = rank_connections(&q, &connections);
        assert_eq!(ranked.options.len(), 2);
        assert!(ranked.constraint_note.is_none());
        assert!(
            !ranked
                .options
                .iter()
                .any(|o| o.connection.id == "two")
        );
    }

    #[test]
    fn test_transfer_filter_relaxes_instead_of_emptying() {
        let connections = vec![
            simple_connection("two-a", 60, 2),
            simple_connection("two-b", 70, 2),
        ];
        let mut q = query();
        q.max_transfers = Some(0);
        let ranked = rank_connections(&q, &connections);
        assert_eq!(ranked.options.len(), 2);
        let note = ranked.constraint_note.unwrap();
        assert!(note.contains("showing all connections"));
    }

    #[test]
    fn test_reasons_capped_and_prioritized() {
        let mut conn = simple_connection("busy", 60, 1);
        // Tighten the transfer: second ride departs 4 min after the first
        // arrives.
        if let Leg::Ride { from, .. } = &mut conn.legs[1] {
            from.planned = "2024-05-01T08:24:00Z".into();
        }
        if let Leg::Ride { line, .. } = &mut conn.legs[0] {
            line.delay_minutes = Some(5);
        }
        conn.reliability = Some(ReliabilityEstimate {
            score: 0.6,
            reasons: vec!["peak_hour".into()],
        });

        let ranked = rank_connections(&query(), &[conn]);
        let reasons = &ranked.options[0].reasons;
        assert!(reasons.len() <= 3);
        assert!(reasons[0].starts_with("Tight transfer: 4 min at B"));
        assert_eq!(reasons[1], "Current delay +5 min");
        // rush hour is tier 8; it must never displace the tight-transfer
        // reason and here it does not even make the cut.
        assert!(!reasons.contains(&"rush hour".to_string()));
        let dedup: std::collections::HashSet<&String> = reasons.iter().collect();
        assert_eq!(dedup.len(), reasons.len());
    }

    #[test]
    fn test_rush_hour_reason_surfaces_when_slots_remain() {
        let mut conn = simple_connection("peaky", 60, 0);
        conn.reliability = Some(ReliabilityEstimate {
            score: 0.6,
            reasons: vec!["peak_hour".into()],
        });
        let ranked = rank_connections(&query(), &[conn]);
        assert!(
            ranked.options[0]
                .reasons
                .contains(&"rush hour".to_string())
        );
    }

    #[test]
    fn test_wet_weather_activates_exposure_weight() {
        let wet = WeatherInsight {
            penalty: 0.6,
            level: "severe".into(),
            condition: Some("Rain".into()),
            reasons: vec!["Heavy rain expected".into()],
            samples: vec![ForecastSample {
                precipitation_mm: 2.5,
                ..Default::default()
            }],
        };

        // Same risk profile, different exposure: with minimize_outdoor the
        // high-exposure option must score strictly worse.
        let mut low_exposure = simple_connection("low", 60, 1);
        low_exposure.weather = Some(wet.clone());
        let mut high_exposure = simple_connection("high", 60, 1);
        high_exposure.weather = Some(wet);
        high_exposure.legs.push(Leg::Walk {
            from: point("C", "2024-05-01T08:45:00Z"),
            to: point("D", "2024-05-01T09:00:00Z"),
        });

        let mut q = query();
        q.minimize_outdoor = true;
        let ranked = rank_connections(&q, &[high_exposure, low_exposure]);
        assert_eq!(ranked.options[0].connection.id, "low");
    }

    #[test]
    fn test_arrival_buffer_never_negative() {
        let conn = simple_connection("late", 60, 0);
        let mut q = query();
        q.mode = QueryMode::ArriveBy;
        // Target is before the connection's arrival.
        q.target_time = "2024-05-01T08:10:00Z".into();
        let ranked = rank_connections(&q, &[conn]);
        assert_eq!(ranked.options[0].arrival_buffer_minutes, Some(0));
    }

    #[test]
    fn test_leave_by_subtracts_buffer() {
        let conn = simple_connection("c", 60, 0);
        let mut q = query();
        q.buffer_minutes = Some(10);
        let ranked = rank_connections(&q, &[conn]);
        let leave_by = ranked.options[0].leave_by.as_deref().unwrap();
        assert!(leave_by.starts_with("2024-05-01T07:50:00"));
    }

    #[test]
    fn test_weight_totals_stay_positive() {
        let q = query();
        let w = ScoreWeights::for_connection(&q, false);
        assert!(w.total() > 0.0);
        let mut q2 = query();
        q2.prefer_low_walking = true;
        q2.minimize_outdoor = true;
        let w2 = ScoreWeights::for_connection(&q2, true);
        assert!((w2.total() - 1.05).abs() < 1e-9);
    }
}
