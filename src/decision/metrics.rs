//! Derives uniform per-connection metrics from heterogeneous leg sequences.
//!
//! All time arithmetic is lenient: a missing or unparseable timestamp
//! contributes zero minutes rather than failing the whole computation.

use crate::connection::{Connection, Leg, LegPoint};
use crate::decision::types::ConnectionMetrics;
use crate::timefmt::{minutes_between, parse_ts};

/// Computes walking, transfer, delay, platform-change, and exposure metrics
/// for one connection.
pub fn compute_metrics(conn: &Connection) -> ConnectionMetrics {
    let walking_minutes: i64 = conn
        .legs
        .iter()
        .filter(|l| !l.is_ride())
        .map(|l| elapsed_minutes(l.from_point(), l.to_point()))
        .sum();

    // Wait between each adjacent pair of ride legs, with the station where
    // the traveller changes (the arrival station of the earlier ride).
    let rides: Vec<&Leg> = conn.legs.iter().filter(|l| l.is_ride()).collect();
    let mut transfer_waits = Vec::new();
    let mut stations = Vec::new();
    for pair in rides.windows(2) {
        transfer_waits.push(elapsed_minutes(pair[0].to_point(), pair[1].from_point()));
        stations.push(pair[0].to_point().name.clone());
    }
    let transfer_wait_total: i64 = transfer_waits.iter().sum();

    let mut min_transfer_minutes = None;
    let mut min_transfer_station = None;
    for (wait, station) in transfer_waits.iter().zip(&stations) {
        if min_transfer_minutes.is_none_or(|m| *wait < m) {
            min_transfer_minutes = Some(*wait);
            min_transfer_station = Some(station.clone());
        }
    }

    let mut delay_minutes = 0i64;
    let mut delay_alerts: Vec<String> = Vec::new();
    for leg in &conn.legs {
        let Some(line) = leg.line() else { continue };
        let Some(delay) = line.delay_minutes.filter(|d| *d > 0) else {
            continue;
        };
        delay_minutes += delay;
        let label = if line.label.is_empty() {
            format!("Delay +{delay} min")
        } else {
            format!("{} +{delay} min", line.label)
        };
        if !delay_alerts.contains(&label) {
            delay_alerts.push(label);
        }
    }

    let mut platform_changes: Vec<String> = Vec::new();
    for leg in &conn.legs {
        for point in [leg.from_point(), leg.to_point()] {
            if let Some(label) = platform_change_label(point) {
                if !platform_changes.contains(&label) {
                    platform_changes.push(label);
                }
            }
        }
    }

    ConnectionMetrics {
        walking_minutes,
        transfer_wait_total,
        min_transfer_minutes,
        min_transfer_station,
        transfer_waits,
        delay_minutes,
        delay_alerts,
        platform_changes,
        exposure_minutes: walking_minutes + transfer_wait_total,
    }
}

/// Elapsed whole minutes between two leg endpoints using live times where
/// present, floored at zero. Unparseable timestamps yield zero.
fn elapsed_minutes(from: &LegPoint, to: &LegPoint) -> i64 {
    match (parse_ts(from.effective_time()), parse_ts(to.effective_time())) {
        (Some(a), Some(b)) => minutes_between(a, b).max(0),
        _ => 0,
    }
}

fn platform_change_label(point: &LegPoint) -> Option<String> {
    if !point.has_platform_change() {
        return None;
    }
    let platform = point.platform.as_deref()?.replace('!', "");
    Some(format!("{} (Pl. {})", point.name, platform))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Leg, LegPoint, RideLine};

    fn point(name: &str, time: &str) -> LegPoint {
        LegPoint {
            name: name.into(),
            planned: time.into(),
            actual: None,
            platform: None,
        }
    }

    fn ride(from: LegPoint, to: LegPoint, label: &str, delay: Option<i64>) -> Leg {
        Leg::Ride {
            from,
            to,
            line: RideLine {
                id: label.to_ascii_lowercase(),
                label: label.into(),
                mode: None,
                operator: None,
                delay_minutes: delay,
            },
        }
    }

    fn connection(legs: Vec<Leg>) -> Connection {
        let rides = legs.iter().filter(|l| l.is_ride()).count();
        Connection {
            id: "c1".into(),
            departure: "2024-05-01T08:00:00Z".into(),
            arrival: "2024-05-01T09:00:00Z".into(),
            duration_minutes: 60,
            transfers_count: rides.saturating_sub(1) as u32,
            legs,
            reliability: None,
            weather: None,
            tags: vec![],
        }
    }

    #[test]
    fn test_walking_and_exposure_example() {
        // 6 minutes of walking plus a single 10-minute transfer wait.
        let conn = connection(vec![
            ride(
                point("Bern", "2024-05-01T08:00:00Z"),
                point("Olten", "2024-05-01T08:26:00Z"),
                "IC 8",
                None,
            ),
            Leg::Walk {
                from: point("Olten", "2024-05-01T08:26:00Z"),
                to: point("Olten Ost", "2024-05-01T08:32:00Z"),
            },
            ride(
                point("Olten Ost", "2024-05-01T08:36:00Z"),
                point("Zug", "2024-05-01T09:00:00Z"),
                "S1",
                None,
            ),
        ]);
        let m = compute_metrics(&conn);
        assert_eq!(m.walking_minutes, 6);
        assert_eq!(m.transfer_waits, vec![10]);
        assert_eq!(m.transfer_wait_total, 10);
        assert_eq!(m.min_transfer_minutes, Some(10));
        assert_eq!(m.min_transfer_station.as_deref(), Some("Olten"));
        assert_eq!(m.exposure_minutes, 16);
    }

    #[test]
    fn test_transfer_wait_list_length() {
        let conn = connection(vec![
            ride(
                point("A", "2024-05-01T08:00:00Z"),
                point("B", "2024-05-01T08:10:00Z"),
                "R1",
                None,
            ),
            ride(
                point("B", "2024-05-01T08:15:00Z"),
                point("C", "2024-05-01T08:30:00Z"),
                "R2",
                None,
            ),
            ride(
                point("C", "2024-05-01T08:34:00Z"),
                point("D", "2024-05-01T08:50:00Z"),
                "R3",
                None,
            ),
        ]);
        let m = compute_metrics(&conn);
        assert_eq!(m.transfer_waits.len(), 2);
        assert_eq!(m.transfer_waits, vec![5, 4]);
        assert_eq!(m.min_transfer_minutes, Some(4));
        assert_eq!(m.min_transfer_station.as_deref(), Some("C"));

        let direct = connection(vec![ride(
            point("A", "2024-05-01T08:00:00Z"),
            point("B", "2024-05-01T08:10:00Z"),
            "R1",
            None,
        )]);
        let m = compute_metrics(&direct);
        assert!(m.transfer_waits.is_empty());
        assert_eq!(m.min_transfer_minutes, None);
    }

    #[test]
    fn test_min_transfer_first_occurrence_wins_on_tie() {
        let conn = connection(vec![
            ride(
                point("A", "2024-05-01T08:00:00Z"),
                point("B", "2024-05-01T08:10:00Z"),
                "R1",
                None,
            ),
            ride(
                point("B", "2024-05-01T08:15:00Z"),
                point("C", "2024-05-01T08:30:00Z"),
                "R2",
                None,
            ),
            ride(
                point("C", "2024-05-01T08:35:00Z"),
                point("D", "2024-05-01T08:50:00Z"),
                "R3",
                None,
            ),
        ]);
        let m = compute_metrics(&conn);
        assert_eq!(m.transfer_waits, vec![5, 5]);
        assert_eq!(m.min_transfer_station.as_deref(), Some("B"));
    }

    #[test]
    fn test_actual_times_override_planned() {
        let mut late_arrival = point("B", "2024-05-01T08:10:00Z");
        late_arrival.actual = Some("2024-05-01T08:14:00Z".into());
        let conn = connection(vec![
            ride(point("A", "2024-05-01T08:00:00Z"), late_arrival, "R1", None),
            ride(
                point("B", "2024-05-01T08:20:00Z"),
                point("C", "2024-05-01T08:40:00Z"),
                "R2",
                None,
            ),
        ]);
        let m = compute_metrics(&conn);
        assert_eq!(m.transfer_waits, vec![6]);
    }

    #[test]
    fn test_invalid_timestamps_contribute_zero() {
        let conn = connection(vec![
            Leg::Walk {
                from: point("A", "not-a-time"),
                to: point("B", "2024-05-01T08:10:00Z"),
            },
            ride(
                point("B", "2024-05-01T08:12:00Z"),
                point("C", "garbage"),
                "R1",
                None,
            ),
            ride(
                point("C", "2024-05-01T08:40:00Z"),
                point("D", "2024-05-01T08:55:00Z"),
                "R2",
                None,
            ),
        ]);
        let m = compute_metrics(&conn);
        assert_eq!(m.walking_minutes, 0);
        assert_eq!(m.transfer_waits, vec![0]);
    }

    #[test]
    fn test_delay_totals_and_dedup() {
        let conn = connection(vec![
            ride(
                point("A", "2024-05-01T08:00:00Z"),
                point("B", "2024-05-01T08:10:00Z"),
                "S1",
                Some(4),
            ),
            ride(
                point("B", "2024-05-01T08:20:00Z"),
                point("C", "2024-05-01T08:40:00Z"),
                "S1",
                Some(4),
            ),
            ride(
                point("C", "2024-05-01T08:50:00Z"),
                point("D", "2024-05-01T09:10:00Z"),
                "IC 8",
                Some(-2),
            ),
        ]);
        let m = compute_metrics(&conn);
        // Only positive delays count; identical labels collapse.
        assert_eq!(m.delay_minutes, 8);
        assert_eq!(m.delay_alerts, vec!["S1 +4 min"]);
    }

    #[test]
    fn test_delay_label_without_line_name() {
        let conn = connection(vec![ride(
            point("A", "2024-05-01T08:00:00Z"),
            point("B", "2024-05-01T08:10:00Z"),
            "",
            Some(3),
        )]);
        let m = compute_metrics(&conn);
        assert_eq!(m.delay_alerts, vec!["Delay +3 min"]);
    }

    #[test]
    fn test_platform_change_labels() {
        let mut from = point("Bern", "2024-05-01T08:00:00Z");
        from.platform = Some("7!".into());
        let mut to = point("Olten", "2024-05-01T08:26:00Z");
        to.platform = Some("4".into());
        let conn = connection(vec![ride(from, to, "IC 8", None)]);
        let m = compute_metrics(&conn);
        assert_eq!(m.platform_changes, vec!["Bern (Pl. 7)"]);
    }

    #[test]
    fn test_walks_between_rides_do_not_break_transfer_pairing() {
        let conn = connection(vec![
            ride(
                point("A", "2024-05-01T08:00:00Z"),
                point("B", "2024-05-01T08:10:00Z"),
                "R1",
                None,
            ),
            Leg::Walk {
                from: point("B", "2024-05-01T08:10:00Z"),
                to: point("B west", "2024-05-01T08:13:00Z"),
            },
            ride(
                point("B west", "2024-05-01T08:18:00Z"),
                point("C", "2024-05-01T08:30:00Z"),
                "R2",
                None,
            ),
        ]);
        let m = compute_metrics(&conn);
        // The transfer wait spans ride arrival to next ride departure,
        // including the walk in between.
        assert_eq!(m.transfer_waits, vec![8]);
        assert_eq!(m.walking_minutes, 3);
        assert_eq!(m.exposure_minutes, 11);
    }
}
