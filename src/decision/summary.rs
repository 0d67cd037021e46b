//! Assembles the final decision summary: ranked options, recommendation,
//! and the human-readable narrative.

use crate::connection::Connection;
use crate::decision::ranking::rank_connections;
use crate::decision::types::{
    DataCoverage, DecisionOption, DecisionQuery, DecisionSummary, QueryMode,
};
use crate::timefmt::format_hm;

const NO_CONNECTIONS_LINE: &str = "No connections found for this request.";

/// Number of options rendered in the narrative.
const NARRATED_OPTIONS: usize = 3;

/// Runs the full decision pipeline over the given connections and builds the
/// response object. Pure: identical inputs produce byte-identical narratives.
pub fn compose_summary(query: &DecisionQuery, connections: &[Connection]) -> DecisionSummary {
    let ranked = rank_connections(query, connections);
    let narrative = render_narrative(query, &ranked.options, ranked.constraint_note.as_deref());

    DecisionSummary {
        query: query.clone(),
        recommended_option_id: ranked.options.first().map(|o| o.connection.id.clone()),
        constraint_note: ranked.constraint_note,
        narrative,
        options: ranked.options,
        data_coverage: DataCoverage::CURRENT,
    }
}

fn render_narrative(
    query: &DecisionQuery,
    options: &[DecisionOption],
    constraint_note: Option<&str>,
) -> String {
    if options.is_empty() {
        return NO_CONNECTIONS_LINE.to_string();
    }

    let mut lines = vec![constraints_line(query)];

    if let Some(note) = constraint_note {
        lines.push(note.to_string());
    }

    for (idx, option) in options.iter().take(NARRATED_OPTIONS).enumerate() {
        lines.push(option_line(option, idx == 0));
    }

    if let Some(line) = suggested_departure_line(query, &options[0]) {
        lines.push(line);
    }

    let top = &options[0];
    let mut alerts: Vec<&str> = Vec::new();
    alerts.extend(top.metrics.delay_alerts.iter().map(String::as_str));
    alerts.extend(top.metrics.platform_changes.iter().map(String::as_str));
    if !alerts.is_empty() {
        lines.push(format!("Live alerts: {}", alerts.join("; ")));
    }

    lines.join("\n")
}

/// First narrative line: the active constraints, joined by `; `.
fn constraints_line(query: &DecisionQuery) -> String {
    let mut parts: Vec<String> = Vec::new();

    match query.mode {
        QueryMode::ArriveBy => {
            let mut part = format!("arrive by {}", format_hm(&query.target_time));
            if let Some(buffer) = query.buffer_minutes.filter(|b| *b > 0) {
                part.push_str(&format!(" with {buffer} min buffer"));
            }
            parts.push(part);
        }
        QueryMode::DepartAt => {
            let mut part = format!("depart at {}", format_hm(&query.target_time));
            if let Some(buffer) = query.buffer_minutes.filter(|b| *b > 0) {
                part.push_str(&format!(", leave {buffer} min early"));
            }
            parts.push(part);
        }
    }

    if let Some(max) = query.max_transfers {
        parts.push(format!("max {max} transfers"));
    }
    if query.prefer_low_walking {
        parts.push("low walking".to_string());
    }
    if query.minimize_outdoor {
        parts.push("minimize outdoor time".to_string());
    }

    format!("Constraints: {}", parts.join("; "))
}

fn option_line(option: &DecisionOption, best: bool) -> String {
    let conn = &option.connection;
    let metrics = &option.metrics;

    let mut line = format!(
        "{}{}: {} -> {}, {} min, ",
        option.label,
        if best { " (best)" } else { "" },
        format_hm(&conn.departure),
        format_hm(&conn.arrival),
        conn.duration_minutes,
    );

    if conn.transfers_count == 0 {
        line.push_str("direct");
    } else {
        line.push_str(&format!(
            "{} transfer{}",
            conn.transfers_count,
            if conn.transfers_count == 1 { "" } else { "s" }
        ));
        if let Some(min) = metrics.min_transfer_minutes {
            line.push_str(&format!(" (min {min} min)"));
        }
    }

    line.push_str(&format!(
        ", risk {} ({:.2})",
        option.risk_level.as_str(),
        option.risk_score
    ));

    if !option.reasons.is_empty() {
        line.push_str(&format!(" ({})", option.reasons.join("; ")));
    }

    if let Some(buffer) = option.arrival_buffer_minutes {
        line.push_str(&format!(" - arrives {buffer} min before target"));
    } else if let Some(leave_by) = &option.leave_by {
        line.push_str(&format!(" - leave by {}", format_hm(leave_by)));
    }

    line
}

fn suggested_departure_line(query: &DecisionQuery, top: &DecisionOption) -> Option<String> {
    match query.mode {
        QueryMode::ArriveBy => {
            let mut line = format!(
                "Suggested departure: {}",
                format_hm(&top.connection.departure)
            );
            if let Some(buffer) = top.arrival_buffer_minutes.filter(|b| *b > 0) {
                line.push_str(&format!(" (+{buffer} min arrival buffer)"));
            }
            Some(line)
        }
        QueryMode::DepartAt => top
            .leave_by
            .as_deref()
            .map(|t| format!("Leave by {}", format_hm(t))),
    }
}
