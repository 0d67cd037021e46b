//! Best-effort resolution of raw carrier line identifiers to display names,
//! transport modes, and operators.
//!
//! Resolution prefers the GTFS reference lookup and falls back to category
//! heuristics when the lookup is absent or has no match. Deterministic and
//! side-effect free: the same inputs always produce the same result.

use serde::{Deserialize, Serialize};

use crate::gtfs::lookup::GtfsLookup;

/// Transport mode labels derived from GTFS route types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Train,
    Bus,
    Tram,
    Metro,
    Ferry,
    CableTram,
    AerialLift,
    Funicular,
    Trolleybus,
    Monorail,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Train => "train",
            TransportMode::Bus => "bus",
            TransportMode::Tram => "tram",
            TransportMode::Metro => "metro",
            TransportMode::Ferry => "ferry",
            TransportMode::CableTram => "cable tram",
            TransportMode::AerialLift => "aerial lift",
            TransportMode::Funicular => "funicular",
            TransportMode::Trolleybus => "trolleybus",
            TransportMode::Monorail => "monorail",
        }
    }
}

/// Maps a GTFS `route_type` to a mode label.
///
/// Extended-type ranges take precedence over the basic enumeration; codes we
/// do not recognize default to train, which is the dominant mode in the feeds
/// this runs against.
pub fn mode_for_route_type(route_type: u32) -> TransportMode {
    match route_type {
        100..=199 => TransportMode::Train,
        700..=799 => TransportMode::Bus,
        0 => TransportMode::Tram,
        1 => TransportMode::Metro,
        2 => TransportMode::Train,
        3 => TransportMode::Bus,
        4 => TransportMode::Ferry,
        5 => TransportMode::CableTram,
        6 => TransportMode::AerialLift,
        7 => TransportMode::Funicular,
        11 => TransportMode::Trolleybus,
        12 => TransportMode::Monorail,
        _ => TransportMode::Train,
    }
}

/// Where a resolution result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineSource {
    /// The GTFS reference table produced the display name.
    Reference,
    /// Heuristics over the raw identifier and category.
    Fallback,
}

/// Result of resolving one raw line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineResolution {
    pub name: String,
    pub mode: Option<TransportMode>,
    pub operator: Option<String>,
    pub source: LineSource,
}

/// Category codes treated as trains by the fallback heuristics.
const TRAIN_CATEGORIES: &[&str] = &[
    "IC", "ICE", "IR", "RE", "R", "S", "SN", "EC", "EN", "NJ", "RJ", "RJX", "TGV", "PE", "EXT",
    "ARZ",
];

/// Resolves a raw line identifier to a display name, mode, and operator.
///
/// `raw` may be blank; `category`/`number` come from the carrier's schedule
/// record; `operator` is the carrier-supplied operator string used when the
/// lookup has no agency for the line; `lookup` is optional and its absence
/// yields fallback-only resolution.
pub fn resolve_line(
    raw: &str,
    category: &str,
    number: &str,
    operator: Option<&str>,
    lookup: Option<&GtfsLookup>,
) -> LineResolution {
    let raw = raw.trim();
    let category = category.trim();
    let number = number.trim();

    let category_number = [category, number]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

    let key = if raw.is_empty() {
        category_number.as_str()
    } else {
        raw
    };

    let mut name = String::new();
    let mut mode: Option<TransportMode> = None;
    let mut resolved_operator: Option<String> = None;
    let mut source = LineSource::Fallback;

    if let Some(lookup) = lookup {
        if !key.is_empty() {
            let route_id = lookup
                .trips
                .get(key)
                .map(String::as_str)
                .or_else(|| lookup.routes.contains_key(key).then_some(key))
                .or_else(|| lookup.short_names.get(key).map(String::as_str));

            if let Some(route_id) = route_id {
                if let Some(route) = lookup.routes.get(route_id) {
                    name = if !route.short_name.is_empty() {
                        route.short_name.clone()
                    } else {
                        route.long_name.clone()
                    };
                    mode = route.route_type.map(mode_for_route_type);
                    resolved_operator = lookup
                        .agency_name(route.agency_id.as_deref())
                        .map(str::to_string);
                    source = LineSource::Reference;
                }
            }
        }
    }

    if mode.is_none() && !category.is_empty() {
        mode = mode_from_category(category);
    }

    let name = if !name.is_empty() {
        name
    } else if !raw.is_empty() {
        raw.to_string()
    } else {
        category_number
    };

    LineResolution {
        name,
        mode,
        operator: resolved_operator.or_else(|| operator.map(str::to_string)),
        source,
    }
}

fn mode_from_category(category: &str) -> Option<TransportMode> {
    let upper = category.to_ascii_uppercase();
    if upper.starts_with('B') {
        Some(TransportMode::Bus)
    } else if upper.contains("TRAM") || upper == "T" {
        Some(TransportMode::Tram)
    } else if TRAIN_CATEGORIES.contains(&upper.as_str()) {
        Some(TransportMode::Train)
    } else {
        None
    }
}
