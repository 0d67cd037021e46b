//! GTFS reference lookup model and its process-lifetime cache.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Display-relevant route attributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteInfo {
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub long_name: String,
    /// GTFS `route_type`; absent when the source value was not numeric.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_type: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<String>,
}

/// Static reference table mapping carrier identifiers to display names,
/// modes, and operators. Built offline, loaded read-only at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtfsLookup {
    /// route_id → route attributes.
    pub routes: HashMap<String, RouteInfo>,
    /// trip_id → route_id.
    pub trips: HashMap<String, String>,
    /// route_short_name → route_id, first seen wins.
    #[serde(default)]
    pub short_names: HashMap<String, String>,
    /// agency_id → agency name.
    #[serde(default)]
    pub agencies: HashMap<String, String>,
    /// Set only when exactly one agency exists in the feed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_agency_id: Option<String>,
    pub generated_at: DateTime<Utc>,
    /// Path or URL the tables were built from.
    pub source: String,
}

impl GtfsLookup {
    /// Resolves an agency name by id, falling back to the feed's default
    /// agency when the route carries no id.
    pub fn agency_name(&self, agency_id: Option<&str>) -> Option<&str> {
        let id = agency_id.or(self.default_agency_id.as_deref())?;
        self.agencies.get(id).map(String::as_str)
    }
}

/// Memoizing holder for the reference lookup.
///
/// The lookup is loaded at most once per cache lifetime; a missing or
/// unreadable file memoizes as a permanent "no lookup", never an error.
/// Owned and injected by the caller so tests can substitute lookups.
#[derive(Debug, Default)]
pub struct LookupCache {
    state: OnceLock<Option<Arc<GtfsLookup>>>,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache pre-seeded with an in-memory lookup. Test seam.
    pub fn preloaded(lookup: GtfsLookup) -> Self {
        let cache = Self::new();
        let _ = cache.state.set(Some(Arc::new(lookup)));
        cache
    }

    /// Returns the lookup, loading it from `path` on first use.
    pub fn get_or_load(&self, path: &Path) -> Option<Arc<GtfsLookup>> {
        self.state
            .get_or_init(|| match load_lookup(path) {
                Ok(lookup) => {
                    info!(
                        path = %path.display(),
                        routes = lookup.routes.len(),
                        trips = lookup.trips.len(),
                        "GTFS lookup loaded"
                    );
                    Some(Arc::new(lookup))
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "GTFS lookup unavailable, line resolution will use fallbacks"
                    );
                    None
                }
            })
            .clone()
    }

    /// The memoized lookup, if a load has already happened and succeeded.
    pub fn get(&self) -> Option<Arc<GtfsLookup>> {
        self.state.get().cloned().flatten()
    }
}

fn load_lookup(path: &Path) -> anyhow::Result<GtfsLookup> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
