//! Builds the [`GtfsLookup`] reference table from GTFS routes/trips/agency
//! CSV tables.
//!
//! This runs offline ahead of time, so errors here are deliberately fatal:
//! a missing source or a missing required table aborts the whole build.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{debug, info};
use zip::ZipArchive;

use crate::gtfs::csv::for_each_row;
use crate::gtfs::lookup::{GtfsLookup, RouteInfo};

const ROUTES_TABLE: &str = "routes.txt";
const TRIPS_TABLE: &str = "trips.txt";
const AGENCY_TABLE: &str = "agency.txt";

/// The three raw CSV tables the builder consumes.
#[derive(Debug, Clone)]
pub struct GtfsTables {
    pub routes: String,
    pub trips: String,
    pub agency: String,
}

/// Reads the required tables from a GTFS zip archive or an extracted
/// directory. Remote sources are fetched by the caller and handed over as a
/// local path.
pub fn load_tables(path: &Path) -> Result<GtfsTables> {
    if !path.exists() {
        bail!("GTFS source not found: {}", path.display());
    }

    if path.is_dir() {
        info!(path = %path.display(), "Reading GTFS tables from directory");
        Ok(GtfsTables {
            routes: read_dir_table(path, ROUTES_TABLE)?,
            trips: read_dir_table(path, TRIPS_TABLE)?,
            agency: read_dir_table(path, AGENCY_TABLE)?,
        })
    } else {
        info!(path = %path.display(), "Reading GTFS tables from zip archive");
        let file = File::open(path)
            .with_context(|| format!("opening GTFS archive {}", path.display()))?;
        let mut archive = ZipArchive::new(file)
            .with_context(|| format!("reading GTFS archive {}", path.display()))?;
        Ok(GtfsTables {
            routes: read_zip_table(&mut archive, ROUTES_TABLE)?,
            trips: read_zip_table(&mut archive, TRIPS_TABLE)?,
            agency: read_zip_table(&mut archive, AGENCY_TABLE)?,
        })
    }
}

fn read_dir_table(dir: &Path, table: &str) -> Result<String> {
    let path = dir.join(table);
    if !path.exists() {
        bail!("required GTFS table {} missing from {}", table, dir.display());
    }
    std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
}

fn read_zip_table(archive: &mut ZipArchive<File>, table: &str) -> Result<String> {
    // Feeds sometimes nest the tables one directory deep inside the archive.
    let entry_name = archive
        .file_names()
        .find(|n| *n == table || n.ends_with(&format!("/{table}")))
        .map(str::to_string);

    let Some(entry_name) = entry_name else {
        bail!("required GTFS table {table} missing from archive");
    };

    let mut entry = archive.by_name(&entry_name)?;
    let mut text = String::new();
    entry.read_to_string(&mut text)?;
    Ok(text)
}

/// Column positions resolved from a table's header row.
struct Header {
    columns: HashMap<String, usize>,
}

impl Header {
    fn parse(row: &[String]) -> Self {
        let mut columns = HashMap::new();
        for (idx, name) in row.iter().enumerate() {
            // The first header cell of a table may carry a BOM.
            let name = name.trim_start_matches('\u{feff}').trim();
            columns.insert(name.to_string(), idx);
        }
        Self { columns }
    }

    fn has(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    fn field<'a>(&self, row: &'a [String], name: &str) -> Option<&'a str> {
        let idx = *self.columns.get(name)?;
        row.get(idx).map(|s| s.trim())
    }
}

/// Builds the reference lookup from parsed tables. `source` is the literal
/// path or URL recorded for provenance.
pub fn build_lookup(tables: &GtfsTables, source: &str) -> GtfsLookup {
    let mut routes: HashMap<String, RouteInfo> = HashMap::new();
    let mut short_names: HashMap<String, String> = HashMap::new();

    each_data_row(&tables.routes, |header, row| {
        let Some(route_id) = header.field(row, "route_id").filter(|s| !s.is_empty()) else {
            return;
        };

        let short_name = header.field(row, "route_short_name").unwrap_or("");
        let long_name = header.field(row, "route_long_name").unwrap_or("");
        let route_type = header
            .field(row, "route_type")
            .and_then(|s| s.parse::<u32>().ok());
        let agency_id = header
            .field(row, "agency_id")
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        if !short_name.is_empty() {
            short_names
                .entry(short_name.to_string())
                .or_insert_with(|| route_id.to_string());
        }

        routes.insert(
            route_id.to_string(),
            RouteInfo {
                short_name: short_name.to_string(),
                long_name: long_name.to_string(),
                route_type,
                agency_id,
            },
        );
    });

    let mut trips: HashMap<String, String> = HashMap::new();
    each_data_row(&tables.trips, |header, row| {
        let trip_id = header.field(row, "trip_id").filter(|s| !s.is_empty());
        let route_id = header.field(row, "route_id").filter(|s| !s.is_empty());
        if let (Some(trip_id), Some(route_id)) = (trip_id, route_id) {
            trips.insert(trip_id.to_string(), route_id.to_string());
        }
    });

    let mut agencies: HashMap<String, String> = HashMap::new();
    // Single-agency feeds may omit the agency_id column entirely. Such rows
    // get a rotating fallback id: each processed name becomes the fallback
    // for the rows after it. Kept bug-compatible with the original feed
    // handling; see DESIGN.md before changing.
    let mut fallback_agency_id = String::from("default");
    each_data_row(&tables.agency, |header, row| {
        let Some(name) = header.field(row, "agency_name").filter(|s| !s.is_empty()) else {
            return;
        };
        let id = if header.has("agency_id") {
            header
                .field(row, "agency_id")
                .filter(|s| !s.is_empty())
                .unwrap_or(&fallback_agency_id)
                .to_string()
        } else {
            fallback_agency_id.clone()
        };
        agencies.insert(id, name.to_string());
        fallback_agency_id = name.to_string();
    });

    let default_agency_id = if agencies.len() == 1 {
        agencies.keys().next().cloned()
    } else {
        None
    };

    debug!(
        routes = routes.len(),
        trips = trips.len(),
        agencies = agencies.len(),
        short_names = short_names.len(),
        "GTFS lookup built"
    );

    GtfsLookup {
        routes,
        trips,
        short_names,
        agencies,
        default_agency_id,
        generated_at: Utc::now(),
        source: source.to_string(),
    }
}

/// Loads and builds in one step. Fatal on any missing input.
pub fn build_from_path(path: &Path) -> Result<GtfsLookup> {
    let tables = load_tables(path)?;
    Ok(build_lookup(&tables, &path.display().to_string()))
}

/// Runs `f` for every non-header row of `table`, with the parsed header.
fn each_data_row(table: &str, mut f: impl FnMut(&Header, &[String])) {
    let mut header: Option<Header> = None;
    for_each_row(table, |row| match &header {
        None => header = Some(Header::parse(row)),
        Some(h) => f(h, row),
    });
}
