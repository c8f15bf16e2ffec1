//! Loaders for the three input datasets.
//!
//! * geometry: a GeoJSON `FeatureCollection` with arbitrary properties
//! * trips: CSV with day, origin province and trip count columns
//! * population: CSV with province name and population columns

use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use geojson::{Feature, GeoJson};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::ColumnsConfig;
use crate::error::{MapError, Result};

/// Name of the pseudo-column holding each feature's geometry.
pub const GEOMETRY_COLUMN: &str = "geometry";

pub(crate) static NULL: Value = Value::Null;

/// A geometry dataset seen as a table: one row per feature, one column per
/// property key plus the geometry column.
#[derive(Debug, Clone)]
pub struct GeometryTable {
    columns: Vec<String>,
    features: Vec<Feature>,
}

impl GeometryTable {
    /// Builds the table from features; columns are property keys in order
    /// of first appearance, followed by [`GEOMETRY_COLUMN`].
    pub fn from_features(features: Vec<Feature>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for feature in &features {
            if let Some(props) = &feature.properties {
                for key in props.keys() {
                    if !columns.iter().any(|c| c == key) {
                        columns.push(key.clone());
                    }
                }
            }
        }
        if !columns.iter().any(|c| c.eq_ignore_ascii_case(GEOMETRY_COLUMN)) {
            columns.push(GEOMETRY_COLUMN.to_string());
        }

        Self { columns, features }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Columns other than the geometry.
    pub fn attribute_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .map(String::as_str)
            .filter(|c| !c.eq_ignore_ascii_case(GEOMETRY_COLUMN))
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Values of `column` row by row; a missing property reads as `null`.
    pub fn values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.features
            .iter()
            .map(move |f| property(f, column).unwrap_or(&NULL))
    }

    /// A column is textual when it holds at least one string and every
    /// non-null value is a string.
    pub fn is_text_column(&self, column: &str) -> bool {
        let mut any_text = false;
        for value in self.values(column) {
            match value {
                Value::Null => {}
                Value::String(_) => any_text = true,
                _ => return false,
            }
        }
        any_text
    }

    /// Number of distinct non-null values in `column`.
    pub fn distinct_count(&self, column: &str) -> usize {
        self.values(column)
            .filter(|v| !v.is_null())
            .map(Value::to_string)
            .collect::<BTreeSet<_>>()
            .len()
    }
}

pub(crate) fn property<'a>(feature: &'a Feature, column: &str) -> Option<&'a Value> {
    feature.properties.as_ref().and_then(|p| p.get(column))
}

/// Reads a GeoJSON `FeatureCollection` from disk.
pub fn load_geometry(path: &Path) -> Result<GeometryTable> {
    ensure_exists(path)?;
    let reader = BufReader::new(File::open(path)?);
    let geojson = GeoJson::from_reader(reader)?;
    let table = geometry_from_geojson(geojson)?;
    if table.is_empty() {
        warn!(path = %path.display(), "Geometry file has no features");
    }
    debug!(path = %path.display(), features = table.len(), columns = ?table.columns(), "Loaded geometry");
    Ok(table)
}

/// Parses a GeoJSON document held in memory.
pub fn parse_geometry(text: &str) -> Result<GeometryTable> {
    geometry_from_geojson(text.parse::<GeoJson>()?)
}

fn geometry_from_geojson(geojson: GeoJson) -> Result<GeometryTable> {
    match geojson {
        GeoJson::FeatureCollection(fc) => Ok(GeometryTable::from_features(fc.features)),
        GeoJson::Feature(_) => Err(MapError::InvalidGeometry {
            message: "expected a FeatureCollection, found a single Feature".to_string(),
        }),
        GeoJson::Geometry(_) => Err(MapError::InvalidGeometry {
            message: "expected a FeatureCollection, found a bare Geometry".to_string(),
        }),
    }
}

/// One row of the trip dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct TripRow {
    pub day: u32,
    pub origin: String,
    pub trips: f64,
}

/// All trip rows of one province and month.
#[derive(Debug, Clone, Default)]
pub struct TripTable {
    pub rows: Vec<TripRow>,
}

impl TripTable {
    pub fn new(rows: Vec<TripRow>) -> Self {
        Self { rows }
    }

    /// Sorted distinct days present in the table.
    pub fn days(&self) -> Vec<u32> {
        self.rows
            .iter()
            .map(|r| r.day)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn rows_for_day(&self, day: u32) -> impl Iterator<Item = &TripRow> {
        self.rows.iter().filter(move |r| r.day == day)
    }
}

/// Reads a trip CSV. Rows with an empty day are skipped and an empty trip
/// count reads as 0.
pub fn load_trips(path: &Path, columns: &ColumnsConfig) -> Result<TripTable> {
    ensure_exists(path)?;
    let mut rdr = csv::Reader::from_reader(BufReader::new(File::open(path)?));
    let headers = rdr.headers()?.clone();

    let day_idx = column_index(&headers, &columns.day, path)?;
    let origin_idx = column_index(&headers, &columns.origin, path)?;
    let trips_idx = column_index(&headers, &columns.trips, path)?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());
        let cell = |idx: usize| record.get(idx).unwrap_or("").trim();

        let day_raw = cell(day_idx);
        if day_raw.is_empty() {
            continue;
        }
        let day = parse_day(day_raw).ok_or_else(|| MapError::InvalidValue {
            path: path.to_path_buf(),
            line,
            column: columns.day.clone(),
            value: day_raw.to_string(),
        })?;

        let trips = parse_number(cell(trips_idx)).ok_or_else(|| MapError::InvalidValue {
            path: path.to_path_buf(),
            line,
            column: columns.trips.clone(),
            value: cell(trips_idx).to_string(),
        })?;

        rows.push(TripRow {
            day,
            origin: cell(origin_idx).to_string(),
            trips,
        });
    }

    debug!(path = %path.display(), rows = rows.len(), "Loaded trips");
    Ok(TripTable::new(rows))
}

/// One row of the population dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationRow {
    pub province: String,
    pub population: f64,
}

/// Reads a population CSV. An empty population reads as 0.
pub fn load_population(path: &Path, columns: &ColumnsConfig) -> Result<Vec<PopulationRow>> {
    ensure_exists(path)?;
    let mut rdr = csv::Reader::from_reader(BufReader::new(File::open(path)?));
    let headers = rdr.headers()?.clone();

    let name_idx = column_index(&headers, &columns.population_name, path)?;
    let value_idx = column_index(&headers, &columns.population_value, path)?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let raw = record.get(value_idx).unwrap_or("").trim();
        let population = parse_number(raw).ok_or_else(|| MapError::InvalidValue {
            path: path.to_path_buf(),
            line: record.position().map_or(0, |p| p.line()),
            column: columns.population_value.clone(),
            value: raw.to_string(),
        })?;

        rows.push(PopulationRow {
            province: record.get(name_idx).unwrap_or("").trim().to_string(),
            population,
        });
    }

    debug!(path = %path.display(), rows = rows.len(), "Loaded population");
    Ok(rows)
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(MapError::MissingFile {
            path: path.to_path_buf(),
        })
    }
}

fn column_index(headers: &csv::StringRecord, column: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| MapError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        })
}

/// Accepts `7` as well as spreadsheet-style `7.0`.
fn parse_day(raw: &str) -> Option<u32> {
    if let Ok(day) = raw.parse::<u32>() {
        return Some(day);
    }
    let value = raw.parse::<f64>().ok()?;
    (value.fract() == 0.0 && value >= 0.0 && value <= f64::from(u32::MAX)).then_some(value as u32)
}

fn parse_number(raw: &str) -> Option<f64> {
    if raw.is_empty() {
        return Some(0.0);
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Builds a property map from `(key, value)` pairs.
pub fn properties<I, K>(pairs: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
