//! Output formatting and persistence for built maps.
//!
//! Supports pretty-printing, colored GeoJSON, JSON bundles (optionally
//! gzipped) and the CSV summary log.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use geojson::{Feature, FeatureCollection};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::Result;
use crate::mapping::types::{ColoredMap, MapKind};
use crate::parser::{GeometryTable, properties};
use crate::stats::MapSummary;

/// Property added to every feature with its canonical province key.
pub const KEY_PROPERTY: &str = "prov_std";
/// Property added to every feature with its `#rrggbb` fill.
pub const FILL_PROPERTY: &str = "fill";

/// Logs a map summary using Rust's debug pretty-print format.
pub fn print_pretty(summary: &MapSummary) {
    debug!("{:#?}", summary);
}

/// Logs any serializable value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Appends a [`MapSummary`] record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_summary(path: &Path, summary: &MapSummary) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(summary)?;
    writer.flush()?;

    Ok(())
}

/// The geometry features with the map's join key, value and fill added to
/// their properties.
///
/// Trip maps carry the value as `viajes`; relative maps carry it as
/// `relativo` next to the four-decimal `label`.
pub fn colored_features(table: &GeometryTable, map: &ColoredMap) -> FeatureCollection {
    let value_property = match map.kind {
        MapKind::Trips => "viajes",
        MapKind::Relative => "relativo",
    };

    let features: Vec<Feature> = map
        .features
        .iter()
        .filter_map(|fill| {
            let mut feature = table.features().get(fill.index)?.clone();
            let mut props = feature.properties.take().unwrap_or_default();
            props.extend(properties([
                (KEY_PROPERTY, Value::from(fill.key.as_str())),
                (value_property, Value::from(fill.value)),
                (FILL_PROPERTY, Value::from(fill.fill.to_string())),
                ("highlighted", Value::from(fill.highlighted)),
            ]));
            if let Some(label) = &fill.label {
                props.insert("label".to_string(), Value::from(label.as_str()));
            }
            feature.properties = Some(props);
            Some(feature)
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Writes the colored features of `map` as a GeoJSON FeatureCollection.
pub fn write_geojson(path: &Path, table: &GeometryTable, map: &ColoredMap) -> Result<()> {
    let collection = colored_features(table, map);
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(writer, &collection)?;
    info!(path = %path.display(), features = collection.features.len(), "GeoJSON written");
    Ok(())
}

/// Writes `value` as JSON, gzip-compressed when `gzip` is set.
pub fn write_json<T: Serialize>(path: &Path, value: &T, gzip: bool) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    if gzip {
        let mut encoder = GzEncoder::new(file, Compression::default());
        serde_json::to_writer(&mut encoder, value)?;
        encoder.finish()?.flush()?;
    } else {
        let mut file = file;
        serde_json::to_writer(&mut file, value)?;
        file.flush()?;
    }
    info!(path = %path.display(), gzip, "JSON written");
    Ok(())
}
