use chrono::Utc;
use geo::Centroid;
use geojson::Feature;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{MapError, Result};
use crate::mapping::color::{ColorRamp, Rgb};
use crate::mapping::detect::Detection;
use crate::mapping::types::{ColoredMap, FeatureFill, KeyedValues, MapKind, MapView};
use crate::names::ProvinceAliases;
use crate::parser::{GeometryTable, NULL, property};

/// What a single map shows and for whom.
#[derive(Debug, Clone)]
pub struct MapRequest {
    pub kind: MapKind,
    /// Province under study, free text.
    pub subject: String,
    pub day: u32,
    pub month: u32,
    pub sensitivity: f64,
    pub zoom: u8,
}

impl MapRequest {
    pub fn validate(&self) -> Result<()> {
        if !(self.sensitivity > 0.0) || !self.sensitivity.is_finite() {
            return Err(MapError::invalid_parameter(
                "sensitivity",
                format!("must be a positive number, got {}", self.sensitivity),
            ));
        }
        if !(1..=12).contains(&self.month) {
            return Err(MapError::invalid_parameter(
                "month",
                format!("must be between 1 and 12, got {}", self.month),
            ));
        }
        Ok(())
    }
}

/// Colors used by the assembler.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub ramp: ColorRamp,
    /// Fill of the subject province, overriding the ramp.
    pub highlight: Rgb,
}

/// Joins `values` onto the geometry through the detected field and colors
/// every feature.
///
/// Features without data get a value of 0. The maximum is taken over the
/// joined values. The subject province always gets the highlight color.
#[instrument(skip_all, fields(subject = %request.subject, day = request.day, field = %detection.field))]
pub fn assemble_map<V: KeyedValues>(
    table: &GeometryTable,
    detection: Detection,
    values: &V,
    request: &MapRequest,
    palette: &Palette,
    aliases: &ProvinceAliases,
) -> Result<ColoredMap> {
    request.validate()?;

    let subject = aliases.standardize(&request.subject);

    let joined: Vec<(usize, String, _, Option<f64>)> = table
        .features()
        .iter()
        .enumerate()
        .map(|(index, feature)| {
            let raw = property(feature, &detection.field).unwrap_or(&NULL);
            let key = aliases.standardize_value(raw);
            (index, display_value(raw), key.clone(), values.value(&key))
        })
        .collect();

    let max_value = joined
        .iter()
        .map(|(_, _, _, v)| v.unwrap_or(0.0))
        .fold(0.0, f64::max);

    let features: Vec<FeatureFill> = joined
        .into_iter()
        .map(|(index, name, key, joined)| {
            let value = joined.unwrap_or(0.0);
            let highlighted = !subject.is_empty() && key == subject;
            let fill = if highlighted {
                palette.highlight
            } else {
                palette.ramp.fill_color(Some(value), max_value, request.sensitivity)
            };
            FeatureFill {
                index,
                name,
                key,
                value,
                matched: joined.is_some(),
                label: (request.kind == MapKind::Relative).then(|| format!("{value:.4}")),
                fill,
                highlighted,
            }
        })
        .collect();

    debug!(
        features = features.len(),
        max_value,
        highlighted = features.iter().any(|f| f.highlighted),
        "Assembled map"
    );

    Ok(ColoredMap {
        kind: request.kind,
        subject: request.subject.clone(),
        day: request.day,
        month: request.month,
        sensitivity: request.sensitivity,
        detection,
        max_value,
        view: MapView {
            center: view_center(table.features()),
            zoom: request.zoom,
        },
        features,
        generated_at: Utc::now(),
    })
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Mean of the feature centroids as `[lon, lat]`.
pub fn view_center(features: &[Feature]) -> Option<[f64; 2]> {
    let centroids: Vec<geo::Point<f64>> = features
        .iter()
        .filter_map(|f| f.geometry.as_ref())
        .filter_map(|g| geo::Geometry::<f64>::try_from(g.value.clone()).ok())
        .filter_map(|g| g.centroid())
        .collect();

    if centroids.is_empty() {
        return None;
    }

    let n = centroids.len() as f64;
    let (x, y) = centroids
        .iter()
        .fold((0.0, 0.0), |(x, y), p| (x + p.x(), y + p.y()));
    Some([x / n, y / n])
}
