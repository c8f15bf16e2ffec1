//! Data types flowing through the map pipeline.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::mapping::color::Rgb;
use crate::mapping::detect::Detection;
use crate::names::CanonicalKey;

/// Values keyed by province that a map can be colored from.
pub trait KeyedValues {
    fn value(&self, key: &CanonicalKey) -> Option<f64>;

    fn keys(&self) -> BTreeSet<CanonicalKey>;
}

/// Total trips per origin province for one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayAggregate {
    pub day: u32,
    pub totals: BTreeMap<CanonicalKey, f64>,
}

impl DayAggregate {
    pub fn volume(&self, key: &CanonicalKey) -> Option<f64> {
        self.totals.get(key).copied()
    }

    pub fn max_volume(&self) -> f64 {
        self.totals.values().copied().fold(0.0, f64::max)
    }
}

impl KeyedValues for DayAggregate {
    fn value(&self, key: &CanonicalKey) -> Option<f64> {
        self.volume(key)
    }

    fn keys(&self) -> BTreeSet<CanonicalKey> {
        self.totals.keys().cloned().collect()
    }
}

/// Trips per capita per origin province for one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateTable {
    pub day: u32,
    pub rates: BTreeMap<CanonicalKey, f64>,
}

impl RateTable {
    pub fn rate(&self, key: &CanonicalKey) -> Option<f64> {
        self.rates.get(key).copied()
    }

    pub fn max_rate(&self) -> f64 {
        self.rates.values().copied().fold(0.0, f64::max)
    }
}

impl KeyedValues for RateTable {
    fn value(&self, key: &CanonicalKey) -> Option<f64> {
        self.rate(key)
    }

    fn keys(&self) -> BTreeSet<CanonicalKey> {
        self.rates.keys().cloned().collect()
    }
}

/// Which quantity a map shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MapKind {
    /// Absolute trip volume.
    Trips,
    /// Trips per capita.
    Relative,
}

/// Fill assigned to one geometry feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureFill {
    /// Index of the feature in the geometry table.
    pub index: usize,
    /// Raw value of the detected province field.
    pub name: String,
    pub key: CanonicalKey,
    /// Joined value, 0 when the province had no data.
    pub value: f64,
    /// Whether the province key was present in the joined values.
    pub matched: bool,
    /// `value` with four decimals, for tooltips of relative maps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub fill: Rgb,
    pub highlighted: bool,
}

/// Where a renderer should center the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapView {
    /// `[lon, lat]`
    pub center: Option<[f64; 2]>,
    pub zoom: u8,
}

/// Per-feature colors for one map, ready for a rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColoredMap {
    pub kind: MapKind,
    pub subject: String,
    pub day: u32,
    pub month: u32,
    pub sensitivity: f64,
    pub detection: Detection,
    pub max_value: f64,
    pub view: MapView,
    pub features: Vec<FeatureFill>,
    pub generated_at: DateTime<Utc>,
}

impl ColoredMap {
    /// Number of features whose province had data.
    pub fn matched(&self) -> usize {
        self.features.iter().filter(|f| f.matched).count()
    }

    pub fn highlighted(&self) -> Option<&FeatureFill> {
        self.features.iter().find(|f| f.highlighted)
    }
}
