use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::mapping::detect::DetectionMethod;
use crate::mapping::types::{ColoredMap, MapKind};

/// One CSV row describing a built map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapSummary {
    pub generated_at: DateTime<Utc>,
    pub kind: MapKind,
    pub subject: String,
    pub month: u32,
    pub day: u32,
    pub sensitivity: f64,

    // join
    pub field: String,
    pub method: DetectionMethod,
    pub score: usize,

    // coverage
    pub features: usize,
    pub matched: usize,
    pub matched_pct: f64,
    pub max_value: f64,
    pub highlighted: Option<String>,
}

impl MapSummary {
    pub fn from_map(map: &ColoredMap) -> Self {
        let features = map.features.len();
        let matched = map.matched();

        MapSummary {
            generated_at: map.generated_at,
            kind: map.kind,
            subject: map.subject.clone(),
            month: map.month,
            day: map.day,
            sensitivity: map.sensitivity,
            field: map.detection.field.clone(),
            method: map.detection.method,
            score: map.detection.score,
            features,
            matched,
            matched_pct: Self::pct(matched, features),
            max_value: map.max_value,
            highlighted: map.highlighted().map(|f| f.name.clone()),
        }
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::color::Rgb;
    use crate::mapping::detect::Detection;
    use crate::mapping::types::{FeatureFill, MapView};
    use crate::names::ProvinceAliases;

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(MapSummary::pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(MapSummary::pct(50, 100), 50.0);
        assert_eq!(MapSummary::pct(1, 4), 25.0);
    }

    #[test]
    fn test_from_map() {
        let map = create_map();
        let summary = MapSummary::from_map(&map);

        assert_eq!(summary.kind, MapKind::Trips);
        assert_eq!(summary.field, "nom_prov");
        assert_eq!(summary.method, DetectionMethod::KeyMatches);
        assert_eq!(summary.features, 2);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.matched_pct, 50.0);
        assert_eq!(summary.highlighted.as_deref(), Some("Teruel"));
    }

    // Helper functions for tests
    fn create_map() -> ColoredMap {
        let aliases = ProvinceAliases::default();
        let fill = |index: usize, name: &str, value: f64, highlighted: bool| FeatureFill {
            index,
            name: name.to_string(),
            key: aliases.standardize(name),
            value,
            matched: value > 0.0,
            label: None,
            fill: Rgb::WHITE,
            highlighted,
        };

        ColoredMap {
            kind: MapKind::Trips,
            subject: "Teruel".to_string(),
            day: 2,
            month: 4,
            sensitivity: 3.0,
            detection: Detection {
                field: "nom_prov".to_string(),
                score: 1,
                method: DetectionMethod::KeyMatches,
            },
            max_value: 40.0,
            view: MapView {
                center: None,
                zoom: 6,
            },
            features: vec![fill(0, "Madrid", 40.0, false), fill(1, "Teruel", 0.0, true)],
            generated_at: Utc::now(),
        }
    }
}
