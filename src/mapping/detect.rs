use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{MapError, Result};
use crate::names::{CanonicalKey, ProvinceAliases};
use crate::parser::GeometryTable;

/// How the join field was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// The column whose standardized values matched the most keys.
    KeyMatches,
    /// No column matched; the text column with the most distinct values.
    DistinctValues,
}

/// The attribute column chosen to identify provinces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub field: String,
    /// Key matches for [`DetectionMethod::KeyMatches`], distinct values for
    /// [`DetectionMethod::DistinctValues`].
    pub score: usize,
    pub method: DetectionMethod,
}

/// Counts rows of `column` whose standardized value is one of `keys`.
///
/// Empty values never match.
pub fn count_matches(
    table: &GeometryTable,
    column: &str,
    keys: &BTreeSet<CanonicalKey>,
    aliases: &ProvinceAliases,
) -> usize {
    table
        .values(column)
        .map(|v| aliases.standardize_value(v))
        .filter(|key| !key.is_empty() && keys.contains(key))
        .count()
}

/// Finds the geometry column that names provinces.
///
/// Every non-geometry column is standardized value by value and scored by
/// how many rows land in `keys`; the first column reaching the best score
/// wins. Without any match, the text column with the most distinct values
/// is used instead. A table with no text column at all fails with
/// [`MapError::DetectionFailure`].
pub fn detect_province_field(
    table: &GeometryTable,
    keys: &BTreeSet<CanonicalKey>,
    aliases: &ProvinceAliases,
) -> Result<Detection> {
    let mut best: Option<(&str, usize)> = None;

    for column in table.attribute_columns() {
        let matches = count_matches(table, column, keys, aliases);
        debug!(column, matches, "Scored candidate field");
        if matches > best.map_or(0, |(_, m)| m) {
            best = Some((column, matches));
        }
    }

    if let Some((field, matches)) = best {
        info!(field, matches, "Detected province field");
        return Ok(Detection {
            field: field.to_string(),
            score: matches,
            method: DetectionMethod::KeyMatches,
        });
    }

    let mut fallback: Option<(&str, usize)> = None;
    for column in table.attribute_columns() {
        if !table.is_text_column(column) {
            continue;
        }
        let distinct = table.distinct_count(column);
        if fallback.is_none_or(|(_, d)| distinct > d) {
            fallback = Some((column, distinct));
        }
    }

    match fallback {
        Some((field, distinct)) => {
            warn!(field, distinct, "No field matched any province, falling back to most distinct text field");
            Ok(Detection {
                field: field.to_string(),
                score: distinct,
                method: DetectionMethod::DistinctValues,
            })
        }
        None => Err(MapError::DetectionFailure {
            columns: table.columns().to_vec(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_geometry;

    fn keys(names: &[&str]) -> BTreeSet<CanonicalKey> {
        let aliases = ProvinceAliases::default();
        names.iter().map(|n| aliases.standardize(n)).collect()
    }

    fn collection(features: &[&str]) -> GeometryTable {
        let features: Vec<String> = features
            .iter()
            .map(|props| format!(r#"{{"type": "Feature", "properties": {props}, "geometry": null}}"#))
            .collect();
        parse_geometry(&format!(
            r#"{{"type": "FeatureCollection", "features": [{}]}}"#,
            features.join(",")
        ))
        .unwrap()
    }

    #[test]
    fn test_selects_column_by_match_count() {
        let table = collection(&[
            r#"{"nom_prov": "Alicante/Alacant"}"#,
            r#"{"nom_prov": "Castelló"}"#,
        ]);
        let detection =
            detect_province_field(&table, &keys(&["Alicante", "Castellon"]), &ProvinceAliases::default())
                .unwrap();

        assert_eq!(detection.field, "nom_prov");
        assert_eq!(detection.score, 2);
        assert_eq!(detection.method, DetectionMethod::KeyMatches);
    }

    #[test]
    fn test_highest_count_beats_column_order() {
        let table = collection(&[
            r#"{"capital": "Madrid", "provincia": "Toledo"}"#,
            r#"{"capital": "Sevilla", "provincia": "Madrid"}"#,
            r#"{"capital": "Bilbao", "provincia": "Sevilla"}"#,
        ]);
        let aliases = ProvinceAliases::default();
        let wanted = keys(&["Madrid", "Sevilla", "Toledo"]);

        assert_eq!(count_matches(&table, "capital", &wanted, &aliases), 2);
        assert_eq!(count_matches(&table, "provincia", &wanted, &aliases), 3);
        assert_eq!(detect_province_field(&table, &wanted, &aliases).unwrap().field, "provincia");
    }

    #[test]
    fn test_tie_goes_to_first_column() {
        let table = collection(&[
            r#"{"name_es": "Álava", "name_eu": "Araba"}"#,
            r#"{"name_es": "Madrid", "name_eu": "Madrid"}"#,
        ]);
        let detection =
            detect_province_field(&table, &keys(&["Alava", "Madrid"]), &ProvinceAliases::default())
                .unwrap();
        assert_eq!(detection.field, "name_es");
        assert_eq!(detection.score, 2);
    }

    #[test]
    fn test_numeric_columns_can_match() {
        let table = collection(&[r#"{"code": 28, "label": "x"}"#, r#"{"code": 41, "label": "y"}"#]);
        let detection =
            detect_province_field(&table, &keys(&["28"]), &ProvinceAliases::default()).unwrap();
        assert_eq!(detection.field, "code");
        assert_eq!(detection.score, 1);
    }

    #[test]
    fn test_fallback_to_most_distinct_text_column() {
        let table = collection(&[
            r#"{"id": 1, "region": "Norte", "label": "Uno"}"#,
            r#"{"id": 2, "region": "Norte", "label": "Dos"}"#,
            r#"{"id": 3, "region": "Sur", "label": "Tres"}"#,
        ]);
        let detection =
            detect_province_field(&table, &keys(&["Madrid"]), &ProvinceAliases::default()).unwrap();

        assert_eq!(detection.field, "label");
        assert_eq!(detection.score, 3);
        assert_eq!(detection.method, DetectionMethod::DistinctValues);
    }

    #[test]
    fn test_fails_without_text_columns() {
        let table = collection(&[r#"{"id": 1, "area": 10.5}"#, r#"{"id": 2, "area": 3.0}"#]);
        let err = detect_province_field(&table, &keys(&["Madrid"]), &ProvinceAliases::default())
            .unwrap_err();
        match err {
            MapError::DetectionFailure { columns } => {
                assert_eq!(columns, ["id", "area", "geometry"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_values_never_match() {
        let table = collection(&[r#"{"blank": "", "name": "Madrid"}"#]);
        let mut wanted = keys(&["Madrid"]);
        wanted.insert(CanonicalKey(String::new()));
        let detection =
            detect_province_field(&table, &wanted, &ProvinceAliases::default()).unwrap();
        assert_eq!(detection.field, "name");
    }

    #[test]
    fn test_detection_is_idempotent() {
        let table = collection(&[r#"{"a": "Castelló", "b": "Castellon"}"#]);
        let wanted = keys(&["Castellón"]);
        let aliases = ProvinceAliases::default();
        let first = detect_province_field(&table, &wanted, &aliases).unwrap();
        let second = detect_province_field(&table, &wanted, &aliases).unwrap();
        assert_eq!(first, second);
    }
}
