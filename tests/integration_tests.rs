use province_flows::config::AppConfig;
use province_flows::error::MapError;
use province_flows::mapping::{MapContext, MapKind, MapRequest};
use province_flows::output::{append_summary, write_geojson};
use province_flows::progress::{CancelToken, NullProgress};
use province_flows::sequence::{SeriesSpec, compare_sequence, month_sequence};
use province_flows::stats::MapSummary;
use std::env;
use std::fs;
use std::path::PathBuf;

const GEOMETRY: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {"type": "Feature", "properties": {"cod_prov": 12, "nom_prov": "Castelló"},
         "geometry": {"type": "Polygon", "coordinates": [[[-0.5,40],[0.5,40],[0.5,40.8],[-0.5,40.8],[-0.5,40]]]}},
        {"type": "Feature", "properties": {"cod_prov": 3, "nom_prov": "Alicante/Alacant"},
         "geometry": {"type": "Polygon", "coordinates": [[[-1,38],[0,38],[0,38.8],[-1,38.8],[-1,38]]]}},
        {"type": "Feature", "properties": {"cod_prov": 46, "nom_prov": "Valencia"},
         "geometry": {"type": "Polygon", "coordinates": [[[-1,39],[0,39],[0,39.8],[-1,39.8],[-1,39]]]}},
        {"type": "Feature", "properties": {"cod_prov": 28, "nom_prov": "Madrid"},
         "geometry": {"type": "Polygon", "coordinates": [[[-4,40],[-3,40],[-3,40.8],[-4,40.8],[-4,40]]]}}
    ]
}"#;

const CASTELLON_APRIL: &str = "\
dia,provincia origen,viajes
1,Castellón,1090
1,Alicante,590
1,Valencia,40
2,Madrid,300
2,Castellon,100
3,Madrid,10
";

const MADRID_MAY: &str = "\
dia,provincia origen,viajes
2,Madrid,800
3,Toledo,20
3,Madrid,700
4,Madrid,600
";

const POPULATION: &str = "\
provincia,población
Castellón,100000
Alicante,200000
Valencia,400000
Madrid,1000000
Portugal,10
";

/// Writes the fixture datasets into a fresh directory under the temp dir.
fn fixture_dir(name: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("province_flows_it_{name}"));
    let _ = fs::remove_dir_all(&dir); // clean up any prior run
    fs::create_dir_all(dir.join("datos")).unwrap();

    fs::write(dir.join("datos/georef-spain-provincia.geojson"), GEOMETRY).unwrap();
    fs::write(dir.join("datos/castellon-04.csv"), CASTELLON_APRIL).unwrap();
    fs::write(dir.join("datos/madrid-05.csv"), MADRID_MAY).unwrap();
    fs::write(dir.join("datos/poblaciones_provincias.csv"), POPULATION).unwrap();
    dir
}

fn context(dir: &PathBuf) -> MapContext {
    let mut config = AppConfig::default();
    config.paths.data_dir = dir.join("datos");
    config.paths.results_dir = dir.join("resultados");
    MapContext::new(config).unwrap()
}

fn request(kind: MapKind, subject: &str, day: u32) -> MapRequest {
    MapRequest {
        kind,
        subject: subject.to_string(),
        day,
        month: 4,
        sensitivity: 1.0,
        zoom: 6,
    }
}

#[test]
fn test_full_day_pipeline() {
    let dir = fixture_dir("day");
    let ctx = context(&dir);

    let (geometry, map) = ctx.day_map(&request(MapKind::Trips, "Castellon", 1)).unwrap();

    assert_eq!(map.detection.field, "nom_prov");
    assert_eq!(map.detection.score, 3);
    assert_eq!(map.max_value, 1090.0);

    let fills: Vec<String> = map.features.iter().map(|f| f.fill.to_string()).collect();
    assert_eq!(fills, ["#66f26a", "#8080b9", "#ffffff", "#ffffff"]);
    assert_eq!(map.highlighted().map(|f| f.name.as_str()), Some("Castelló"));
    assert!(map.view.center.is_some());

    // export the map and its summary row
    let results = &ctx.config.paths.results_dir;
    fs::create_dir_all(results).unwrap();
    write_geojson(&results.join("day.geojson"), &geometry, &map).unwrap();
    append_summary(&results.join("summary.csv"), &MapSummary::from_map(&map)).unwrap();

    let geojson = fs::read_to_string(results.join("day.geojson")).unwrap();
    assert!(geojson.contains("\"prov_std\":\"castellon\""));
    let summary = fs::read_to_string(results.join("summary.csv")).unwrap();
    assert_eq!(summary.lines().count(), 2);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_relative_pipeline() {
    let dir = fixture_dir("relative");
    let ctx = context(&dir);

    let (_, map) = ctx.day_map(&request(MapKind::Relative, "Castellon", 1)).unwrap();

    assert_eq!(map.kind, MapKind::Relative);
    assert!((map.max_value - 10.9).abs() < 1e-9);
    let labels: Vec<&str> = map.features.iter().filter_map(|f| f.label.as_deref()).collect();
    assert_eq!(labels, ["10.9000", "2.9500", "0.1000", "0.0000"]);
    assert!(map.features[0].highlighted);
    assert_eq!(map.features[3].fill.to_string(), "#ffffff");

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_missing_trip_file() {
    let dir = fixture_dir("missing");
    let ctx = context(&dir);

    let result = ctx.day_map(&request(MapKind::Trips, "Teruel", 1));
    assert!(matches!(result, Err(MapError::MissingFile { .. })));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_day_without_rows() {
    let dir = fixture_dir("empty_day");
    let ctx = context(&dir);

    let result = ctx.day_map(&request(MapKind::Trips, "Castellon", 17));
    assert!(matches!(result, Err(MapError::EmptyData { day: 17 })));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_month_sequence() {
    let dir = fixture_dir("month");
    let ctx = context(&dir);
    let series = SeriesSpec {
        subject: "Castellon".to_string(),
        month: 4,
        sensitivity: 3.0,
    };

    let bundle =
        month_sequence(&ctx, &series, 6, &NullProgress, &CancelToken::new()).unwrap();

    assert_eq!(bundle.days, [1, 2, 3]);
    assert_eq!(bundle.maps.len(), 3);
    assert_eq!(bundle.maps[1].max_value, 300.0);
    assert!(bundle.maps.iter().all(|m| m.features[0].highlighted));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_compare_sequence() {
    let dir = fixture_dir("compare");
    let ctx = context(&dir);
    let castellon = SeriesSpec {
        subject: "Castellon".to_string(),
        month: 4,
        sensitivity: 3.0,
    };
    let madrid = SeriesSpec {
        subject: "Madrid".to_string(),
        month: 5,
        sensitivity: 2.0,
    };

    let bundle =
        compare_sequence(&ctx, &castellon, &madrid, 6, &NullProgress, &CancelToken::new())
            .unwrap();

    let days: Vec<u32> = bundle.days.iter().map(|d| d.day).collect();
    assert_eq!(days, [2, 3]);
    assert_eq!(bundle.days[0].a.month, 4);
    assert_eq!(bundle.days[0].b.month, 5);
    assert!(bundle.days[1].b.features[3].highlighted);
    assert_eq!(bundle.days[1].b.sensitivity, 2.0);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_config_file_overrides() {
    let dir = fixture_dir("config");
    let config_path = dir.join("province_flows.toml");
    let toml = format!(
        "[paths]\ndata_dir = {:?}\n\n[color]\nhighlight = \"#ff0000\"\nsensitivity = 5\n",
        dir.join("datos").display().to_string()
    );
    fs::write(&config_path, toml).unwrap();

    let config = AppConfig::load_or_default(&config_path).unwrap();
    let ctx = MapContext::new(config).unwrap();
    let may = MapRequest {
        month: 5,
        sensitivity: ctx.sensitivity_or_default(None),
        ..request(MapKind::Trips, "Madrid", 2)
    };
    let (_, map) = ctx.day_map(&may).unwrap();

    assert_eq!(map.sensitivity, 5.0);
    assert_eq!(map.features[3].fill.to_string(), "#ff0000");
    assert!(!map.features[0].highlighted);

    fs::remove_dir_all(&dir).unwrap();
}
