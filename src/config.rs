//! Runtime configuration, read from a TOML file.
//!
//! Every section has defaults matching the usual Spanish datasets, so an
//! absent file or a partial file is fine:
//!
//! ```toml
//! [paths]
//! data_dir = "datos"
//! results_dir = "resultados"
//!
//! [color]
//! sensitivity = 4
//!
//! [aliases]
//! "Valencia/València" = "valencia"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{MapError, Result};
use crate::mapping::color::{ColorRamp, Rgb};
use crate::names::ProvinceAliases;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub columns: ColumnsConfig,
    pub color: ColorConfig,
    pub population: PopulationConfig,
    /// Extra name equivalences layered over the built-in table.
    pub aliases: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub results_dir: PathBuf,
    /// Relative paths resolve against `data_dir`.
    pub geometry_file: PathBuf,
    pub population_file: PathBuf,
    pub aliases_file: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("datos"),
            results_dir: PathBuf::from("resultados"),
            geometry_file: PathBuf::from("georef-spain-provincia.geojson"),
            population_file: PathBuf::from("poblaciones_provincias.csv"),
            aliases_file: None,
        }
    }
}

impl PathsConfig {
    pub fn geometry_path(&self) -> PathBuf {
        self.data_dir.join(&self.geometry_file)
    }

    pub fn population_path(&self) -> PathBuf {
        self.data_dir.join(&self.population_file)
    }

    /// Trip file of a province for a month: `<data_dir>/<province>-<MM>.csv`.
    pub fn trips_path(&self, province: &str, month: u32) -> PathBuf {
        self.data_dir
            .join(format!("{}-{:02}.csv", province.trim().to_lowercase(), month))
    }
}

/// Column names of the tabular inputs.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ColumnsConfig {
    pub day: String,
    pub origin: String,
    pub trips: String,
    pub population_name: String,
    pub population_value: String,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            day: "dia".to_string(),
            origin: "provincia origen".to_string(),
            trips: "viajes".to_string(),
            population_name: "provincia".to_string(),
            population_value: "población".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ColorConfig {
    pub dead_zone: f64,
    pub rg_span: u8,
    pub absolute_blue_base: u8,
    pub absolute_blue_span: u8,
    pub relative_blue_base: u8,
    pub relative_blue_span: u8,
    pub highlight: String,
    pub sensitivity: f64,
    pub clamp: bool,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            dead_zone: 90.0,
            rg_span: 255,
            absolute_blue_base: 255,
            absolute_blue_span: 140,
            relative_blue_base: 139,
            relative_blue_span: 139,
            highlight: "#66f26a".to_string(),
            sensitivity: 3.0,
            clamp: true,
        }
    }
}

impl ColorConfig {
    /// Ramp for absolute trip volumes.
    pub fn absolute_ramp(&self) -> ColorRamp {
        ColorRamp {
            dead_zone: Some(self.dead_zone),
            rg_span: self.rg_span,
            blue_base: self.absolute_blue_base,
            blue_span: self.absolute_blue_span,
            clamp: self.clamp,
        }
    }

    /// Ramp for trips per capita.
    pub fn relative_ramp(&self) -> ColorRamp {
        ColorRamp {
            dead_zone: None,
            rg_span: self.rg_span,
            blue_base: self.relative_blue_base,
            blue_span: self.relative_blue_span,
            clamp: self.clamp,
        }
    }

    pub fn highlight_color(&self) -> Result<Rgb> {
        self.highlight.parse()
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PopulationConfig {
    /// Canonical keys dropped from the population table.
    pub exclude: Vec<String>,
    /// Rates are expressed per this many inhabitants.
    pub per: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            exclude: vec![
                "portugal".to_string(),
                "france".to_string(),
                "francia".to_string(),
            ],
            per: 1000.0,
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `path` if it exists, otherwise falls back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            info!(path = %path.display(), "Loading configuration");
            Self::load_from_file(path)
        } else {
            debug!(path = %path.display(), "No configuration file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.color.sensitivity > 0.0) {
            return Err(MapError::invalid_parameter(
                "color.sensitivity",
                "must be a positive number",
            ));
        }
        if !(self.population.per > 0.0) {
            return Err(MapError::invalid_parameter(
                "population.per",
                "must be a positive number",
            ));
        }
        self.color.highlight_color()?;
        Ok(())
    }

    /// Built-in equivalences, then the aliases file, then inline entries.
    pub fn province_aliases(&self) -> Result<ProvinceAliases> {
        let mut aliases = match &self.paths.aliases_file {
            Some(file) => ProvinceAliases::load(&self.paths.data_dir.join(file))?,
            None => ProvinceAliases::default(),
        };
        aliases.extend(&self.aliases);
        Ok(aliases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.columns.origin, "provincia origen");
        assert_eq!(config.color.dead_zone, 90.0);
        assert_eq!(config.color.absolute_blue_span, 140);
        assert_eq!(config.color.relative_blue_base, 139);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [paths]
            data_dir = "/srv/movilidad"

            [color]
            sensitivity = 5

            [aliases]
            "Illes Balears" = "baleares"
            "#,
        )
        .unwrap();

        assert_eq!(config.paths.data_dir, PathBuf::from("/srv/movilidad"));
        assert_eq!(config.paths.results_dir, PathBuf::from("resultados"));
        assert_eq!(config.color.sensitivity, 5.0);
        assert_eq!(config.color.dead_zone, 90.0);

        let aliases = config.province_aliases().unwrap();
        assert_eq!(aliases.standardize("Illes Balears").as_str(), "baleares");
        assert_eq!(aliases.standardize("Castelló").as_str(), "castellon");
    }

    #[test]
    fn test_trips_path() {
        let paths = PathsConfig::default();
        assert_eq!(
            paths.trips_path("Valencia", 3),
            PathBuf::from("datos").join("valencia-03.csv")
        );
    }

    #[test]
    fn test_rejects_non_positive_sensitivity() {
        let mut config = AppConfig::default();
        config.color.sensitivity = 0.0;
        assert!(matches!(
            config.validate(),
            Err(MapError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_highlight() {
        let mut config = AppConfig::default();
        config.color.highlight = "green".to_string();
        assert!(config.validate().is_err());
    }
}
