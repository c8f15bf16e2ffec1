use tracing::{debug, info, instrument};

use crate::config::AppConfig;
use crate::error::Result;
use crate::mapping::aggregate::{aggregate_day, per_capita};
use crate::mapping::assemble::{MapRequest, Palette, assemble_map};
use crate::mapping::color::Rgb;
use crate::mapping::detect::detect_province_field;
use crate::mapping::types::{ColoredMap, KeyedValues, MapKind};
use crate::names::ProvinceAliases;
use crate::parser::{self, GeometryTable, PopulationRow, TripTable};

/// Configuration plus everything derived from it once per run.
///
/// Datasets are loaded per request and never cached here.
#[derive(Debug, Clone)]
pub struct MapContext {
    pub config: AppConfig,
    pub aliases: ProvinceAliases,
    highlight: Rgb,
}

impl MapContext {
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let aliases = config.province_aliases()?;
        let highlight = config.color.highlight_color()?;
        debug!(aliases = aliases.len(), "Province aliases ready");
        Ok(Self {
            config,
            aliases,
            highlight,
        })
    }

    /// The requested sensitivity, or `[color] sensitivity` when none was given.
    pub fn sensitivity_or_default(&self, requested: Option<f64>) -> f64 {
        requested.unwrap_or(self.config.color.sensitivity)
    }

    pub fn load_geometry(&self) -> Result<GeometryTable> {
        parser::load_geometry(&self.config.paths.geometry_path())
    }

    pub fn load_trips(&self, province: &str, month: u32) -> Result<TripTable> {
        let path = self.config.paths.trips_path(province, month);
        parser::load_trips(&path, &self.config.columns)
    }

    pub fn load_population(&self) -> Result<Vec<PopulationRow>> {
        parser::load_population(&self.config.paths.population_path(), &self.config.columns)
    }

    fn palette(&self, kind: MapKind) -> Palette {
        let ramp = match kind {
            MapKind::Trips => self.config.color.absolute_ramp(),
            MapKind::Relative => self.config.color.relative_ramp(),
        };
        Palette {
            ramp,
            highlight: self.highlight,
        }
    }

    /// Trip-volume map for one day: aggregate, detect the join field, join
    /// and color.
    #[instrument(skip_all, fields(subject = %request.subject, day = request.day, month = request.month))]
    pub fn trips_map(
        &self,
        geometry: &GeometryTable,
        trips: &TripTable,
        request: &MapRequest,
    ) -> Result<ColoredMap> {
        request.validate()?;
        let aggregate = aggregate_day(trips, request.day, &self.aliases)?;
        let detection = detect_province_field(geometry, &aggregate.keys(), &self.aliases)?;
        let request = MapRequest {
            kind: MapKind::Trips,
            ..request.clone()
        };
        assemble_map(
            geometry,
            detection,
            &aggregate,
            &request,
            &self.palette(MapKind::Trips),
            &self.aliases,
        )
    }

    /// Per-capita map for one day.
    #[instrument(skip_all, fields(subject = %request.subject, day = request.day, month = request.month))]
    pub fn relative_map(
        &self,
        geometry: &GeometryTable,
        trips: &TripTable,
        population: &[PopulationRow],
        request: &MapRequest,
    ) -> Result<ColoredMap> {
        request.validate()?;
        let aggregate = aggregate_day(trips, request.day, &self.aliases)?;
        let rates = per_capita(
            &aggregate,
            population,
            &self.config.population.exclude,
            self.config.population.per,
            &self.aliases,
        );
        let detection = detect_province_field(geometry, &rates.keys(), &self.aliases)?;
        let request = MapRequest {
            kind: MapKind::Relative,
            ..request.clone()
        };
        assemble_map(
            geometry,
            detection,
            &rates,
            &request,
            &self.palette(MapKind::Relative),
            &self.aliases,
        )
    }

    /// Loads the inputs of `request` from the data directory and builds its
    /// map. The geometry is returned with it for export.
    pub fn day_map(&self, request: &MapRequest) -> Result<(GeometryTable, ColoredMap)> {
        let geometry = self.load_geometry()?;
        let trips = self.load_trips(&request.subject, request.month)?;

        let map = match request.kind {
            MapKind::Trips => self.trips_map(&geometry, &trips, request)?,
            MapKind::Relative => {
                let population = self.load_population()?;
                self.relative_map(&geometry, &trips, &population, request)?
            }
        };

        info!(
            subject = %request.subject,
            day = request.day,
            field = %map.detection.field,
            max_value = map.max_value,
            "Map built"
        );
        Ok((geometry, map))
    }
}
