//! Multi-day runs: a month of daily maps and side-by-side comparisons.
//!
//! Each day runs the full single-day pipeline. Geometry is loaded once per
//! run and reused; the only state carried between iterations is the
//! growing list of maps. Cancellation is checked at every day boundary.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use crate::error::{MapError, Result};
use crate::mapping::assemble::MapRequest;
use crate::mapping::pipeline::MapContext;
use crate::mapping::types::{ColoredMap, MapKind};
use crate::parser::{GeometryTable, TripTable};
use crate::progress::{CancelToken, ProgressReporter, band};

/// Province, month and sensitivity of one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSpec {
    pub subject: String,
    pub month: u32,
    pub sensitivity: f64,
}

/// Every available day of a month for one province.
#[derive(Debug, Clone, Serialize)]
pub struct MonthBundle {
    pub series: SeriesSpec,
    pub days: Vec<u32>,
    pub maps: Vec<ColoredMap>,
    pub generated_at: DateTime<Utc>,
}

/// One day of a comparison.
#[derive(Debug, Clone, Serialize)]
pub struct ComparedDay {
    pub day: u32,
    pub a: ColoredMap,
    pub b: ColoredMap,
}

/// Two series over their common days.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonBundle {
    pub a: SeriesSpec,
    pub b: SeriesSpec,
    pub days: Vec<ComparedDay>,
    pub generated_at: DateTime<Utc>,
}

/// Inclusive span of days covered by both lists.
///
/// Both lists must be sorted. Returns `None` when the spans do not overlap.
pub fn common_day_span(a: &[u32], b: &[u32]) -> Option<(u32, u32)> {
    let start = (*a.first()?).max(*b.first()?);
    let end = (*a.last()?).min(*b.last()?);
    (start <= end).then_some((start, end))
}

/// Builds the trip map of every day in `trips`.
///
/// Progress runs 0 → 5 (days read) → 90 (maps built) → 100.
pub fn month_maps(
    ctx: &MapContext,
    geometry: &GeometryTable,
    trips: &TripTable,
    series: &SeriesSpec,
    zoom: u8,
    progress: &dyn ProgressReporter,
    cancel: &CancelToken,
) -> Result<MonthBundle> {
    progress.report(0);
    let days = trips.days();
    let Some(&first) = days.first() else {
        return Err(MapError::EmptyData { day: 0 });
    };
    info!(subject = %series.subject, month = series.month, days = days.len(), first, "Building month");
    progress.report(5);

    let mut maps = Vec::with_capacity(days.len());
    for (idx, &day) in days.iter().enumerate() {
        cancel.check()?;
        let request = day_request(series, day, zoom);
        maps.push(ctx.trips_map(geometry, trips, &request)?);
        progress.report(band(5, 90, idx + 1, days.len()));
    }

    progress.report(100);
    Ok(MonthBundle {
        series: series.clone(),
        days,
        maps,
        generated_at: Utc::now(),
    })
}

/// Loads the month's data from the data directory and builds every day.
#[instrument(skip(ctx, progress, cancel))]
pub fn month_sequence(
    ctx: &MapContext,
    series: &SeriesSpec,
    zoom: u8,
    progress: &dyn ProgressReporter,
    cancel: &CancelToken,
) -> Result<MonthBundle> {
    let trips = ctx.load_trips(&series.subject, series.month)?;
    let geometry = ctx.load_geometry()?;
    month_maps(ctx, &geometry, &trips, series, zoom, progress, cancel)
}

/// Builds paired maps for every day of the span both series cover.
///
/// A day inside the span that one of the series lacks fails the whole
/// comparison with [`MapError::EmptyData`].
#[allow(clippy::too_many_arguments)]
pub fn compare_maps(
    ctx: &MapContext,
    geometry: &GeometryTable,
    (series_a, trips_a): (&SeriesSpec, &TripTable),
    (series_b, trips_b): (&SeriesSpec, &TripTable),
    zoom: u8,
    progress: &dyn ProgressReporter,
    cancel: &CancelToken,
) -> Result<ComparisonBundle> {
    progress.report(5);
    let (start, end) =
        common_day_span(&trips_a.days(), &trips_b.days()).ok_or(MapError::NoCommonDays)?;
    info!(start, end, "Comparing series");
    progress.report(15);

    let total = (end - start + 1) as usize;
    let mut days = Vec::with_capacity(total);
    for (idx, day) in (start..=end).enumerate() {
        cancel.check()?;
        let a = ctx.trips_map(geometry, trips_a, &day_request(series_a, day, zoom))?;
        let b = ctx.trips_map(geometry, trips_b, &day_request(series_b, day, zoom))?;
        days.push(ComparedDay { day, a, b });
        progress.report(band(15, 90, idx + 1, total));
    }

    progress.report(100);
    Ok(ComparisonBundle {
        a: series_a.clone(),
        b: series_b.clone(),
        days,
        generated_at: Utc::now(),
    })
}

/// Loads both series from the data directory and compares them.
#[instrument(skip(ctx, progress, cancel))]
pub fn compare_sequence(
    ctx: &MapContext,
    series_a: &SeriesSpec,
    series_b: &SeriesSpec,
    zoom: u8,
    progress: &dyn ProgressReporter,
    cancel: &CancelToken,
) -> Result<ComparisonBundle> {
    progress.report(0);
    let trips_a = ctx.load_trips(&series_a.subject, series_a.month)?;
    let trips_b = ctx.load_trips(&series_b.subject, series_b.month)?;
    let geometry = ctx.load_geometry()?;
    compare_maps(
        ctx,
        &geometry,
        (series_a, &trips_a),
        (series_b, &trips_b),
        zoom,
        progress,
        cancel,
    )
}

fn day_request(series: &SeriesSpec, day: u32, zoom: u8) -> MapRequest {
    MapRequest {
        kind: MapKind::Trips,
        subject: series.subject.clone(),
        day,
        month: series.month,
        sensitivity: series.sensitivity,
        zoom,
    }
}
