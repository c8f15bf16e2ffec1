use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::error::{MapError, Result};
use crate::mapping::types::{DayAggregate, RateTable};
use crate::names::{CanonicalKey, ProvinceAliases};
use crate::parser::{PopulationRow, TripTable};

/// Sums trips by origin province for one day.
///
/// Rows are grouped by raw origin name first, then each group is
/// standardized and groups landing on the same canonical key are summed
/// again, so spellings collapsed by the alias table end up as one province.
/// Groups are summed in raw-name order, so fractional totals are stable.
pub fn aggregate_day(trips: &TripTable, day: u32, aliases: &ProvinceAliases) -> Result<DayAggregate> {
    let mut by_origin: BTreeMap<&str, f64> = BTreeMap::new();
    for row in trips.rows_for_day(day) {
        *by_origin.entry(row.origin.as_str()).or_default() += row.trips;
    }

    if by_origin.is_empty() {
        return Err(MapError::EmptyData { day });
    }

    let raw_groups = by_origin.len();
    let mut totals: BTreeMap<CanonicalKey, f64> = BTreeMap::new();
    for (origin, sum) in by_origin {
        *totals.entry(aliases.standardize(origin)).or_default() += sum;
    }

    debug!(day, raw_groups, provinces = totals.len(), "Aggregated trips");
    Ok(DayAggregate { day, totals })
}

/// Trips per `per` inhabitants for every origin in `aggregate`.
///
/// Population rows are standardized; keys listed in `exclude` are dropped
/// and the first row wins when a key repeats. Origins without a positive
/// population get a rate of 0.
pub fn per_capita(
    aggregate: &DayAggregate,
    population: &[PopulationRow],
    exclude: &[String],
    per: f64,
    aliases: &ProvinceAliases,
) -> RateTable {
    let excluded: BTreeSet<CanonicalKey> = exclude.iter().map(|e| aliases.standardize(e)).collect();

    let mut inhabitants: HashMap<CanonicalKey, f64> = HashMap::new();
    for row in population {
        let key = aliases.standardize(&row.province);
        if excluded.contains(&key) {
            continue;
        }
        if inhabitants.contains_key(&key) {
            warn!(province = %key, "Duplicate population row ignored");
            continue;
        }
        inhabitants.insert(key, row.population);
    }

    let rates = aggregate
        .totals
        .iter()
        .map(|(key, trips)| {
            let population = inhabitants.get(key).copied().unwrap_or(0.0);
            let rate = if population > 0.0 {
                trips / population * per
            } else {
                0.0
            };
            (key.clone(), rate)
        })
        .collect();

    RateTable {
        day: aggregate.day,
        rates,
    }
}
