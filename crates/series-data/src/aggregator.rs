//! Series aggregation: normalized records → yearly [`AggregatePoint`]s.
//!
//! Each output group sums the series listed under it, year by year. Two
//! approximations carry over from the source charts and are kept on purpose
//! for output compatibility:
//!
//! * a missing cell and a series absent from the data both contribute 0,
//!   so the two cases cannot be told apart in a sum;
//! * any year where some group sums to exactly 0 is dropped, which treats a
//!   genuine zero the same as "no coverage".
//!
//! Cells that failed to parse are never summed: the year is dropped instead.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use series_core::models::{
    AggregatePoint, GroupDefinition, NormalizedRecord, RecordFilter, YearRange,
};
use tracing::{debug, warn};

/// Years the spending survey skipped; filled from their neighbours.
pub const SURVEY_GAP_YEARS: [i32; 2] = [2018, 2020];

/// Group total for one year. `None` when a contributing cell was unparseable.
type GroupSum = Option<f64>;

/// Stateless helper that regroups series and sums them per year.
pub struct SeriesAggregator;

impl SeriesAggregator {
    /// Aggregate `records` into one point per surviving year, interpolating
    /// the [`SURVEY_GAP_YEARS`].
    ///
    /// Returns points sorted by year (ascending); empty when nothing survives.
    pub fn aggregate(
        records: &[NormalizedRecord],
        groups: &GroupDefinition,
        range: YearRange,
    ) -> Vec<AggregatePoint> {
        Self::aggregate_with_gaps(records, groups, range, &SURVEY_GAP_YEARS)
    }

    /// Apply `filter` to `records`, then
    /// [`aggregate_with_gaps`](Self::aggregate_with_gaps).
    pub fn aggregate_filtered(
        records: &[NormalizedRecord],
        filter: &RecordFilter,
        groups: &GroupDefinition,
        range: YearRange,
        gap_years: &[i32],
    ) -> Vec<AggregatePoint> {
        let selected: Vec<NormalizedRecord> = records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        Self::aggregate_with_gaps(&selected, groups, range, gap_years)
    }

    /// Same as [`aggregate`](Self::aggregate) with an explicit list of
    /// interpolated years.
    pub fn aggregate_with_gaps(
        records: &[NormalizedRecord],
        groups: &GroupDefinition,
        range: YearRange,
        gap_years: &[i32],
    ) -> Vec<AggregatePoint> {
        if records.is_empty() || groups.is_empty() {
            return Vec::new();
        }

        let mut by_series: HashMap<&str, Vec<&NormalizedRecord>> = HashMap::new();
        for record in records {
            by_series
                .entry(record.series_key.as_str())
                .or_default()
                .push(record);
        }

        let data_years: BTreeSet<i32> = records
            .iter()
            .flat_map(|r| r.year_values.keys().copied())
            .collect();

        // Sums are computed over every data year before range filtering so
        // that interpolation can reach neighbours outside the range.
        let mut sums: Vec<BTreeMap<i32, GroupSum>> = groups
            .groups()
            .iter()
            .map(|group| {
                data_years
                    .iter()
                    .map(|&year| (year, sum_members(&group.members, &by_series, year)))
                    .collect()
            })
            .collect();

        for per_year in &mut sums {
            for &gap in gap_years {
                interpolate_gap(per_year, gap);
            }
        }

        let candidates: BTreeSet<i32> = data_years
            .iter()
            .chain(gap_years.iter())
            .copied()
            .filter(|&year| range.contains(year))
            .collect();

        let mut points: Vec<AggregatePoint> = Vec::with_capacity(candidates.len());
        let mut dropped_zero = 0usize;

        'years: for year in candidates {
            let mut values: BTreeMap<String, f64> = BTreeMap::new();
            for (group, per_year) in groups.groups().iter().zip(&sums) {
                match per_year.get(&year).copied().unwrap_or(Some(0.0)) {
                    None => {
                        warn!(
                            year,
                            group = %group.name,
                            "dropping year with unparseable source cells"
                        );
                        continue 'years;
                    }
                    Some(v) if v == 0.0 => {
                        dropped_zero += 1;
                        continue 'years;
                    }
                    Some(v) => {
                        values.insert(group.name.clone(), v);
                    }
                }
            }
            points.push(AggregatePoint { year, values });
        }

        debug!(
            groups = groups.len(),
            points = points.len(),
            dropped_zero,
            "aggregation complete"
        );

        points
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Sum `year` over every record of every member series.
///
/// Missing cells, years a record lacks, and series with no record at all
/// all contribute 0.
fn sum_members(
    members: &[String],
    by_series: &HashMap<&str, Vec<&NormalizedRecord>>,
    year: i32,
) -> GroupSum {
    members
        .iter()
        .flat_map(|key| by_series.get(key.as_str()).into_iter().flatten())
        .try_fold(0.0, |acc, record| match record.value(year) {
            Some(value) => value.summand().map(|v| acc + v),
            None => Some(acc),
        })
}

/// Replace a zero total at `gap` with the mean of the totals of the years
/// right before and after it, when both are non-zero.
fn interpolate_gap(per_year: &mut BTreeMap<i32, GroupSum>, gap: i32) {
    let current = per_year.get(&gap).copied().unwrap_or(Some(0.0));
    if current != Some(0.0) {
        return;
    }

    let neighbour = |year: i32| match per_year.get(&year) {
        Some(Some(v)) if *v != 0.0 => Some(*v),
        _ => None,
    };

    if let (Some(before), Some(after)) = (neighbour(gap - 1), neighbour(gap + 1)) {
        per_year.insert(gap, Some((before + after) / 2.0));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
