//! Chart-ready views over aggregate points: scale domains, stacked layers,
//! line series and legend order.

use serde::Serialize;

use series_core::models::{AggregatePoint, GroupDefinition};

/// One band of a stacked layer at a given year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Band {
    pub year: i32,
    pub y0: f64,
    pub y1: f64,
}

/// All bands of one key, bottom to top in stack order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackLayer {
    pub key: String,
    pub bands: Vec<Band>,
}

/// `(first year, last year)` of the points, for the x-scale domain.
pub fn year_extent(points: &[AggregatePoint]) -> Option<(i32, i32)> {
    let first = points.iter().map(|p| p.year).min()?;
    let last = points.iter().map(|p| p.year).max()?;
    Some((first, last))
}

/// Largest per-point sum over `keys`; the y-scale top of a stacked chart.
pub fn stacked_max(points: &[AggregatePoint], keys: &[&str]) -> f64 {
    points
        .iter()
        .map(|p| keys.iter().filter_map(|k| p.value(k)).sum::<f64>())
        .fold(0.0, f64::max)
}

/// Largest single value over `keys`; the y-scale top of a line or bar chart.
pub fn value_max(points: &[AggregatePoint], keys: &[&str]) -> f64 {
    points
        .iter()
        .flat_map(move |p| keys.iter().filter_map(move |k| p.value(k)))
        .fold(0.0, f64::max)
}

/// Stack the points in `order`: each layer starts where the previous ended.
/// A key a point lacks stacks as 0.
pub fn stack(points: &[AggregatePoint], order: &[&str]) -> Vec<StackLayer> {
    let mut baseline: Vec<f64> = vec![0.0; points.len()];
    order
        .iter()
        .map(|&key| {
            let bands = points
                .iter()
                .zip(baseline.iter_mut())
                .map(|(point, base)| {
                    let y0 = *base;
                    let y1 = y0 + point.value(key).unwrap_or(0.0);
                    *base = y1;
                    Band { year: point.year, y0, y1 }
                })
                .collect();
            StackLayer {
                key: key.to_string(),
                bands,
            }
        })
        .collect()
}

/// Ordered `(year, value)` pairs for one group; years lacking it are skipped.
pub fn line_series(points: &[AggregatePoint], key: &str) -> Vec<(i32, f64)> {
    points
        .iter()
        .filter_map(|p| p.value(key).map(|v| (p.year, v)))
        .collect()
}

/// Group names in display order.
pub fn legend(groups: &GroupDefinition) -> Vec<String> {
    groups.names().into_iter().map(str::to_string).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
