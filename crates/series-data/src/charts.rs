//! Chart catalog and per-chart rendering data.
//!
//! Every chart is one [`ChartConfig`]: a dataset, a grouping table, an
//! optional record filter and display metadata. [`ChartData::build`] runs
//! the aggregation once and derives everything a renderer needs.

use serde::Serialize;

use series_core::error::{ChartsError, Result};
use series_core::models::{AggregatePoint, GroupDefinition, NormalizedRecord, RecordFilter, YearRange};
use series_core::schema::{ContentType, DatasetKind};

use crate::aggregator::{SeriesAggregator, SURVEY_GAP_YEARS};
use crate::shape::{self, StackLayer};

/// Age group used by the household-income charts.
pub const INCOME_AGE_GROUP: &str = "All ages";

/// How a chart is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    StackedArea,
    Line,
    Bar,
}

/// One chart of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartConfig {
    pub id: &'static str,
    pub title: &'static str,
    pub dataset: DatasetKind,
    pub kind: ChartKind,
    pub groups: GroupDefinition,
    pub filter: RecordFilter,
    /// Bottom-to-top stacking order; empty means legend order.
    pub stack_order: Vec<String>,
    /// Years filled from their neighbours when the source skipped them.
    pub gap_years: &'static [i32],
}

impl ChartConfig {
    pub fn content_type(&self) -> ContentType {
        self.dataset.content_type()
    }

    /// Stacking order, falling back to the group order.
    pub fn stack_keys(&self) -> Vec<&str> {
        if self.stack_order.is_empty() {
            self.groups.names()
        } else {
            self.stack_order.iter().map(String::as_str).collect()
        }
    }

    /// Filter and aggregate `records` for this chart.
    pub fn aggregate(&self, records: &[NormalizedRecord], range: YearRange) -> Vec<AggregatePoint> {
        SeriesAggregator::aggregate_filtered(
            records,
            &self.filter,
            &self.groups,
            range,
            self.gap_years,
        )
    }
}

// ── Catalog ───────────────────────────────────────────────────────────────────

/// All built-in charts, in display order.
pub fn catalog() -> Vec<ChartConfig> {
    vec![
        ChartConfig {
            id: "spending-stacked",
            title: "Household spending by category group",
            dataset: DatasetKind::HouseholdSpending,
            kind: ChartKind::StackedArea,
            groups: GroupDefinition::new()
                .with_group("Basic Needs", ["Shelter", "Food expenditures", "Health care"])
                .with_group(
                    "Lifestyle",
                    ["Clothing and accessories", "Transportation", "Education"],
                )
                .with_group(
                    "Leisure and Contributions",
                    [
                        "Recreation",
                        "Gifts of money, support payments and charitable contributions",
                    ],
                )
                .with_group("Total expenditure", ["Total expenditure"]),
            filter: RecordFilter::all(),
            stack_order: [
                "Basic Needs",
                "Lifestyle",
                "Leisure and Contributions",
                "Total expenditure",
            ]
            .map(String::from)
            .to_vec(),
            gap_years: &SURVEY_GAP_YEARS,
        },
        ChartConfig {
            id: "spending-food",
            title: "Household food spending",
            dataset: DatasetKind::HouseholdSpending,
            kind: ChartKind::Line,
            groups: GroupDefinition::new().with_group(
                "Food",
                ["Food purchased from stores", "Food purchased from restaurants"],
            ),
            filter: RecordFilter::all(),
            stack_order: Vec::new(),
            gap_years: &SURVEY_GAP_YEARS,
        },
        ChartConfig {
            id: "income-family",
            title: "Median after-tax income by family type",
            dataset: DatasetKind::HouseholdIncome,
            kind: ChartKind::Line,
            groups: GroupDefinition::identity([
                "Economic families and persons not in an economic family",
                "Couple families",
                "Lone-parent families",
                "Persons not in an economic family",
            ]),
            filter: RecordFilter::secondary(INCOME_AGE_GROUP),
            stack_order: Vec::new(),
            gap_years: &[],
        },
        ChartConfig {
            id: "product-cost",
            title: "Average yearly retail price of staple products",
            dataset: DatasetKind::ProductCost,
            kind: ChartKind::Bar,
            groups: GroupDefinition::new()
                .with_group("Milk", ["Milk, 2 litres"])
                .with_group("Eggs", ["Eggs, 1 dozen"])
                .with_group("Bread", ["White bread, 675 grams"])
                .with_group("Ground beef", ["Ground beef, per kilogram"]),
            filter: RecordFilter::all(),
            stack_order: Vec::new(),
            gap_years: &[],
        },
    ]
}

/// Look a chart up by id.
pub fn find_chart(id: &str) -> Result<ChartConfig> {
    catalog()
        .into_iter()
        .find(|c| c.id == id)
        .ok_or_else(|| ChartsError::UnknownChart(id.to_string()))
}

/// Charts shown under the given content-type selection.
pub fn charts_for(content: ContentType) -> Vec<ChartConfig> {
    catalog()
        .into_iter()
        .filter(|c| content.includes(c.content_type()))
        .collect()
}

// ── ChartData ─────────────────────────────────────────────────────────────────

/// Everything a renderer needs for one chart draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub id: String,
    pub title: String,
    pub kind: ChartKind,
    pub range: YearRange,
    pub points: Vec<AggregatePoint>,
    pub legend: Vec<String>,
    pub year_extent: Option<(i32, i32)>,
    pub y_max: f64,
    /// Stacked layers; empty for line and bar charts.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub layers: Vec<StackLayer>,
}

impl ChartData {
    /// Aggregate `records` for `config` and derive the chart shapes.
    pub fn build(config: &ChartConfig, records: &[NormalizedRecord], range: YearRange) -> Self {
        let points = config.aggregate(records, range);
        let legend = shape::legend(&config.groups);
        let keys: Vec<&str> = legend.iter().map(String::as_str).collect();

        let (y_max, layers) = match config.kind {
            ChartKind::StackedArea => {
                let order = config.stack_keys();
                (shape::stacked_max(&points, &keys), shape::stack(&points, &order))
            }
            ChartKind::Line | ChartKind::Bar => (shape::value_max(&points, &keys), Vec::new()),
        };

        ChartData {
            id: config.id.to_string(),
            title: config.title.to_string(),
            kind: config.kind,
            range,
            year_extent: shape::year_extent(&points),
            points,
            legend,
            y_max,
            layers,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// `(year, value)` pairs of one legend entry.
    pub fn line(&self, key: &str) -> Vec<(i32, f64)> {
        shape::line_series(&self.points, key)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
