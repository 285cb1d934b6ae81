//! Fixed column schemas of the three Statistics Canada table extracts.
//!
//! Each dataset has a small set of metadata columns (matched by exact name)
//! and a run of year columns. Household spending and income use bare
//! four-digit year headers; product cost uses `"<MonthName> <Year>"` headers.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::Month;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Expenditure category column of the household-spending table.
pub const CATEGORY_COLUMN: &str = "Household expenditures/summary-level categories";
/// Family type column of the household-income table.
pub const FAMILY_TYPE_COLUMN: &str = "Family type";
/// Age group column of the household-income table.
pub const AGE_GROUP_COLUMN: &str = "Age of older adult";
/// Product column of the consumer product-cost table.
pub const PRODUCT_COLUMN: &str = "Products 5";

/// Placeholder Statistics Canada uses for cells that were not reported.
pub const MISSING_SENTINEL: &str = "..";

// ── DatasetKind ───────────────────────────────────────────────────────────────

/// The three known datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatasetKind {
    HouseholdSpending,
    HouseholdIncome,
    ProductCost,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 3] = [
        DatasetKind::HouseholdSpending,
        DatasetKind::HouseholdIncome,
        DatasetKind::ProductCost,
    ];

    /// File name of the dataset inside the data directory.
    pub fn file_name(self) -> &'static str {
        match self {
            DatasetKind::HouseholdSpending => "household_spending.csv",
            DatasetKind::HouseholdIncome => "household_income.csv",
            DatasetKind::ProductCost => "product_cost.csv",
        }
    }

    /// Human-readable label used in logs and error messages.
    pub fn label(self) -> &'static str {
        match self {
            DatasetKind::HouseholdSpending => "household spending",
            DatasetKind::HouseholdIncome => "household income",
            DatasetKind::ProductCost => "consumer product cost",
        }
    }

    /// Which content-type selector shows charts built on this dataset.
    pub fn content_type(self) -> ContentType {
        match self {
            DatasetKind::HouseholdIncome => ContentType::Income,
            DatasetKind::HouseholdSpending | DatasetKind::ProductCost => ContentType::Spending,
        }
    }

    /// The column layout of this dataset.
    pub fn schema(self) -> DatasetSchema {
        match self {
            DatasetKind::HouseholdSpending => DatasetSchema {
                kind: self,
                metadata: &[MetadataColumn {
                    name: CATEGORY_COLUMN,
                    field: MetadataField::SeriesKey,
                    carry_forward: false,
                }],
                year_style: YearColumnStyle::Year,
            },
            DatasetKind::HouseholdIncome => DatasetSchema {
                kind: self,
                metadata: &[
                    MetadataColumn {
                        name: FAMILY_TYPE_COLUMN,
                        field: MetadataField::SeriesKey,
                        carry_forward: true,
                    },
                    MetadataColumn {
                        name: AGE_GROUP_COLUMN,
                        field: MetadataField::SecondaryKey,
                        carry_forward: false,
                    },
                ],
                year_style: YearColumnStyle::Year,
            },
            DatasetKind::ProductCost => DatasetSchema {
                kind: self,
                metadata: &[MetadataColumn {
                    name: PRODUCT_COLUMN,
                    field: MetadataField::SeriesKey,
                    carry_forward: false,
                }],
                year_style: YearColumnStyle::MonthYear,
            },
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── ContentType ───────────────────────────────────────────────────────────────

/// Content-type selector: which family of charts to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    All,
    Income,
    Spending,
}

impl ContentType {
    /// `true` when a chart of `other` content should be shown under `self`.
    pub fn includes(self, other: ContentType) -> bool {
        self == ContentType::All || self == other
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(ContentType::All),
            "income" => Ok(ContentType::Income),
            "spending" => Ok(ContentType::Spending),
            other => Err(format!("unknown content type: {}", other)),
        }
    }
}

// ── Columns ───────────────────────────────────────────────────────────────────

/// Which [`NormalizedRecord`](crate::models::NormalizedRecord) field a
/// metadata column feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    SeriesKey,
    SecondaryKey,
}

/// A metadata column recognised by exact name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataColumn {
    pub name: &'static str,
    pub field: MetadataField,
    /// Blank cells inherit the last non-blank value seen earlier in the pass.
    pub carry_forward: bool,
}

/// How year columns are spelled in a dataset's header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearColumnStyle {
    /// `"2019"`
    Year,
    /// `"January 2019"`
    MonthYear,
}

/// A parsed year column header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearColumn {
    Year(i32),
    Month { year: i32, month: Month },
}

impl YearColumn {
    pub fn year(&self) -> i32 {
        match *self {
            YearColumn::Year(year) | YearColumn::Month { year, .. } => year,
        }
    }
}

/// Role of a header column within a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Metadata(MetadataColumn),
    Year(YearColumn),
    Unrecognized,
}

// ── DatasetSchema ─────────────────────────────────────────────────────────────

/// Column layout of one dataset.
#[derive(Debug, Clone, Copy)]
pub struct DatasetSchema {
    pub kind: DatasetKind,
    pub metadata: &'static [MetadataColumn],
    pub year_style: YearColumnStyle,
}

impl DatasetSchema {
    /// Classify a header column by exact metadata name, then by year pattern.
    pub fn classify(&self, column: &str) -> ColumnRole {
        if let Some(meta) = self.metadata.iter().find(|m| m.name == column) {
            return ColumnRole::Metadata(*meta);
        }
        let parsed = match self.year_style {
            YearColumnStyle::Year => parse_year_header(column).map(YearColumn::Year),
            YearColumnStyle::MonthYear => parse_month_year_header(column)
                .map(|(month, year)| YearColumn::Month { year, month }),
        };
        parsed.map_or(ColumnRole::Unrecognized, ColumnRole::Year)
    }

    /// Metadata columns absent from `header`, in schema order.
    pub fn missing_metadata<'a>(
        &self,
        header: impl IntoIterator<Item = &'a str> + Clone,
    ) -> Vec<&'static str> {
        self.metadata
            .iter()
            .filter(|m| !header.clone().into_iter().any(|h| h == m.name))
            .map(|m| m.name)
            .collect()
    }
}

/// Parse a bare four-digit year header such as `"2019"`.
pub fn parse_year_header(column: &str) -> Option<i32> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^\s*(\d{4})\s*$").expect("regex is valid"));
    re.captures(column)?.get(1)?.as_str().parse().ok()
}

/// Parse a `"<MonthName> <Year>"` header such as `"January 2019"` or
/// `"Jan 2019"`.
pub fn parse_month_year_header(column: &str) -> Option<(Month, i32)> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z]+)\.?\s+(\d{4})\s*$").expect("regex is valid")
    });
    let caps = re.captures(column)?;
    let month = Month::from_str(caps.get(1)?.as_str()).ok()?;
    let year = caps.get(2)?.as_str().parse().ok()?;
    Some((month, year))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
