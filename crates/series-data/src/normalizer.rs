//! Row normalization: raw CSV rows → [`NormalizedRecord`]s.
//!
//! Metadata columns are matched by exact name against the dataset schema;
//! every other column is a year column. Household spending and income cells
//! are integers with `,` digit grouping; product-cost cells are monthly
//! prices averaged into one value per year.
//!
//! The household-income table leaves the family type blank on continuation
//! rows, so a [`RowNormalizer`] carries the last non-blank value forward.
//! That state lives in the normalizer value, so each pass starts clean.

use std::collections::{BTreeMap, HashMap};

use series_core::error::{ChartsError, Result};
use series_core::models::{
    CellWarning, NormalizedDataset, NormalizedRecord, RawRow, RawTable, YearValue,
};
use series_core::schema::{
    ColumnRole, DatasetKind, DatasetSchema, MetadataField, YearColumn, MISSING_SENTINEL,
};
use tracing::{debug, warn};

/// Digit-grouping character used by the source tables.
pub const THOUSANDS_SEPARATOR: char = ',';

// ── Cell parsing ──────────────────────────────────────────────────────────────

/// Remove digit-grouping separators and surrounding whitespace.
pub fn strip_separators(raw: &str) -> String {
    raw.trim().chars().filter(|&c| c != THOUSANDS_SEPARATOR).collect()
}

/// `true` when the cell is the "not reported" placeholder.
pub fn is_missing_sentinel(raw: &str) -> bool {
    raw.trim() == MISSING_SENTINEL
}

/// Parse a household spending/income year cell.
///
/// The sentinel yields [`YearValue::Missing`]; anything that is not an
/// integer after stripping separators yields [`YearValue::Invalid`].
pub fn parse_year_cell(raw: &str) -> YearValue {
    if is_missing_sentinel(raw) {
        return YearValue::Missing;
    }
    match strip_separators(raw).parse::<i64>() {
        Ok(n) => YearValue::Value(n as f64),
        Err(_) => YearValue::Invalid(raw.to_string()),
    }
}

/// Parse a product-cost month cell. Non-numeric cells (sentinel included)
/// return `None` and drop out of the yearly mean.
pub fn parse_month_cell(raw: &str) -> Option<f64> {
    if is_missing_sentinel(raw) {
        return None;
    }
    strip_separators(raw)
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Mean of the numeric month values; `0.0` when there are none.
pub fn monthly_mean(months: impl IntoIterator<Item = Option<f64>>) -> f64 {
    let (sum, count) = months
        .into_iter()
        .flatten()
        .fold((0.0, 0u32), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / f64::from(count)
    }
}

// ── RowNormalizer ─────────────────────────────────────────────────────────────

/// A normalized row together with the cell problems found in it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub record: NormalizedRecord,
    pub warnings: Vec<CellWarning>,
}

/// Normalizes the rows of one pass over one dataset.
///
/// Construct a fresh normalizer per pass; it owns the carry-forward state.
#[derive(Debug)]
pub struct RowNormalizer {
    schema: DatasetSchema,
    /// Last non-blank value per carry-forward metadata column.
    carried: HashMap<&'static str, String>,
    rows_seen: usize,
}

impl RowNormalizer {
    pub fn new(kind: DatasetKind) -> Self {
        Self {
            schema: kind.schema(),
            carried: HashMap::new(),
            rows_seen: 0,
        }
    }

    pub fn kind(&self) -> DatasetKind {
        self.schema.kind
    }

    /// Check that every metadata column is present and every other column is
    /// a year column this dataset understands.
    pub fn validate_header<'a>(
        &self,
        header: impl IntoIterator<Item = &'a str> + Clone,
    ) -> Result<()> {
        if let Some(column) = self.schema.missing_metadata(header.clone()).first() {
            return Err(ChartsError::SchemaMismatch {
                dataset: self.schema.kind.label().to_string(),
                column: column.to_string(),
            });
        }
        for column in header {
            if self.schema.classify(column) == ColumnRole::Unrecognized {
                return Err(ChartsError::UnrecognizedColumn {
                    dataset: self.schema.kind.label().to_string(),
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Normalize one row. The row itself is left untouched.
    pub fn normalize(&mut self, row: &RawRow) -> Result<NormalizedRow> {
        self.validate_header(row.columns())?;
        self.rows_seen += 1;

        let mut series_key = String::new();
        let mut secondary_key: Option<String> = None;
        let mut year_values: BTreeMap<i32, YearValue> = BTreeMap::new();
        let mut months: BTreeMap<i32, Vec<Option<f64>>> = BTreeMap::new();
        let mut warnings: Vec<CellWarning> = Vec::new();

        for (column, raw) in row.iter() {
            match self.schema.classify(column) {
                ColumnRole::Metadata(meta) => {
                    let mut value = raw.trim().to_string();
                    if meta.carry_forward {
                        if value.is_empty() {
                            value = self.carried.get(meta.name).cloned().unwrap_or_default();
                        } else {
                            self.carried.insert(meta.name, value.clone());
                        }
                    }
                    match meta.field {
                        MetadataField::SeriesKey => series_key = value,
                        MetadataField::SecondaryKey => secondary_key = Some(value),
                    }
                }
                ColumnRole::Year(YearColumn::Year(year)) => {
                    let value = parse_year_cell(raw);
                    if value.is_invalid() {
                        warnings.push(CellWarning {
                            row: self.rows_seen,
                            column: column.to_string(),
                            raw: raw.to_string(),
                        });
                    }
                    year_values.insert(year, value);
                }
                ColumnRole::Year(YearColumn::Month { year, .. }) => {
                    months.entry(year).or_default().push(parse_month_cell(raw));
                }
                // validate_header already rejected these.
                ColumnRole::Unrecognized => {}
            }
        }

        for (year, cells) in months {
            year_values.insert(year, YearValue::Value(monthly_mean(cells)));
        }

        Ok(NormalizedRow {
            record: NormalizedRecord {
                series_key,
                secondary_key,
                year_values,
            },
            warnings,
        })
    }
}

// ── Passes ────────────────────────────────────────────────────────────────────

/// Normalize every row of `rows` in order with a fresh [`RowNormalizer`].
///
/// Schema problems abort the pass; unparseable cells are collected as
/// warnings and the pass continues.
pub fn normalize_rows(kind: DatasetKind, rows: &[RawRow]) -> Result<NormalizedDataset> {
    let mut normalizer = RowNormalizer::new(kind);

    let (records, warnings) = rows.iter().try_fold(
        (Vec::with_capacity(rows.len()), Vec::new()),
        |(mut records, mut warnings), row| {
            let normalized = normalizer.normalize(row)?;
            records.push(normalized.record);
            warnings.extend(normalized.warnings);
            Ok::<_, ChartsError>((records, warnings))
        },
    )?;

    report(kind, &records, &warnings);

    Ok(NormalizedDataset {
        kind,
        records,
        warnings,
    })
}

/// Validate the table header, then normalize its rows.
///
/// The header check runs even when the table has no data rows.
pub fn normalize_table(kind: DatasetKind, table: &RawTable) -> Result<NormalizedDataset> {
    RowNormalizer::new(kind).validate_header(table.header.iter().map(String::as_str))?;
    normalize_rows(kind, &table.rows)
}

fn report(kind: DatasetKind, records: &[NormalizedRecord], warnings: &[CellWarning]) {
    if !warnings.is_empty() {
        warn!(
            dataset = kind.label(),
            count = warnings.len(),
            "unparseable year cells found"
        );
        for w in warnings {
            debug!(row = w.row, column = %w.column, raw = %w.raw, "unparseable cell");
        }
    }
    debug!(
        dataset = kind.label(),
        records = records.len(),
        warnings = warnings.len(),
        "normalization pass complete"
    );
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use series_core::schema::{AGE_GROUP_COLUMN, CATEGORY_COLUMN, FAMILY_TYPE_COLUMN, PRODUCT_COLUMN};

    fn spending_row(category: &str, cells: &[(&str, &str)]) -> RawRow {
        let mut pairs = vec![(CATEGORY_COLUMN.to_string(), category.to_string())];
        pairs.extend(cells.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        RawRow::new(pairs)
    }

    fn income_row(family: &str, age: &str, value_2019: &str) -> RawRow {
        RawRow::from_pairs([
            (FAMILY_TYPE_COLUMN, family),
            (AGE_GROUP_COLUMN, age),
            ("2019", value_2019),
        ])
    }

    // ── cell parsing ──────────────────────────────────────────────────────────

    #[test]
    fn test_strip_separators() {
        assert_eq!(strip_separators(" 1,234,567 "), "1234567");
        assert_eq!(strip_separators("987"), "987");
    }

    #[test]
    fn test_grouped_and_ungrouped_digits_parse_equal() {
        for n in [0i64, 7, 999, 1_000, 12_345, 999_999, 1_234_567, 90_000_001] {
            let grouped = format_grouped(n);
            assert_eq!(
                parse_year_cell(&grouped),
                parse_year_cell(&n.to_string()),
                "grouped {grouped}"
            );
            assert_eq!(parse_year_cell(&grouped), YearValue::Value(n as f64));
        }
    }

    fn format_grouped(n: i64) -> String {
        let digits = n.to_string();
        let mut out = String::new();
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(c);
        }
        out
    }

    #[test]
    fn test_sentinel_is_missing() {
        assert_eq!(parse_year_cell(".."), YearValue::Missing);
        assert_eq!(parse_year_cell(" .. "), YearValue::Missing);
        assert_eq!(parse_month_cell(".."), None);
    }

    #[test]
    fn test_garbage_cell_is_invalid_not_zero() {
        assert_eq!(parse_year_cell("n/a"), YearValue::Invalid("n/a".to_string()));
        assert_eq!(parse_year_cell(""), YearValue::Invalid(String::new()));
        assert_eq!(parse_year_cell("12.5"), YearValue::Invalid("12.5".to_string()));
    }

    #[test]
    fn test_month_cell_accepts_decimals() {
        assert_eq!(parse_month_cell("4.25"), Some(4.25));
        assert_eq!(parse_month_cell("1,004.5"), Some(1004.5));
        assert_eq!(parse_month_cell("F"), None);
        assert_eq!(parse_month_cell("NaN"), None);
    }

    #[test]
    fn test_monthly_mean() {
        let mut months: Vec<Option<f64>> = vec![Some(2.0), Some(4.0), Some(6.0)];
        months.extend(std::iter::repeat(None).take(9));
        assert!((monthly_mean(months) - 4.0).abs() < 1e-9);
        assert_eq!(monthly_mean(vec![None; 12]), 0.0);
    }

    // ── RowNormalizer ─────────────────────────────────────────────────────────

    #[test]
    fn test_every_year_column_produces_an_entry() {
        let row = spending_row(
            "Shelter",
            &[("2010", "18,126"), ("2011", ".."), ("2012", "19,032")],
        );
        let normalized = RowNormalizer::new(DatasetKind::HouseholdSpending)
            .normalize(&row)
            .unwrap();

        let record = normalized.record;
        assert_eq!(record.series_key, "Shelter");
        assert_eq!(record.secondary_key, None);
        assert_eq!(record.year_values.len(), 3);
        assert_eq!(record.value(2010), Some(&YearValue::Value(18_126.0)));
        assert_eq!(record.value(2011), Some(&YearValue::Missing));
        assert_eq!(record.value(2012), Some(&YearValue::Value(19_032.0)));
        assert!(normalized.warnings.is_empty());
    }

    #[test]
    fn test_invalid_cell_is_reported() {
        let row = spending_row("Education", &[("2015", "1,2x4"), ("2016", "1,300")]);
        let normalized = RowNormalizer::new(DatasetKind::HouseholdSpending)
            .normalize(&row)
            .unwrap();

        assert_eq!(
            normalized.record.value(2015),
            Some(&YearValue::Invalid("1,2x4".to_string()))
        );
        assert_eq!(
            normalized.warnings,
            vec![CellWarning {
                row: 1,
                column: "2015".to_string(),
                raw: "1,2x4".to_string(),
            }]
        );
    }

    #[test]
    fn test_normalize_does_not_mutate_row() {
        let row = spending_row("Shelter", &[("2019", "20,000")]);
        let before = row.clone();
        RowNormalizer::new(DatasetKind::HouseholdSpending)
            .normalize(&row)
            .unwrap();
        assert_eq!(row, before);
    }

    #[test]
    fn test_income_family_type_carries_forward() {
        let rows = vec![
            income_row("Couple families", "All ages", "98,000"),
            income_row("", "Older adult 65 years and over", "71,000"),
            income_row("Lone-parent families", "All ages", "52,000"),
            income_row("  ", "Older adult 65 years and over", ".."),
        ];
        let dataset = normalize_rows(DatasetKind::HouseholdIncome, &rows).unwrap();

        let keys: Vec<(&str, Option<&str>)> = dataset
            .records
            .iter()
            .map(|r| (r.series_key.as_str(), r.secondary_key.as_deref()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("Couple families", Some("All ages")),
                ("Couple families", Some("Older adult 65 years and over")),
                ("Lone-parent families", Some("All ages")),
                ("Lone-parent families", Some("Older adult 65 years and over")),
            ]
        );
    }

    #[test]
    fn test_carry_forward_resets_between_passes() {
        let first = vec![income_row("Couple families", "All ages", "98,000")];
        normalize_rows(DatasetKind::HouseholdIncome, &first).unwrap();

        let second = vec![income_row("", "All ages", "50,000")];
        let dataset = normalize_rows(DatasetKind::HouseholdIncome, &second).unwrap();
        assert_eq!(dataset.records[0].series_key, "");
    }

    #[test]
    fn test_spending_category_does_not_carry_forward() {
        let rows = vec![
            spending_row("Shelter", &[("2019", "1")]),
            spending_row("", &[("2019", "2")]),
        ];
        let dataset = normalize_rows(DatasetKind::HouseholdSpending, &rows).unwrap();
        assert_eq!(dataset.records[1].series_key, "");
    }

    #[test]
    fn test_product_cost_averages_months() {
        let mut pairs = vec![(PRODUCT_COLUMN.to_string(), "Eggs, 1 dozen".to_string())];
        let months = [
            "January", "February", "March", "April", "May", "June", "July", "August",
            "September", "October", "November", "December",
        ];
        // k = 4 numeric months in 2020, the rest are not reported.
        let values_2020 = ["3.00", "..", "3.50", "", "4.00", "..", "x", "..", "4.50", "..", "..", ".."];
        for (month, value) in months.iter().zip(values_2020) {
            pairs.push((format!("{} 2020", month), value.to_string()));
        }
        // k = 0 in 2021.
        for month in &months {
            pairs.push((format!("{} 2021", month), "..".to_string()));
        }
        let row = RawRow::new(pairs);

        let normalized = RowNormalizer::new(DatasetKind::ProductCost)
            .normalize(&row)
            .unwrap();
        let record = normalized.record;

        assert_eq!(record.series_key, "Eggs, 1 dozen");
        assert_eq!(record.year_values.len(), 2);
        let v2020 = record.value(2020).and_then(YearValue::as_f64).unwrap();
        assert!((v2020 - 15.0 / 4.0).abs() < 1e-9);
        assert_eq!(record.value(2021), Some(&YearValue::Value(0.0)));
        assert!(normalized.warnings.is_empty());
    }

    #[test]
    fn test_missing_metadata_column_is_schema_mismatch() {
        let row = RawRow::from_pairs([(FAMILY_TYPE_COLUMN, "Couple families"), ("2019", "1")]);
        let err = RowNormalizer::new(DatasetKind::HouseholdIncome)
            .normalize(&row)
            .unwrap_err();
        match err {
            ChartsError::SchemaMismatch { column, .. } => assert_eq!(column, AGE_GROUP_COLUMN),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let row = spending_row("Shelter", &[("Geography", "Canada"), ("2019", "1")]);
        let err = RowNormalizer::new(DatasetKind::HouseholdSpending)
            .normalize(&row)
            .unwrap_err();
        assert!(matches!(err, ChartsError::UnrecognizedColumn { .. }));
    }

    #[test]
    fn test_normalize_table_checks_header_without_rows() {
        let table = RawTable {
            header: vec!["Products".to_string(), "January 2020".to_string()],
            rows: vec![],
        };
        let err = normalize_table(DatasetKind::ProductCost, &table).unwrap_err();
        assert!(matches!(err, ChartsError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_normalize_rows_collects_warnings_across_rows() {
        let rows = vec![
            spending_row("Shelter", &[("2019", "oops")]),
            spending_row("Clothing and accessories", &[("2019", "3,100")]),
            spending_row("Recreation", &[("2019", "?")]),
        ];
        let dataset = normalize_rows(DatasetKind::HouseholdSpending, &rows).unwrap();
        assert_eq!(dataset.records.len(), 3);
        let rows_with_warnings: Vec<usize> = dataset.warnings.iter().map(|w| w.row).collect();
        assert_eq!(rows_with_warnings, vec![1, 3]);
    }
}
