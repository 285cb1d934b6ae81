use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::schema::DatasetKind;

// ── RawRow ────────────────────────────────────────────────────────────────────

/// One decoded CSV row: column name → raw cell text, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new(cells: Vec<(String, String)>) -> Self {
        Self { cells }
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cells: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Raw value of `column`, if the row has it.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// `(column, value)` pairs in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> + Clone {
        self.cells.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// `true` when every cell is blank.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.trim().is_empty())
    }
}

/// A decoded CSV file: trimmed header plus data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<RawRow>,
}

// ── YearValue ─────────────────────────────────────────────────────────────────

/// Value recorded for one series in one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum YearValue {
    /// A parsed number.
    Value(f64),
    /// The cell held the missing-data sentinel.
    Missing,
    /// The cell was neither a number nor the sentinel; carries the raw text.
    Invalid(String),
}

impl YearValue {
    /// The numeric value, if one was recorded.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            YearValue::Value(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, YearValue::Missing)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, YearValue::Invalid(_))
    }

    /// Contribution to a group sum: missing counts as zero, invalid has none.
    pub fn summand(&self) -> Option<f64> {
        match self {
            YearValue::Value(v) => Some(*v),
            YearValue::Missing => Some(0.0),
            YearValue::Invalid(_) => None,
        }
    }
}

// ── NormalizedRecord ──────────────────────────────────────────────────────────

/// One series (category, family type or product) across all years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub series_key: String,
    /// Age group; only the household-income dataset sets it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_key: Option<String>,
    pub year_values: BTreeMap<i32, YearValue>,
}

impl NormalizedRecord {
    pub fn new(series_key: impl Into<String>) -> Self {
        Self {
            series_key: series_key.into(),
            secondary_key: None,
            year_values: BTreeMap::new(),
        }
    }

    /// Builder-style helper used heavily by tests and fixtures.
    pub fn with_value(mut self, year: i32, value: YearValue) -> Self {
        self.year_values.insert(year, value);
        self
    }

    pub fn with_secondary_key(mut self, key: impl Into<String>) -> Self {
        self.secondary_key = Some(key.into());
        self
    }

    pub fn value(&self, year: i32) -> Option<&YearValue> {
        self.year_values.get(&year)
    }
}

/// A year cell that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellWarning {
    /// 1-based data row index within the pass (header excluded).
    pub row: usize,
    pub column: String,
    pub raw: String,
}

/// Records and per-cell warnings produced by one normalization pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedDataset {
    pub kind: DatasetKind,
    pub records: Vec<NormalizedRecord>,
    #[serde(default)]
    pub warnings: Vec<CellWarning>,
}

impl NormalizedDataset {
    /// Every year any record mentions, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self
            .records
            .iter()
            .flat_map(|r| r.year_values.keys().copied())
            .collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    /// Distinct series keys in first-seen order.
    pub fn series_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for record in &self.records {
            if !keys.contains(&record.series_key.as_str()) {
                keys.push(record.series_key.as_str());
            }
        }
        keys
    }
}

// ── Grouping ──────────────────────────────────────────────────────────────────

/// One output group: a display name and the series summed into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub members: Vec<String>,
}

/// Ordered many-to-one mapping of series keys onto output groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDefinition {
    groups: Vec<Group>,
}

impl GroupDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a group. Order of calls is the legend order.
    pub fn with_group<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        members: impl IntoIterator<Item = S>,
    ) -> Self {
        self.groups.push(Group {
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// One group per series, named after the series itself.
    pub fn identity<S: Into<String>>(series: impl IntoIterator<Item = S>) -> Self {
        series.into_iter().fold(Self::new(), |defs, key| {
            let key: String = key.into();
            defs.with_group(key.clone(), [key])
        })
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

// ── YearRange ─────────────────────────────────────────────────────────────────

/// Inclusive year bounds; `None` means unbounded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub min: Option<i32>,
    pub max: Option<i32>,
}

impl YearRange {
    pub fn new(min: Option<i32>, max: Option<i32>) -> Self {
        Self {
            min: min.filter(|&y| y != 0),
            max: max.filter(|&y| y != 0),
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Build from selector values where `0` means "no bound".
    pub fn from_bounds(min: i32, max: i32) -> Self {
        Self::new(Some(min), Some(max))
    }

    pub fn contains(&self, year: i32) -> bool {
        self.min.map_or(true, |min| year >= min) && self.max.map_or(true, |max| year <= max)
    }
}

// ── Selection ─────────────────────────────────────────────────────────────────

/// Pre-aggregation record selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    /// Keep only records whose secondary key equals this value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_key: Option<String>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn secondary(key: impl Into<String>) -> Self {
        Self {
            secondary_key: Some(key.into()),
        }
    }

    pub fn matches(&self, record: &NormalizedRecord) -> bool {
        match &self.secondary_key {
            Some(wanted) => record.secondary_key.as_deref() == Some(wanted.as_str()),
            None => true,
        }
    }
}

// ── AggregatePoint ────────────────────────────────────────────────────────────

/// One surviving year's summed value per output group.
///
/// Group values live under their own `values` key, so any group name
/// (including `"year"`) serializes without clashing with the year field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatePoint {
    pub year: i32,
    pub values: BTreeMap<String, f64>,
}

impl AggregatePoint {
    pub fn value(&self, group: &str) -> Option<f64> {
        self.values.get(group).copied()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_row_lookup() {
        let row = RawRow::from_pairs([("Family type", "Couple families"), ("2019", "1,000")]);
        assert_eq!(row.get("2019"), Some("1,000"));
        assert_eq!(row.get("2020"), None);
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["Family type", "2019"]);
        assert!(!row.is_blank());
        assert!(RawRow::from_pairs([("a", " "), ("b", "")]).is_blank());
    }

    #[test]
    fn test_year_value_summand() {
        assert_eq!(YearValue::Value(12.0).summand(), Some(12.0));
        assert_eq!(YearValue::Missing.summand(), Some(0.0));
        assert_eq!(YearValue::Invalid("abc".into()).summand(), None);
    }

    #[test]
    fn test_year_range_zero_is_unbounded() {
        let range = YearRange::from_bounds(0, 0);
        assert_eq!(range, YearRange::unbounded());
        assert!(range.contains(1900));

        let range = YearRange::from_bounds(2012, 0);
        assert!(!range.contains(2011));
        assert!(range.contains(2030));
    }

    #[test]
    fn test_year_range_inclusive() {
        let range = YearRange::new(Some(2012), Some(2018));
        assert!(range.contains(2012));
        assert!(range.contains(2018));
        assert!(!range.contains(2019));
    }

    #[test]
    fn test_group_definition_order() {
        let groups = GroupDefinition::new()
            .with_group("Basic Needs", ["Shelter", "Health care"])
            .with_group("Total expenditure", ["Total expenditure"]);
        assert_eq!(groups.names(), vec!["Basic Needs", "Total expenditure"]);
        assert_eq!(groups.groups()[0].members.len(), 2);
    }

    #[test]
    fn test_group_definition_identity() {
        let groups = GroupDefinition::identity(["Eggs", "Milk"]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups.groups()[1].members, vec!["Milk".to_string()]);
    }

    #[test]
    fn test_record_filter() {
        let record = NormalizedRecord::new("Couple families").with_secondary_key("All ages");
        assert!(RecordFilter::all().matches(&record));
        assert!(RecordFilter::secondary("All ages").matches(&record));
        assert!(!RecordFilter::secondary("65 years and over").matches(&record));
    }

    #[test]
    fn test_aggregate_point_serializes_values_apart_from_year() {
        let point = AggregatePoint {
            year: 2015,
            values: BTreeMap::from([("Food".to_string(), 1500.0), ("year".to_string(), 7.0)]),
        };
        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "year": 2015, "values": { "Food": 1500.0, "year": 7.0 } })
        );

        let back: AggregatePoint = serde_json::from_value(json).unwrap();
        assert_eq!(back, point);
    }

    #[test]
    fn test_dataset_years_and_keys() {
        let dataset = NormalizedDataset {
            kind: DatasetKind::HouseholdSpending,
            records: vec![
                NormalizedRecord::new("Shelter")
                    .with_value(2019, YearValue::Value(1.0))
                    .with_value(2017, YearValue::Missing),
                NormalizedRecord::new("Shelter").with_value(2021, YearValue::Value(2.0)),
                NormalizedRecord::new("Food expenditures").with_value(2019, YearValue::Value(3.0)),
            ],
            warnings: vec![],
        };
        assert_eq!(dataset.years(), vec![2017, 2019, 2021]);
        assert_eq!(dataset.series_keys(), vec!["Shelter", "Food expenditures"]);
    }
}
