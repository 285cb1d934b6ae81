//! CSV discovery and loading for the household datasets.
//!
//! Statistics Canada exports are ragged: continuation rows are often shorter
//! than the header and some carry trailing empty cells. Rows are padded or
//! truncated to the header width so every [`RawRow`] has the full column set.

use std::io::Read;
use std::path::{Path, PathBuf};

use series_core::error::{ChartsError, Result};
use series_core::models::{NormalizedDataset, RawRow, RawTable};
use series_core::schema::DatasetKind;
use tracing::{debug, warn};

use crate::normalizer::normalize_table;

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all `.csv` files recursively under `data_path`, sorted by path.
pub fn find_csv_files(data_path: &Path) -> Vec<PathBuf> {
    if !data_path.exists() {
        warn!("Data path does not exist: {}", data_path.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Locate the file for `kind` under `data_dir`.
///
/// The fixed file name directly inside `data_dir` wins; otherwise the first
/// match found by a recursive search is used.
pub fn resolve_dataset_path(data_dir: &Path, kind: DatasetKind) -> Result<PathBuf> {
    if !data_dir.is_dir() {
        return Err(ChartsError::DataPathNotFound(data_dir.to_path_buf()));
    }

    let direct = data_dir.join(kind.file_name());
    if direct.is_file() {
        return Ok(direct);
    }

    find_csv_files(data_dir)
        .into_iter()
        .find(|p| p.file_name().map(|n| n == kind.file_name()).unwrap_or(false))
        .ok_or(ChartsError::DatasetNotFound(direct))
}

/// Decode CSV text already held in memory.
pub fn parse_raw_rows(text: &str) -> Result<RawTable> {
    read_table(text.as_bytes())
}

/// Read and decode a CSV file from disk.
pub fn read_raw_rows(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).map_err(|source| ChartsError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let table = read_table(file)?;
    debug!(
        "Read {} rows × {} columns from {}",
        table.rows.len(),
        table.header.len(),
        path.display()
    );
    Ok(table)
}

/// Load, validate and normalize the dataset `kind` from `data_dir`.
pub fn load_dataset(data_dir: &Path, kind: DatasetKind) -> Result<NormalizedDataset> {
    let path = resolve_dataset_path(data_dir, kind)?;
    let table = read_raw_rows(&path)?;
    normalize_table(kind, &table)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn read_table<R: Read>(input: R) -> Result<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(input);

    let header: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows: Vec<RawRow> = Vec::new();
    let mut padded = 0usize;
    let mut truncated = 0usize;

    for record in rdr.records() {
        let record = record?;
        if record.len() < header.len() {
            padded += 1;
        } else if record.len() > header.len() {
            truncated += 1;
        }

        let row = RawRow::new(
            header
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), record.get(i).unwrap_or("").to_string()))
                .collect(),
        );
        if row.is_blank() {
            continue;
        }
        rows.push(row);
    }

    if padded > 0 || truncated > 0 {
        debug!(padded, truncated, "ragged CSV rows reshaped to header width");
    }

    Ok(RawTable { header, rows })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
