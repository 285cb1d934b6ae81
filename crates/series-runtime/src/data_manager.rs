//! TTL-cached dataset manager.
//!
//! Wraps [`load_dataset`] with a per-dataset time-to-live cache and retry
//! logic. Callers use [`DataManager::get_dataset`] to obtain a fresh-or-cached
//! [`NormalizedDataset`]; the manager handles staleness checks, up to three
//! load attempts with back-off for I/O failures, and falls back to the
//! previous cache when a reload fails.
//!
//! Every load runs a brand-new normalization pass, so carry-forward state
//! from one load never reaches another.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use series_core::error::{ChartsError, Result};
use series_core::models::NormalizedDataset;
use series_core::schema::DatasetKind;
use series_data::reader::load_dataset;

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Default cache TTL in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Maximum number of load attempts before giving up.
const MAX_RETRY_ATTEMPTS: u32 = 3;

struct CacheEntry {
    dataset: Arc<NormalizedDataset>,
    loaded_at: Instant,
}

// ── DataManager ───────────────────────────────────────────────────────────────

/// TTL-cached access to the three datasets of one data directory.
///
/// # Example
/// ```no_run
/// use series_core::schema::DatasetKind;
/// use series_runtime::data_manager::DataManager;
///
/// let mut mgr = DataManager::new("data", 300);
/// if let Ok(dataset) = mgr.get_dataset(DatasetKind::HouseholdSpending, false) {
///     println!("records: {}", dataset.records.len());
/// }
/// ```
pub struct DataManager {
    data_dir: PathBuf,
    cache_ttl: Duration,
    cache: HashMap<DatasetKind, CacheEntry>,
    /// Human-readable description of the last load error.
    last_error: Option<String>,
}

impl DataManager {
    pub fn new(data_dir: impl Into<PathBuf>, cache_ttl_secs: u64) -> Self {
        Self {
            data_dir: data_dir.into(),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            cache: HashMap::new(),
            last_error: None,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Return the dataset `kind`, using the cache when it is still valid.
    ///
    /// When `force_refresh` is `true` the cache is bypassed. When a reload
    /// fails because the file could not be read (or is briefly absent) and a
    /// previous copy is cached, that copy is returned instead of the error.
    /// Schema and decode errors are always returned.
    pub fn get_dataset(
        &mut self,
        kind: DatasetKind,
        force_refresh: bool,
    ) -> Result<Arc<NormalizedDataset>> {
        if !force_refresh && self.is_cache_valid(kind) {
            tracing::debug!(dataset = kind.label(), "returning cached dataset");
            if let Some(entry) = self.cache.get(&kind) {
                return Ok(Arc::clone(&entry.dataset));
            }
        }

        match self.load_with_retry(kind) {
            Ok(dataset) => {
                tracing::debug!(
                    dataset = kind.label(),
                    records = dataset.records.len(),
                    warnings = dataset.warnings.len(),
                    "dataset cache updated"
                );
                let dataset = Arc::new(dataset);
                self.cache.insert(
                    kind,
                    CacheEntry {
                        dataset: Arc::clone(&dataset),
                        loaded_at: Instant::now(),
                    },
                );
                self.last_error = None;
                Ok(dataset)
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                match self.cache.get(&kind) {
                    Some(entry) if serves_stale_cache(&e) => {
                        tracing::warn!(error = %e, dataset = kind.label(), "load failed; falling back to cached data");
                        Ok(Arc::clone(&entry.dataset))
                    }
                    _ => Err(e),
                }
            }
        }
    }

    /// Discard every cached dataset.
    pub fn invalidate_cache(&mut self) {
        self.cache.clear();
        tracing::debug!("cache invalidated");
    }

    /// Age of the cached copy of `kind`, or `None` if it was never loaded.
    pub fn cache_age(&self, kind: DatasetKind) -> Option<Duration> {
        self.cache.get(&kind).map(|entry| entry.loaded_at.elapsed())
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // ── Private helpers ───────────────────────────────────────────────────

    fn is_cache_valid(&self, kind: DatasetKind) -> bool {
        self.cache
            .get(&kind)
            .map(|entry| entry.loaded_at.elapsed() < self.cache_ttl)
            .unwrap_or(false)
    }

    /// Back-off schedule: attempt 1 → 0 ms, attempt 2 → 100 ms, attempt 3 → 200 ms.
    /// Schema and decode errors are returned at once; retrying cannot fix them.
    fn load_with_retry(&self, kind: DatasetKind) -> Result<NormalizedDataset> {
        let mut attempt = 0u32;
        loop {
            if attempt > 0 {
                let sleep_ms = u64::from(attempt) * 100;
                tracing::debug!(attempt, sleep_ms, "retrying load after back-off");
                thread::sleep(Duration::from_millis(sleep_ms));
            }

            match load_dataset(&self.data_dir, kind) {
                Ok(dataset) => return Ok(dataset),
                Err(e) if is_transient(&e) && attempt + 1 < MAX_RETRY_ATTEMPTS => {
                    tracing::warn!(attempt, error = %e, "load attempt failed");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_transient(err: &ChartsError) -> bool {
    matches!(err, ChartsError::FileRead { .. } | ChartsError::Io(_))
}

/// Failures that leave the previously loaded copy trustworthy. A file that
/// no longer matches its schema does not.
fn serves_stale_cache(err: &ChartsError) -> bool {
    is_transient(err) || matches!(err, ChartsError::DatasetNotFound(_))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
