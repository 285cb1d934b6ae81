use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ChartsError, Result};
use crate::models::YearRange;
use crate::schema::ContentType;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Aggregate Canadian household income, spending and product-cost tables
/// into plotting-ready yearly series
#[derive(Parser, Debug, Clone)]
#[command(
    name = "household-charts",
    about = "Aggregate Canadian household income, spending and product-cost tables into chart series",
    version
)]
pub struct Settings {
    /// Directory holding the CSV datasets
    #[arg(long, env = "HOUSEHOLD_CHARTS_DATA")]
    pub data_dir: Option<PathBuf>,

    /// Render a single chart from the catalog (default: every chart of --content)
    #[arg(long)]
    pub chart: Option<String>,

    /// Content type to render
    #[arg(long, default_value = "all", value_parser = ["all", "income", "spending"])]
    pub content: String,

    /// Earliest year to keep (0 = no lower bound)
    #[arg(long, default_value = "0")]
    pub min_year: i32,

    /// Latest year to keep (0 = no upper bound)
    #[arg(long, default_value = "0")]
    pub max_year: i32,

    /// Output format
    #[arg(long, default_value = "table", value_parser = ["table", "json"])]
    pub format: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.household-charts/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl LastUsedParams {
    /// Default path: `~/.household-charts/last_used.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".household-charts").join("last_used.json")
    }

    /// Load persisted params from the default path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    pub fn clear() -> Result<()> {
        Self::clear_at(&Self::config_path())
    }

    pub fn clear_at(path: &std::path::Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation; accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!(error = %e, "failed to clear saved configuration");
            }
            return Self::apply_debug(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins. 'chart' is never loaded from last-used.
        if !is_arg_explicitly_set(&matches, "content") {
            if let Some(v) = last.content {
                settings.content = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "format") {
            if let Some(v) = last.format {
                settings.format = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "min_year") {
            if let Some(v) = last.min_year {
                settings.min_year = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "max_year") {
            if let Some(v) = last.max_year {
                settings.max_year = v;
            }
        }
        let persisted_data_dir = last.data_dir;
        if settings.data_dir.is_none() {
            settings.data_dir = persisted_data_dir.clone();
        }

        settings = Self::apply_debug(settings);

        let params = params_to_persist(&settings, &matches, persisted_data_dir);
        if let Err(e) = params.save_to(config_path) {
            tracing::warn!(error = %e, "failed to persist last-used parameters");
        }

        settings
    }

    /// The year bounds selected on the command line; `0` means unbounded.
    pub fn year_range(&self) -> YearRange {
        YearRange::from_bounds(self.min_year, self.max_year)
    }

    pub fn content_type(&self) -> ContentType {
        self.content.parse().unwrap_or(ContentType::All)
    }

    /// Reject contradictory selections before any data is loaded.
    pub fn validate(&self) -> Result<()> {
        let range = self.year_range();
        if let (Some(min), Some(max)) = (range.min, range.max) {
            if min > max {
                return Err(ChartsError::Config(format!(
                    "--min-year {} is after --max-year {}",
                    min, max
                )));
            }
        }
        Ok(())
    }

    /// `--debug` overrides the log level.
    fn apply_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            content: Some(s.content.clone()),
            format: Some(s.format.clone()),
            min_year: Some(s.min_year),
            max_year: Some(s.max_year),
            data_dir: s.data_dir.clone(),
        }
    }
}

/// Parameters to write back after a run. `data_dir` is only replaced when it
/// was given with `--data-dir`; a value from `HOUSEHOLD_CHARTS_DATA` must not
/// outlive the environment it came from.
fn params_to_persist(
    settings: &Settings,
    matches: &clap::ArgMatches,
    previous_data_dir: Option<PathBuf>,
) -> LastUsedParams {
    let mut params = LastUsedParams::from(settings);
    if !is_arg_explicitly_set(matches, "data_dir") {
        params.data_dir = previous_data_dir;
    }
    params
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
