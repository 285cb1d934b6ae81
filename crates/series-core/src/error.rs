use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the household chart pipeline.
#[derive(Error, Debug)]
pub enum ChartsError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV text could not be decoded.
    #[error("Failed to decode CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A JSON document could not be parsed or written.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A metadata column required by the dataset schema is absent.
    #[error("Schema mismatch in {dataset}: missing column \"{column}\"")]
    SchemaMismatch { dataset: String, column: String },

    /// A column is neither a metadata column nor a recognisable year column.
    #[error("Unrecognised column in {dataset}: \"{column}\"")]
    UnrecognizedColumn { dataset: String, column: String },

    /// A chart identifier is not part of the catalog.
    #[error("Unknown chart: {0}")]
    UnknownChart(String),

    /// The expected dataset file does not exist.
    #[error("Dataset file not found: {0}")]
    DatasetNotFound(PathBuf),

    /// The data directory does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the chart crates.
pub type Result<T> = std::result::Result<T, ChartsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ChartsError::FileRead {
            path: PathBuf::from("/data/household_spending.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/data/household_spending.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_schema_mismatch() {
        let err = ChartsError::SchemaMismatch {
            dataset: "household income".to_string(),
            column: "Family type".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Schema mismatch in household income: missing column \"Family type\""
        );
    }

    #[test]
    fn test_error_display_unrecognized_column() {
        let err = ChartsError::UnrecognizedColumn {
            dataset: "household spending".to_string(),
            column: "Geography".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unrecognised column in household spending: \"Geography\""
        );
    }

    #[test]
    fn test_error_display_unknown_chart() {
        let err = ChartsError::UnknownChart("pie".to_string());
        assert_eq!(err.to_string(), "Unknown chart: pie");
    }

    #[test]
    fn test_error_display_dataset_not_found() {
        let err = ChartsError::DatasetNotFound(PathBuf::from("/data/product_cost.csv"));
        assert_eq!(err.to_string(), "Dataset file not found: /data/product_cost.csv");
    }

    #[test]
    fn test_error_display_config() {
        let err = ChartsError::Config("min year after max year".to_string());
        assert_eq!(err.to_string(), "Configuration error: min year after max year");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ChartsError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: ChartsError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
