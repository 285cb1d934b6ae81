//! Shared data model for the household chart pipeline.
//!
//! Holds the row and record types passed between normalization and
//! aggregation, the three dataset schemas, the crate-wide error type, CLI
//! settings and number formatting.

pub mod error;
pub mod formatting;
pub mod models;
pub mod schema;
pub mod settings;

pub use error::{ChartsError, Result};
