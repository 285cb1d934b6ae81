//! Data layer for the household chart pipeline.
//!
//! Responsible for locating and decoding the CSV datasets, normalizing raw
//! rows into per-series year maps, aggregating series into chart groups and
//! deriving the shapes a renderer consumes.

pub mod aggregator;
pub mod charts;
pub mod normalizer;
pub mod reader;
pub mod shape;

pub use series_core as core;
