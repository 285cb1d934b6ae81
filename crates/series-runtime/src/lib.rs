//! Runtime layer for household charts.
//!
//! Owns the TTL-cached dataset manager and the async render session that
//! keeps only the most recent chart request.

pub mod data_manager;
pub mod render_session;

pub use series_core as core;
pub use series_data as data;

pub use data_manager::DataManager;
pub use render_session::{RenderOutcome, RenderSession, RenderUpdate};
