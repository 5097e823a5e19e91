//! # anomX Core
//!
//! Core library for the anomX anomaly analysis engine.
//!
//! This crate provides the fundamental data structures shared by the model
//! and engine crates:
//!
//! - [`RawTable`] - A parsed tabular structure (ordered columns + rows)
//! - [`ScoredRecord`] / [`ScoredCollection`] - Records after a scoring pass
//! - [`FilterSpec`] / [`apply_filter`] - Composable predicate filtering
//! - [`Histogram`] / [`score_histogram`] - Score distribution aggregates
//!
//! ## Example
//!
//! ```rust
//! use anomx_core::{apply_filter, FilterSpec, Predicate};
//! use anomx_core::{DropCounts, ScoredCollection, ScoredRecord};
//! use serde_json::json;
//!
//! let records = vec![
//!     ScoredRecord { index: 0, values: vec![json!(50.0)], score: 0.42, is_anomaly: false },
//!     ScoredRecord { index: 1, values: vec![json!(150.0)], score: 0.81, is_anomaly: true },
//! ];
//! let collection = ScoredCollection::new(
//!     vec!["amount".to_string()],
//!     records,
//!     DropCounts::default(),
//! );
//!
//! let spec = FilterSpec::new().with(Predicate::Range {
//!     field: "amount".to_string(),
//!     min: Some(100.0),
//!     max: Some(200.0),
//! });
//! let view = apply_filter(&collection, &spec);
//! assert_eq!(view.len(), 1);
//! ```

pub mod coerce;
pub mod error;
pub mod filter;
pub mod histogram;
pub mod record;
pub mod table;

pub use error::{Error, Result};
pub use filter::{
    apply_filter, FilterSpec, FilterWarning, FilteredView, Predicate, MATCH_ALL, SCORE_FIELD,
};
pub use histogram::{score_histogram, Histogram, DEFAULT_BINS};
pub use record::{DropCounts, ScoredCollection, ScoredRecord};
pub use table::RawTable;
