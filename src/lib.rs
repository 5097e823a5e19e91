//! # anomX
//!
//! Schema-driven anomaly scoring and reactive filtering for tabular
//! transaction data.
//!
//! anomX ingests a parsed table with a user-configured schema (amount,
//! optional date, optional categorical columns), derives numeric features,
//! fits an isolation-forest ensemble that assigns every record an anomaly
//! score in [0, 1] and a binary label, and exposes the scored dataset to a
//! composable predicate filter layer that recomputes a filtered view and a
//! score histogram whenever any filter parameter changes.
//!
//! ## Quick Start
//!
//! ```rust
//! use anomx::prelude::*;
//! use serde_json::json;
//!
//! // A parsed table (decoding CSV/spreadsheets is the caller's job).
//! let mut rows: Vec<Vec<serde_json::Value>> = (0..100)
//!     .map(|i| vec![json!(100.0 + (i % 9) as f64), json!("FR")])
//!     .collect();
//! rows.push(vec![json!(50_000.0), json!("DE")]);
//! let table = RawTable::new(
//!     vec!["amount".to_string(), "country".to_string()],
//!     rows,
//! ).unwrap();
//!
//! // Bind roles, score, filter.
//! let schema = AnalysisSchema::new("amount").with_categories(["country"]);
//! let bound = schema.bind(&table).unwrap();
//! let params = ModelParameters { contamination: 0.01, ..Default::default() };
//! let scored = run_analysis(&bound, &table, &params).unwrap();
//!
//! let spec = FilterSpec::new().with(Predicate::Set {
//!     field: "country".to_string(),
//!     values: vec!["DE".to_string()],
//! });
//! let view = apply_filter(&scored, &spec);
//! let histogram = score_histogram(&scored, &view, DEFAULT_BINS);
//! assert_eq!(view.len(), 1);
//! assert_eq!(histogram.full_counts().iter().sum::<u64>(), 101);
//! ```
//!
//! ## Crate Structure
//!
//! anomX is composed of several crates:
//!
//! - [`anomx-core`](https://docs.rs/anomx-core) - Tables, scored records, predicate filtering, histograms
//! - [`anomx-model`](https://docs.rs/anomx-model) - Schema binding, feature derivation, isolation forest
//! - [`anomx-engine`](https://docs.rs/anomx-engine) - Session state machine, single-flight filter reactor
//!
//! ## Features
//!
//! - **Configurable schema**: map raw columns to amount/date/categorical roles
//! - **Isolation forest**: seeded, reproducible, per-tree parallel fit
//! - **Composable filters**: range, set, substring and date-range predicates
//! - **Stable histograms**: bin edges frozen per scoring pass
//! - **Reactive sessions**: invalidate-on-success state machine with
//!   single-flight filter recomputation

// Re-export core types
pub use anomx_core::{
    apply_filter, score_histogram, DropCounts, Error, FilterSpec, FilterWarning, FilteredView,
    Histogram, Predicate, RawTable, Result, ScoredCollection, ScoredRecord, DEFAULT_BINS,
    MATCH_ALL, SCORE_FIELD,
};

// Re-export model
pub use anomx_model::{
    derive_features, run_analysis, AnalysisSchema, BoundSchema, Derivation, IsolationForest,
    ModelParameters, StandardScaler,
};

// Re-export engine
pub use anomx_engine::{AnalysisSession, FilterReactor, FilterUpdate, SessionState};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        apply_filter, run_analysis, score_histogram, AnalysisSchema, AnalysisSession, BoundSchema,
        Error, FilterReactor, FilterSpec, FilterUpdate, FilteredView, Histogram, ModelParameters,
        Predicate, RawTable, Result, ScoredCollection, ScoredRecord, SessionState, DEFAULT_BINS,
        MATCH_ALL, SCORE_FIELD,
    };
}
