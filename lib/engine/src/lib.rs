//! # anomX Engine
//!
//! Reactive orchestration for the anomX analysis pipeline.
//!
//! This crate binds the model and filter layers into a session with
//! explicit state transitions and single-flight filter recomputation:
//!
//! - [`AnalysisSession`] - holds schema, parameters, filter spec and the
//!   latest scored collection; enforces the invalidation rules
//! - [`FilterReactor`] - worker that recomputes the filtered view and
//!   histogram for the newest filter spec, discarding superseded results
//!
//! ## Example
//!
//! ```rust
//! use anomx_engine::AnalysisSession;
//! use anomx_core::{FilterSpec, Predicate, RawTable};
//! use anomx_model::AnalysisSchema;
//! use serde_json::json;
//!
//! let table = RawTable::new(
//!     vec!["amount".to_string()],
//!     (0..64).map(|i| vec![json!(100.0 + (i % 7) as f64)]).collect(),
//! ).unwrap();
//!
//! let session = AnalysisSession::new();
//! session.configure(table, &AnalysisSchema::new("amount")).unwrap();
//! session.run_analysis().unwrap();
//!
//! let _ = session.set_filter(FilterSpec::new().with(Predicate::Range {
//!     field: "amount".to_string(),
//!     min: Some(103.0),
//!     max: None,
//! }));
//! session.flush_filters();
//! let update = session.latest_view().unwrap();
//! assert!(update.view.len() < 64);
//! ```

pub mod reactor;
pub mod session;

pub use reactor::{FilterReactor, FilterUpdate};
pub use session::{AnalysisSession, SessionState};
