//! Analysis session state machine
//!
//! Holds the current schema, model parameters, filter spec and the most
//! recent scored collection, and drives the recomputation rules:
//!
//! - `Unconfigured -> SchemaBound` on a successful bind
//! - `SchemaBound -> Scored` on an explicit, successful analysis run
//! - `Scored -> Scored` on every filter mutation (filter engine only)
//! - any schema or parameter change falls back to `SchemaBound` and
//!   discards the scored collection
//!
//! Failed operations leave prior state untouched; derived state is only
//! ever invalidated by a successful reconfiguration, never served stale.

use crate::reactor::{FilterReactor, FilterUpdate};
use anomx_core::{
    apply_filter, score_histogram, Error, FilterSpec, FilteredView, Histogram, RawTable, Result,
    ScoredCollection, DEFAULT_BINS,
};
use anomx_model::{run_analysis, AnalysisSchema, BoundSchema, ModelParameters};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Unconfigured,
    SchemaBound,
    Scored,
}

struct Inner {
    table: Option<Arc<RawTable>>,
    schema: Option<BoundSchema>,
    params: ModelParameters,
    filter: FilterSpec,
    scored: Option<Arc<ScoredCollection>>,
    state: SessionState,
}

/// One analysis session: ingest a table with a schema, score it on demand,
/// and react to filter changes.
///
/// The session processes one parameter-change event at a time to
/// completion; only the scoring internals parallelize. The epoch counter
/// guards the expensive step: a reconfiguration that lands while a scoring
/// run is in flight bumps the epoch, and the run's result is discarded
/// instead of installed.
pub struct AnalysisSession {
    inner: RwLock<Inner>,
    epoch: AtomicU64,
    reactor: FilterReactor,
    bins: usize,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self::with_bins(DEFAULT_BINS)
    }

    pub fn with_bins(bins: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                table: None,
                schema: None,
                params: ModelParameters::default(),
                filter: FilterSpec::new(),
                scored: None,
                state: SessionState::Unconfigured,
            }),
            epoch: AtomicU64::new(0),
            reactor: FilterReactor::with_bins(bins),
            bins,
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.read().state
    }

    pub fn parameters(&self) -> ModelParameters {
        self.inner.read().params.clone()
    }

    /// Most recent scored collection, if the session is in `Scored`.
    pub fn scored(&self) -> Option<Arc<ScoredCollection>> {
        self.inner.read().scored.clone()
    }

    /// Bind a schema against a table and install both.
    ///
    /// On success the session is `SchemaBound` and any prior scored
    /// collection is discarded; on failure nothing changes.
    pub fn configure(&self, table: RawTable, schema: &AnalysisSchema) -> Result<()> {
        let bound = schema.bind(&table)?;

        let mut inner = self.inner.write();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.reactor.reset();
        inner.table = Some(Arc::new(table));
        inner.schema = Some(bound);
        inner.scored = None;
        inner.state = SessionState::SchemaBound;
        info!("session configured, schema bound");
        Ok(())
    }

    /// Replace the model parameters.
    ///
    /// A reconfiguration invalidates any scored collection and falls back
    /// to `SchemaBound`. Invalid parameters are rejected without touching
    /// state.
    pub fn set_parameters(&self, params: ModelParameters) -> Result<()> {
        params.validate()?;

        let mut inner = self.inner.write();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        inner.params = params;
        if inner.state == SessionState::Scored {
            self.reactor.reset();
            inner.scored = None;
            inner.state = SessionState::SchemaBound;
            info!("parameters changed, scored collection discarded");
        }
        Ok(())
    }

    /// Run the scoring pass for the bound schema and current parameters.
    ///
    /// Scoring is the expensive step and is only ever triggered explicitly.
    /// The lock is not held while scoring; if a reconfiguration supersedes
    /// the run before it completes, its result is discarded and
    /// [`Error::Superseded`] returned.
    pub fn run_analysis(&self) -> Result<Arc<ScoredCollection>> {
        let (table, schema, params, epoch) = {
            let inner = self.inner.read();
            if inner.state == SessionState::Unconfigured {
                return Err(Error::InvalidState("schema must be bound before analysis"));
            }
            (
                inner.table.clone().expect("table set when configured"),
                inner.schema.clone().expect("schema set when configured"),
                inner.params.clone(),
                self.epoch.load(Ordering::Acquire),
            )
        };

        let scored = Arc::new(run_analysis(&schema, &table, &params)?);

        let mut inner = self.inner.write();
        if self.epoch.load(Ordering::Acquire) != epoch {
            warn!("scoring run superseded by reconfiguration, result discarded");
            return Err(Error::Superseded);
        }
        inner.scored = Some(scored.clone());
        inner.state = SessionState::Scored;
        // Refresh the published view for the filter currently in effect.
        self.reactor.submit(scored.clone(), inner.filter.clone());
        Ok(scored)
    }

    /// Install a new filter spec.
    ///
    /// In `Scored`, triggers exactly one single-flight recomputation and
    /// returns its generation; in earlier states the spec is stored and
    /// applied once scoring has run.
    pub fn set_filter(&self, spec: FilterSpec) -> Option<u64> {
        let mut inner = self.inner.write();
        inner.filter = spec.clone();
        match &inner.scored {
            Some(scored) => Some(self.reactor.submit(scored.clone(), spec)),
            None => None,
        }
    }

    /// Newest published filter result, if any.
    pub fn latest_view(&self) -> Option<Arc<FilterUpdate>> {
        self.reactor.latest()
    }

    /// Block until the reactor has no pending or running recomputation.
    pub fn flush_filters(&self) {
        self.reactor.flush();
    }

    /// Synchronous filtering path: evaluate the current spec immediately,
    /// bypassing the reactor. For callers on the cooperative (one event at
    /// a time) path.
    pub fn filter_now(&self) -> Result<(FilteredView, Histogram)> {
        let inner = self.inner.read();
        let scored = inner
            .scored
            .as_ref()
            .ok_or(Error::InvalidState("no scored collection to filter"))?;
        let view = apply_filter(scored, &inner.filter);
        let histogram = score_histogram(scored, &view, self.bins);
        Ok((view, histogram))
    }
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}
