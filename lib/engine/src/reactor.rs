// Single-flight filter recomputation on a dedicated worker thread.
//
// A submitted job lands in a one-slot pending queue: a newer submission
// replaces anything still waiting, and a generation counter lets the worker
// discard results whose spec was superseded mid-computation. Consumers only
// ever observe the result for the latest submitted spec.

use anomx_core::{
    apply_filter, score_histogram, FilterSpec, FilteredView, Histogram, ScoredCollection,
    DEFAULT_BINS,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use tracing::debug;

/// The published outcome of one filter recomputation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterUpdate {
    /// Generation of the spec this update was computed for.
    pub generation: u64,
    pub spec: FilterSpec,
    pub view: FilteredView,
    pub histogram: Histogram,
}

struct Job {
    generation: u64,
    collection: Arc<ScoredCollection>,
    spec: FilterSpec,
}

struct State {
    pending: Option<Job>,
    busy: bool,
    shutdown: bool,
}

struct Shared {
    state: Mutex<State>,
    condvar: Condvar,
    generation: AtomicU64,
    bins: usize,
    latest: parking_lot::RwLock<Option<Arc<FilterUpdate>>>,
}

/// Worker that recomputes the filtered view and histogram for the newest
/// submitted filter spec.
pub struct FilterReactor {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl FilterReactor {
    pub fn new() -> Self {
        Self::with_bins(DEFAULT_BINS)
    }

    pub fn with_bins(bins: usize) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                pending: None,
                busy: false,
                shutdown: false,
            }),
            condvar: Condvar::new(),
            generation: AtomicU64::new(0),
            bins,
            latest: parking_lot::RwLock::new(None),
        });

        let worker = shared.clone();
        let handle = thread::Builder::new()
            .name("filter-reactor".to_string())
            .spawn(move || worker_loop(worker))
            .expect("failed to spawn filter reactor thread");

        Self {
            shared,
            handle: Some(handle),
        }
    }

    /// Queue a recomputation for `spec` over `collection`.
    ///
    /// Replaces any job still pending; returns the generation assigned to
    /// this spec. Only the newest generation's result will ever be
    /// published.
    pub fn submit(&self, collection: Arc<ScoredCollection>, spec: FilterSpec) -> u64 {
        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let mut state = self.shared.state.lock().unwrap();
        if let Some(old) = state.pending.replace(Job {
            generation,
            collection,
            spec,
        }) {
            debug!(superseded = old.generation, "pending filter job replaced");
        }
        self.shared.condvar.notify_all();
        generation
    }

    /// Newest published update, if any.
    pub fn latest(&self) -> Option<Arc<FilterUpdate>> {
        self.shared.latest.read().clone()
    }

    /// Invalidate everything: drop any pending job, forget the published
    /// update, and supersede any in-flight computation.
    pub fn reset(&self) {
        // Bump first so an in-flight job fails its publish check.
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        {
            let mut state = self.shared.state.lock().unwrap();
            state.pending = None;
        }
        *self.shared.latest.write() = None;
    }

    /// Block until no job is pending or running.
    pub fn flush(&self) {
        let mut state = self.shared.state.lock().unwrap();
        while state.pending.is_some() || state.busy {
            state = self.shared.condvar.wait(state).unwrap();
        }
    }
}

impl Default for FilterReactor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FilterReactor {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            state.shutdown = true;
            self.shared.condvar.notify_all();
        }
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let job = {
            let mut state = shared.state.lock().unwrap();
            loop {
                if let Some(job) = state.pending.take() {
                    state.busy = true;
                    break job;
                }
                if state.shutdown {
                    return;
                }
                state = shared.condvar.wait(state).unwrap();
            }
        };

        let view = apply_filter(&job.collection, &job.spec);
        let histogram = score_histogram(&job.collection, &view, shared.bins);

        {
            // Generation check and publish under one lock; reset() takes
            // the same lock after bumping the generation.
            let mut latest = shared.latest.write();
            if shared.generation.load(Ordering::Acquire) == job.generation {
                *latest = Some(Arc::new(FilterUpdate {
                    generation: job.generation,
                    spec: job.spec,
                    view,
                    histogram,
                }));
            } else {
                debug!(
                    generation = job.generation,
                    "discarding superseded filter result"
                );
            }
        }

        let mut state = shared.state.lock().unwrap();
        state.busy = false;
        shared.condvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anomx_core::{DropCounts, Predicate, ScoredRecord};
    use serde_json::json;

    fn collection() -> Arc<ScoredCollection> {
        let records = (0..10)
            .map(|i| ScoredRecord {
                index: i,
                values: vec![json!(i as f64 * 10.0)],
                score: 0.1 * i as f64,
                is_anomaly: i >= 8,
            })
            .collect();
        Arc::new(ScoredCollection::new(
            vec!["amount".to_string()],
            records,
            DropCounts::default(),
        ))
    }

    fn range_spec(min: f64) -> FilterSpec {
        FilterSpec::new().with(Predicate::Range {
            field: "amount".to_string(),
            min: Some(min),
            max: None,
        })
    }

    #[test]
    fn test_submit_publishes_result() {
        let reactor = FilterReactor::new();
        let generation = reactor.submit(collection(), range_spec(50.0));
        reactor.flush();

        let update = reactor.latest().expect("update published");
        assert_eq!(update.generation, generation);
        assert_eq!(update.view.len(), 5);
        assert_eq!(update.histogram.filtered_counts().iter().sum::<u64>(), 5);
    }

    #[test]
    fn test_burst_only_latest_spec_wins() {
        let reactor = FilterReactor::new();
        let c = collection();
        for min in [10.0, 20.0, 30.0, 40.0] {
            reactor.submit(c.clone(), range_spec(min));
        }
        let last = reactor.submit(c.clone(), range_spec(80.0));
        reactor.flush();

        let update = reactor.latest().expect("update published");
        assert_eq!(update.generation, last);
        assert_eq!(update.view.len(), 2);
    }

    #[test]
    fn test_reset_clears_published_state() {
        let reactor = FilterReactor::new();
        reactor.submit(collection(), FilterSpec::new());
        reactor.flush();
        assert!(reactor.latest().is_some());

        reactor.reset();
        assert!(reactor.latest().is_none());
    }

    #[test]
    fn test_flush_on_idle_reactor_returns() {
        let reactor = FilterReactor::new();
        reactor.flush();
        assert!(reactor.latest().is_none());
    }
}
