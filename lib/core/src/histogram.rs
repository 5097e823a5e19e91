use crate::filter::FilteredView;
use crate::record::ScoredCollection;
use serde::{Deserialize, Serialize};

/// Default number of score bins.
pub const DEFAULT_BINS: usize = 30;

/// Fixed-width histogram over anomaly scores.
///
/// Bin edges span the score range of the *full* scored collection, not the
/// filtered subset, so edges are stable across filter changes. Counts are
/// reported twice: for the full collection and restricted to the filtered
/// subset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Histogram {
    edges: Vec<f64>,
    full: Vec<u64>,
    filtered: Vec<u64>,
}

impl Histogram {
    #[inline]
    #[must_use]
    pub fn bins(&self) -> usize {
        self.full.len()
    }

    /// Bin edges, `bins() + 1` entries.
    #[inline]
    #[must_use]
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    #[inline]
    #[must_use]
    pub fn full_counts(&self) -> &[u64] {
        &self.full
    }

    #[inline]
    #[must_use]
    pub fn filtered_counts(&self) -> &[u64] {
        &self.filtered
    }
}

/// Compute the score histogram for a collection and a filtered view of it.
///
/// Pure function of its inputs. A degenerate score range (all scores equal)
/// places every record in the last bin.
pub fn score_histogram(
    collection: &ScoredCollection,
    view: &FilteredView,
    bins: usize,
) -> Histogram {
    let bins = bins.max(1);
    let (lo, hi) = collection.score_range();
    let width = (hi - lo) / bins as f64;

    let edges = (0..=bins)
        .map(|i| lo + width * i as f64)
        .collect::<Vec<_>>();

    let bin_of = |score: f64| -> usize {
        if width > 0.0 {
            (((score - lo) / width) as usize).min(bins - 1)
        } else {
            bins - 1
        }
    };

    let mut full = vec![0u64; bins];
    for record in collection.records() {
        full[bin_of(record.score)] += 1;
    }

    let mut filtered = vec![0u64; bins];
    for record in &view.records {
        filtered[bin_of(record.score)] += 1;
    }

    Histogram {
        edges,
        full,
        filtered,
    }
}
