//! Isolation forest ensemble
//!
//! Assigns an anomaly score to every standardized feature vector by
//! averaging isolation depths over an ensemble of randomized trees. Trees
//! are stored as index-based node arenas and built in parallel; record
//! scores are an average over trees, so construction order never affects
//! the result.

use anomx_core::{Error, Result};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Euler-Mascheroni constant, used by the expected-path-length adjustment.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Default ensemble size.
pub const DEFAULT_TREE_COUNT: usize = 100;

/// Default subsample ceiling; the effective size is `min(256, n)`.
pub const DEFAULT_SUBSAMPLE: usize = 256;

/// Ensemble parameters for one scoring pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelParameters {
    /// Expected anomaly fraction, in (0, 0.5]. Sets the classification
    /// cutoff: the top `round(contamination * n)` scores are labeled.
    pub contamination: f64,
    pub tree_count: usize,
    /// Per-tree subsample size; `None` means `min(256, record count)`.
    pub subsample_size: Option<usize>,
    pub seed: u64,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            contamination: 0.01,
            tree_count: DEFAULT_TREE_COUNT,
            subsample_size: None,
            seed: 42,
        }
    }
}

impl ModelParameters {
    pub fn validate(&self) -> Result<()> {
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(Error::InvalidParameter(format!(
                "contamination must be in (0, 0.5], got {}",
                self.contamination
            )));
        }
        if self.tree_count < 1 {
            return Err(Error::InvalidParameter(
                "tree_count must be at least 1".to_string(),
            ));
        }
        if let Some(m) = self.subsample_size {
            if m < 2 {
                return Err(Error::InvalidParameter(format!(
                    "subsample_size must be at least 2, got {m}"
                )));
            }
        }
        Ok(())
    }
}

/// Expected path length of an unsuccessful search in a BST of `n` points;
/// the adjustment credited to branches cut short by the depth or size limit.
pub fn c_factor(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let nf = n as f64;
    2.0 * ((nf - 1.0).ln() + EULER_GAMMA) - 2.0 * (nf - 1.0) / nf
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: u32,
        right: u32,
    },
    Leaf {
        size: u32,
    },
}

/// One isolation tree: an arena of nodes with child indices.
#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
    root: u32,
}

impl Tree {
    /// Grow a tree over a subsample, splitting on a uniformly random
    /// feature at a uniformly random value between that feature's min and
    /// max within the node, until isolation, the depth cap, or a node with
    /// no spread.
    fn grow(data: &[Vec<f64>], mut sample: Vec<usize>, max_depth: u32, rng: &mut StdRng) -> Self {
        let mut nodes = Vec::new();
        let root = Self::grow_node(data, &mut sample, 0, max_depth, rng, &mut nodes);
        Self { nodes, root }
    }

    fn grow_node(
        data: &[Vec<f64>],
        items: &mut [usize],
        depth: u32,
        max_depth: u32,
        rng: &mut StdRng,
        nodes: &mut Vec<Node>,
    ) -> u32 {
        if items.len() <= 1 || depth >= max_depth {
            return Self::push_leaf(nodes, items.len());
        }

        // Only features with spread inside this node can be split on.
        let dim = data[items[0]].len();
        let mut candidates = Vec::with_capacity(dim);
        for feature in 0..dim {
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for &i in items.iter() {
                let x = data[i][feature];
                lo = lo.min(x);
                hi = hi.max(x);
            }
            if hi > lo {
                candidates.push((feature, lo, hi));
            }
        }
        if candidates.is_empty() {
            return Self::push_leaf(nodes, items.len());
        }

        let (feature, lo, hi) = candidates[rng.random_range(0..candidates.len())];
        let threshold = rng.random_range(lo..hi);

        // Partition in place: left side strictly below the threshold.
        let mut i = 0;
        let mut j = items.len();
        while i < j {
            if data[items[i]][feature] < threshold {
                i += 1;
            } else {
                j -= 1;
                items.swap(i, j);
            }
        }
        if i == 0 || i == items.len() {
            // Degenerate split (threshold hit the boundary value exactly).
            return Self::push_leaf(nodes, items.len());
        }

        let (left_items, right_items) = items.split_at_mut(i);
        let left = Self::grow_node(data, left_items, depth + 1, max_depth, rng, nodes);
        let right = Self::grow_node(data, right_items, depth + 1, max_depth, rng, nodes);
        nodes.push(Node::Split {
            feature,
            threshold,
            left,
            right,
        });
        (nodes.len() - 1) as u32
    }

    fn push_leaf(nodes: &mut Vec<Node>, size: usize) -> u32 {
        nodes.push(Node::Leaf { size: size as u32 });
        (nodes.len() - 1) as u32
    }

    /// Depth at which `x` lands in a leaf, plus the `c(n)` adjustment for
    /// leaves holding more than one point.
    fn path_length(&self, x: &[f64]) -> f64 {
        let mut idx = self.root;
        let mut depth = 0u32;
        loop {
            match &self.nodes[idx as usize] {
                Node::Leaf { size } => return f64::from(depth) + c_factor(*size as usize),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] < *threshold { *left } else { *right };
                    depth += 1;
                }
            }
        }
    }
}

/// A fitted isolation forest.
#[derive(Debug)]
pub struct IsolationForest {
    trees: Vec<Tree>,
    subsample_size: usize,
}

impl IsolationForest {
    /// Fit `tree_count` trees, each over an independent random subsample
    /// drawn without replacement and seeded from `seed` plus the tree
    /// index, so a fit is reproducible regardless of thread scheduling.
    pub fn fit(data: &[Vec<f64>], params: &ModelParameters) -> Result<Self> {
        params.validate()?;
        let n = data.len();
        if n < 2 {
            return Err(Error::InsufficientData {
                valid: n,
                needed: 2,
            });
        }

        let subsample_size = params
            .subsample_size
            .unwrap_or(DEFAULT_SUBSAMPLE)
            .min(n)
            .max(2);
        let max_depth = (subsample_size as f64).log2().ceil() as u32;

        let trees: Vec<Tree> = (0..params.tree_count)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(t as u64));
                let sample = rand::seq::index::sample(&mut rng, n, subsample_size).into_vec();
                Tree::grow(data, sample, max_depth, &mut rng)
            })
            .collect();

        Ok(Self {
            trees,
            subsample_size,
        })
    }

    #[inline]
    #[must_use]
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    #[inline]
    #[must_use]
    pub fn subsample_size(&self) -> usize {
        self.subsample_size
    }

    /// Score every record by walking every fitted tree, subsample member
    /// or not: `2^(-E[h(x)] / c(subsample_size))`, clipped to [0, 1].
    /// Scores near 1 isolate quickly (anomalous); typical records sit
    /// around 0.5 or below.
    pub fn score_samples(&self, data: &[Vec<f64>]) -> Vec<f64> {
        let denom = c_factor(self.subsample_size);
        data.par_iter()
            .map(|x| {
                let total: f64 = self.trees.iter().map(|t| t.path_length(x)).sum();
                let avg = total / self.trees.len() as f64;
                (-avg / denom).exp2().clamp(0.0, 1.0)
            })
            .collect()
    }
}

/// Label the top `round(contamination * n)` scores anomalous.
///
/// Ties at the cutoff are broken by ascending original index, so the
/// labeling is deterministic.
pub fn classify(scores: &[f64], contamination: f64) -> Vec<bool> {
    let k = (contamination * scores.len() as f64).round() as usize;
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by_key(|&i| (Reverse(OrderedFloat(scores[i])), i));

    let mut flags = vec![false; scores.len()];
    for &i in order.iter().take(k) {
        flags[i] = true;
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clustered_with_outliers(n: usize, outliers: usize) -> Vec<Vec<f64>> {
        // Tight cluster plus a handful of far-away points at the end.
        let mut data: Vec<Vec<f64>> = (0..n)
            .map(|i| vec![100.0 + (i % 10) as f64])
            .collect();
        for i in 0..outliers {
            data.push(vec![10_000.0 + i as f64]);
        }
        data
    }

    #[test]
    fn test_parameter_validation() {
        let bad_contamination = ModelParameters {
            contamination: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            IsolationForest::fit(&[vec![1.0], vec![2.0]], &bad_contamination),
            Err(Error::InvalidParameter(_))
        ));

        let bad_trees = ModelParameters {
            tree_count: 0,
            ..Default::default()
        };
        assert!(bad_trees.validate().is_err());

        let bad_subsample = ModelParameters {
            subsample_size: Some(1),
            ..Default::default()
        };
        assert!(bad_subsample.validate().is_err());

        assert!(ModelParameters::default().validate().is_ok());
    }

    #[test]
    fn test_insufficient_data() {
        let err = IsolationForest::fit(&[vec![1.0]], &ModelParameters::default()).unwrap_err();
        assert_eq!(
            err,
            Error::InsufficientData {
                valid: 1,
                needed: 2
            }
        );
    }

    #[test]
    fn test_scores_bounded() {
        let data = clustered_with_outliers(100, 5);
        let forest = IsolationForest::fit(&data, &ModelParameters::default()).unwrap();
        let scores = forest.score_samples(&data);

        assert_eq!(scores.len(), data.len());
        for (i, &s) in scores.iter().enumerate() {
            assert!((0.0..=1.0).contains(&s), "score[{i}]={s} out of [0,1]");
        }
    }

    #[test]
    fn test_fit_is_deterministic_for_seed() {
        let data = clustered_with_outliers(80, 4);
        let params = ModelParameters::default();

        let a = IsolationForest::fit(&data, &params).unwrap().score_samples(&data);
        let b = IsolationForest::fit(&data, &params).unwrap().score_samples(&data);
        assert_eq!(a, b);
    }

    #[test]
    fn test_outliers_score_higher() {
        let data = clustered_with_outliers(200, 5);
        let forest = IsolationForest::fit(&data, &ModelParameters::default()).unwrap();
        let scores = forest.score_samples(&data);

        let max_inlier = scores[..200].iter().cloned().fold(f64::MIN, f64::max);
        for &s in &scores[200..] {
            assert!(
                s > max_inlier,
                "outlier score {s} not above inlier max {max_inlier}"
            );
        }
    }

    #[test]
    fn test_classify_count_and_tie_break() {
        let scores = vec![0.9, 0.5, 0.9, 0.1];
        // k = round(0.5 * 4) = 2: both 0.9s, nobody else.
        let flags = classify(&scores, 0.5);
        assert_eq!(flags, vec![true, false, true, false]);

        // k = 1 with a tie at the cut: lower index wins.
        let flags = classify(&scores, 0.25);
        assert_eq!(flags, vec![true, false, false, false]);
    }

    #[test]
    fn test_classify_rounds_to_nearest() {
        let scores = vec![0.5; 10];
        assert_eq!(classify(&scores, 0.04).iter().filter(|&&f| f).count(), 0);
        assert_eq!(classify(&scores, 0.06).iter().filter(|&&f| f).count(), 1);
    }

    #[test]
    fn test_c_factor() {
        assert_eq!(c_factor(0), 0.0);
        assert_eq!(c_factor(1), 0.0);
        // c(2) = 2(ln 1 + gamma) - 1
        assert!((c_factor(2) - (2.0 * EULER_GAMMA - 1.0)).abs() < 1e-12);
        assert!(c_factor(256) > c_factor(16));
    }

    #[test]
    fn test_constant_data_scores_uniform() {
        // No spread anywhere: every tree is a single leaf and every record
        // gets the same mid-range score.
        let data = vec![vec![0.0]; 50];
        let forest = IsolationForest::fit(&data, &ModelParameters::default()).unwrap();
        let scores = forest.score_samples(&data);
        for &s in &scores {
            assert!((s - scores[0]).abs() < 1e-12);
        }
    }
}
