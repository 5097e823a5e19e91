//! Per-feature standardization (zero mean, unit variance).

use serde::{Deserialize, Serialize};

/// Fitted mean and standard deviation of one feature.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FeatureStats {
    pub mean: f64,
    pub std: f64,
}

/// Standard scaler fit over one feature matrix.
///
/// Each analysis run refits from scratch; the fitted statistics are retained
/// for inspection but there is no train/apply split.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StandardScaler {
    stats: Vec<FeatureStats>,
}

impl StandardScaler {
    /// Fit per-feature mean and (population) standard deviation.
    pub fn fit(vectors: &[Vec<f64>]) -> Self {
        let n = vectors.len();
        let dim = vectors.first().map_or(0, Vec::len);
        let mut stats = Vec::with_capacity(dim);

        for feature in 0..dim {
            let sum: f64 = vectors.iter().map(|v| v[feature]).sum();
            let mean = sum / n as f64;
            let var: f64 = vectors
                .iter()
                .map(|v| (v[feature] - mean).powi(2))
                .sum::<f64>()
                / n as f64;
            stats.push(FeatureStats {
                mean,
                std: var.sqrt(),
            });
        }

        Self { stats }
    }

    /// Standardize a matrix: `(x - mean) / std` per feature.
    ///
    /// A zero-variance feature maps to 0 everywhere; it carries no
    /// discriminative information and must not divide by zero.
    pub fn transform(&self, vectors: &[Vec<f64>]) -> Vec<Vec<f64>> {
        vectors
            .iter()
            .map(|v| {
                v.iter()
                    .zip(&self.stats)
                    .map(|(&x, s)| if s.std > 0.0 { (x - s.mean) / s.std } else { 0.0 })
                    .collect()
            })
            .collect()
    }

    pub fn fit_transform(vectors: &[Vec<f64>]) -> (Self, Vec<Vec<f64>>) {
        let scaler = Self::fit(vectors);
        let transformed = scaler.transform(vectors);
        (scaler, transformed)
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> &[FeatureStats] {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_mean_unit_variance() {
        let data = vec![vec![1.0], vec![2.0], vec![3.0]];
        let (scaler, transformed) = StandardScaler::fit_transform(&data);

        let mean: f64 = transformed.iter().map(|v| v[0]).sum::<f64>() / 3.0;
        assert!(mean.abs() < 1e-12);

        let var: f64 = transformed.iter().map(|v| v[0] * v[0]).sum::<f64>() / 3.0;
        assert!((var - 1.0).abs() < 1e-12);

        assert!((scaler.stats()[0].mean - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_feature_maps_to_zero() {
        let data = vec![vec![5.0, 1.0], vec![5.0, 2.0], vec![5.0, 3.0]];
        let (_, transformed) = StandardScaler::fit_transform(&data);

        for v in &transformed {
            assert_eq!(v[0], 0.0);
        }
        // The varying feature is still standardized.
        assert!(transformed[0][1] < 0.0);
        assert!(transformed[2][1] > 0.0);
    }

    #[test]
    fn test_stats_retained() {
        let data = vec![vec![0.0], vec![10.0]];
        let scaler = StandardScaler::fit(&data);
        assert_eq!(scaler.stats().len(), 1);
        assert!((scaler.stats()[0].mean - 5.0).abs() < 1e-12);
        assert!((scaler.stats()[0].std - 5.0).abs() < 1e-12);
    }
}
