//! # anomX Model
//!
//! Anomaly scoring pipeline for the anomX engine:
//!
//! - [`AnalysisSchema`] / [`BoundSchema`] - column roles, validated binding
//! - [`derive_features`] - amount, calendar and categorical features
//! - [`StandardScaler`] - per-feature standardization
//! - [`IsolationForest`] - randomized isolation tree ensemble
//! - [`run_analysis`] - the full pass, raw table in, scored collection out
//!
//! ## Example
//!
//! ```rust
//! use anomx_model::{run_analysis, AnalysisSchema, ModelParameters};
//! use anomx_core::RawTable;
//! use serde_json::json;
//!
//! let table = RawTable::new(
//!     vec!["amount".to_string()],
//!     (0..64).map(|i| vec![json!(100.0 + (i % 7) as f64)]).collect(),
//! ).unwrap();
//!
//! let bound = AnalysisSchema::new("amount").bind(&table).unwrap();
//! let params = ModelParameters { contamination: 0.05, ..Default::default() };
//! let scored = run_analysis(&bound, &table, &params).unwrap();
//! assert_eq!(scored.len(), 64);
//! ```

pub mod features;
pub mod forest;
pub mod normalize;
pub mod schema;

pub use features::{derive_features, Derivation};
pub use forest::{
    classify, c_factor, IsolationForest, ModelParameters, DEFAULT_SUBSAMPLE, DEFAULT_TREE_COUNT,
};
pub use normalize::{FeatureStats, StandardScaler};
pub use schema::{AnalysisSchema, BoundSchema};

use anomx_core::{RawTable, Result, ScoredCollection, ScoredRecord};
use tracing::info;

/// Run one full scoring pass: derive features, standardize, fit the forest,
/// score and classify.
///
/// Per-record coercion failures drop the record and are surfaced as counts
/// on the returned collection; fewer than 2 surviving records or parameters
/// out of contract fail the run. The returned collection is a fresh value;
/// the caller decides when to swap it in.
pub fn run_analysis(
    schema: &BoundSchema,
    table: &RawTable,
    params: &ModelParameters,
) -> Result<ScoredCollection> {
    params.validate()?;

    let derivation = derive_features(schema, table);
    if derivation.indices.len() < 2 {
        return Err(anomx_core::Error::InsufficientData {
            valid: derivation.indices.len(),
            needed: 2,
        });
    }

    let (_scaler, standardized) = StandardScaler::fit_transform(&derivation.vectors);
    let forest = IsolationForest::fit(&standardized, params)?;
    let scores = forest.score_samples(&standardized);
    let flags = classify(&scores, params.contamination);

    let records = derivation
        .indices
        .iter()
        .zip(scores.iter().zip(flags.iter()))
        .map(|(&row, (&score, &is_anomaly))| ScoredRecord {
            index: row,
            values: table.rows()[row].clone(),
            score,
            is_anomaly,
        })
        .collect();

    let collection = ScoredCollection::new(table.columns().to_vec(), records, derivation.dropped);
    info!(
        records = collection.len(),
        anomalies = collection.anomaly_count(),
        dropped = collection.dropped().total(),
        trees = forest.tree_count(),
        subsample = forest.subsample_size(),
        "scoring pass complete"
    );
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn amounts_table(values: &[f64]) -> RawTable {
        RawTable::new(
            vec!["amount".to_string()],
            values.iter().map(|&v| vec![json!(v)]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_run_analysis_end_to_end() {
        let mut amounts: Vec<f64> = (0..100).map(|i| 100.0 + (i % 9) as f64).collect();
        amounts.push(50_000.0);
        let table = amounts_table(&amounts);
        let bound = AnalysisSchema::new("amount").bind(&table).unwrap();
        let params = ModelParameters {
            contamination: 0.01,
            ..Default::default()
        };

        let scored = run_analysis(&bound, &table, &params).unwrap();
        assert_eq!(scored.len(), 101);
        // round(0.01 * 101) = 1, and it is the giant amount.
        assert_eq!(scored.anomaly_count(), 1);
        let anomaly = scored.records().iter().find(|r| r.is_anomaly).unwrap();
        assert_eq!(anomaly.index, 100);
    }

    #[test]
    fn test_anomaly_count_matches_contamination() {
        let amounts: Vec<f64> = (0..200).map(|i| (i % 13) as f64).collect();
        let table = amounts_table(&amounts);
        let bound = AnalysisSchema::new("amount").bind(&table).unwrap();
        let params = ModelParameters {
            contamination: 0.1,
            ..Default::default()
        };

        let scored = run_analysis(&bound, &table, &params).unwrap();
        assert_eq!(scored.anomaly_count(), 20);
    }

    #[test]
    fn test_too_few_valid_records() {
        let table = RawTable::new(
            vec!["amount".to_string()],
            vec![vec![json!("n/a")], vec![json!(10.0)], vec![json!(null)]],
        )
        .unwrap();
        let bound = AnalysisSchema::new("amount").bind(&table).unwrap();

        let err = run_analysis(&bound, &table, &ModelParameters::default()).unwrap_err();
        assert_eq!(
            err,
            anomx_core::Error::InsufficientData {
                valid: 1,
                needed: 2
            }
        );
    }

    #[test]
    fn test_dropped_counts_surfaced() {
        let table = RawTable::new(
            vec!["amount".to_string()],
            vec![
                vec![json!("oops")],
                vec![json!(10.0)],
                vec![json!(12.0)],
                vec![json!(11.0)],
            ],
        )
        .unwrap();
        let bound = AnalysisSchema::new("amount").bind(&table).unwrap();
        let scored = run_analysis(&bound, &table, &ModelParameters::default()).unwrap();

        assert_eq!(scored.dropped().bad_amount, 1);
        assert_eq!(scored.len(), 3);
        // Dropped rows keep their gaps: surviving indices are the original ones.
        assert_eq!(
            scored.records().iter().map(|r| r.index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }
}
