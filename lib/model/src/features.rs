//! Feature derivation
//!
//! Turns a bound schema plus a raw table into a numeric feature matrix:
//! the amount value, calendar features when a date role is bound, and one
//! integer code per categorical column.

use crate::schema::BoundSchema;
use ahash::AHashMap;
use anomx_core::coerce::{coerce_datetime, coerce_number, value_text};
use anomx_core::{DropCounts, RawTable};
use chrono::Datelike;
use tracing::debug;

/// Output of one derivation pass: surviving row indices, their feature
/// vectors (parallel arrays), and per-cause drop counts.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    pub indices: Vec<usize>,
    pub vectors: Vec<Vec<f64>>,
    pub dropped: DropCounts,
}

/// Derive the feature matrix for a table under a bound schema.
///
/// Records whose amount cell cannot be coerced to a finite number are
/// dropped, as are records with an unparseable date when a date role is
/// bound; drops are counted, never fatal to the batch.
///
/// Categorical values are encoded to integer codes in first-occurrence
/// order, with null and non-scalar cells coded -1. The code table is local
/// to one pass: two identical values always share a code within a pass, but
/// codes are NOT stable across passes when the input order differs.
pub fn derive_features(schema: &BoundSchema, table: &RawTable) -> Derivation {
    let mut indices = Vec::with_capacity(table.len());
    let mut vectors = Vec::with_capacity(table.len());
    let mut dropped = DropCounts::default();

    // One code table per categorical column, rebuilt each pass.
    let mut code_tables: Vec<AHashMap<String, f64>> =
        vec![AHashMap::new(); schema.categories.len()];

    for (row_index, row) in table.rows().iter().enumerate() {
        let Some(amount) = row.get(schema.amount).and_then(coerce_number) else {
            dropped.bad_amount += 1;
            continue;
        };

        let mut vector = Vec::with_capacity(schema.feature_len());
        vector.push(amount);

        if let Some(date_col) = schema.date {
            let Some(dt) = row.get(date_col).and_then(coerce_datetime) else {
                dropped.bad_date += 1;
                continue;
            };
            vector.push(f64::from(dt.date().weekday().num_days_from_monday()));
            vector.push(f64::from(dt.date().month()));
        }

        for (slot, &cat_col) in schema.categories.iter().enumerate() {
            let code = match row.get(cat_col).and_then(value_text) {
                Some(text) => {
                    let codes = &mut code_tables[slot];
                    let next = codes.len() as f64;
                    *codes.entry(text.into_owned()).or_insert(next)
                }
                None => -1.0,
            };
            vector.push(code);
        }

        indices.push(row_index);
        vectors.push(vector);
    }

    if dropped.total() > 0 {
        debug!(
            bad_amount = dropped.bad_amount,
            bad_date = dropped.bad_date,
            surviving = indices.len(),
            "dropped records during feature derivation"
        );
    }

    Derivation {
        indices,
        vectors,
        dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AnalysisSchema;
    use chrono::Datelike;
    use serde_json::json;

    fn table(rows: Vec<Vec<serde_json::Value>>) -> RawTable {
        RawTable::new(
            vec![
                "amount".to_string(),
                "date".to_string(),
                "country".to_string(),
            ],
            rows,
        )
        .unwrap()
    }

    #[test]
    fn test_full_feature_layout() {
        let t = table(vec![
            vec![json!(120.0), json!("2024-03-15"), json!("FR")],
            vec![json!("80"), json!("2024-03-16"), json!("DE")],
            vec![json!(95.0), json!("2024-03-17"), json!("FR")],
        ]);
        let schema = AnalysisSchema::new("amount")
            .with_date("date")
            .with_categories(["country"]);
        let bound = schema.bind(&t).unwrap();
        let derivation = derive_features(&bound, &t);

        assert_eq!(derivation.indices, vec![0, 1, 2]);
        assert_eq!(derivation.dropped.total(), 0);
        // 2024-03-15 is a Friday: weekday 4, month 3.
        assert_eq!(derivation.vectors[0], vec![120.0, 4.0, 3.0, 0.0]);
        assert_eq!(derivation.vectors[1], vec![80.0, 5.0, 3.0, 1.0]);
        // Repeated category shares its first-occurrence code.
        assert_eq!(derivation.vectors[2][3], 0.0);

        // Sanity-check the calendar math against chrono directly.
        let d = chrono::NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(d.weekday().num_days_from_monday(), 4);
        assert_eq!(d.month(), 3);
    }

    #[test]
    fn test_bad_amount_dropped_not_fatal() {
        let t = table(vec![
            vec![json!("n/a"), json!("2024-03-15"), json!("FR")],
            vec![json!(80.0), json!("2024-03-16"), json!("DE")],
        ]);
        let bound = AnalysisSchema::new("amount").bind(&t).unwrap();
        let derivation = derive_features(&bound, &t);

        assert_eq!(derivation.indices, vec![1]);
        assert_eq!(derivation.dropped.bad_amount, 1);
    }

    #[test]
    fn test_bad_date_dropped_when_date_bound() {
        let t = table(vec![
            vec![json!(50.0), json!("garbage"), json!("FR")],
            vec![json!(80.0), json!("2024-03-16"), json!("DE")],
        ]);
        let bound = AnalysisSchema::new("amount")
            .with_date("date")
            .bind(&t)
            .unwrap();
        let derivation = derive_features(&bound, &t);

        assert_eq!(derivation.indices, vec![1]);
        assert_eq!(derivation.dropped.bad_date, 1);
    }

    #[test]
    fn test_null_category_codes_minus_one() {
        let t = table(vec![
            vec![json!(50.0), json!("2024-03-15"), json!(null)],
            vec![json!(80.0), json!("2024-03-16"), json!("DE")],
        ]);
        let bound = AnalysisSchema::new("amount")
            .with_categories(["country"])
            .bind(&t)
            .unwrap();
        let derivation = derive_features(&bound, &t);

        assert_eq!(derivation.vectors[0][1], -1.0);
        assert_eq!(derivation.vectors[1][1], 0.0);
    }

    #[test]
    fn test_codes_follow_first_occurrence_order() {
        let forward = table(vec![
            vec![json!(1.0), json!("2024-01-01"), json!("FR")],
            vec![json!(2.0), json!("2024-01-01"), json!("DE")],
        ]);
        let reversed = table(vec![
            vec![json!(1.0), json!("2024-01-01"), json!("DE")],
            vec![json!(2.0), json!("2024-01-01"), json!("FR")],
        ]);
        let schema = AnalysisSchema::new("amount").with_categories(["country"]);

        let a = derive_features(&schema.bind(&forward).unwrap(), &forward);
        let b = derive_features(&schema.bind(&reversed).unwrap(), &reversed);

        // First-seen value takes code 0 in each pass independently.
        assert_eq!(a.vectors[0][1], 0.0);
        assert_eq!(b.vectors[0][1], 0.0);
    }
}
