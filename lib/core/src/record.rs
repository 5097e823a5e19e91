use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Counts of records dropped during feature derivation, by cause.
///
/// Per-record coercion failures never abort a batch; they are aggregated
/// here and surfaced to the caller.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DropCounts {
    pub bad_amount: usize,
    pub bad_date: usize,
}

impl DropCounts {
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.bad_amount + self.bad_date
    }
}

/// A record with its anomaly score and classification.
///
/// `index` is the position of the row in the ingested table, stable across
/// filtering. Derived once per scoring pass and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredRecord {
    pub index: usize,
    pub values: Vec<Value>,
    pub score: f64,
    pub is_anomaly: bool,
}

/// The result of one scoring pass: the surviving records, their columns,
/// and the score range observed over the whole collection.
///
/// The range is frozen at scoring time so that histogram bin edges stay
/// stable while filters change. A new scoring pass replaces the collection
/// wholesale; concurrent readers holding an `Arc` never observe a partial
/// update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredCollection {
    columns: Vec<String>,
    records: Vec<ScoredRecord>,
    score_range: (f64, f64),
    dropped: DropCounts,
}

impl ScoredCollection {
    pub fn new(columns: Vec<String>, records: Vec<ScoredRecord>, dropped: DropCounts) -> Self {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for r in &records {
            lo = lo.min(r.score);
            hi = hi.max(r.score);
        }
        let score_range = if records.is_empty() { (0.0, 0.0) } else { (lo, hi) };
        Self {
            columns,
            records,
            score_range,
            dropped,
        }
    }

    #[inline]
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[inline]
    #[must_use]
    pub fn records(&self) -> &[ScoredRecord] {
        &self.records
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// (min, max) anomaly score over the full collection, frozen at scoring.
    #[inline]
    #[must_use]
    pub fn score_range(&self) -> (f64, f64) {
        self.score_range
    }

    /// Records dropped before scoring, by cause.
    #[inline]
    #[must_use]
    pub fn dropped(&self) -> DropCounts {
        self.dropped
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell of a record by column name.
    pub fn value<'a>(&self, record: &'a ScoredRecord, column: &str) -> Option<&'a Value> {
        self.column_index(column).and_then(|i| record.values.get(i))
    }

    pub fn anomaly_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_anomaly).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_collection(scores: &[f64]) -> ScoredCollection {
        let records = scores
            .iter()
            .enumerate()
            .map(|(i, &score)| ScoredRecord {
                index: i,
                values: vec![json!(i)],
                score,
                is_anomaly: false,
            })
            .collect();
        ScoredCollection::new(vec!["n".to_string()], records, DropCounts::default())
    }

    #[test]
    fn test_score_range_frozen() {
        let collection = make_collection(&[0.2, 0.8, 0.5]);
        assert_eq!(collection.score_range(), (0.2, 0.8));
    }

    #[test]
    fn test_empty_collection_range() {
        let collection = make_collection(&[]);
        assert_eq!(collection.score_range(), (0.0, 0.0));
    }

    #[test]
    fn test_value_lookup() {
        let collection = make_collection(&[0.1, 0.9]);
        let record = &collection.records()[1];
        assert_eq!(collection.value(record, "n"), Some(&json!(1)));
        assert_eq!(collection.value(record, "missing"), None);
    }
}
