// Predicate filtering over a scored record collection
use crate::coerce::{coerce_datetime, coerce_number, value_text};
use crate::record::{ScoredCollection, ScoredRecord};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Sentinel value accepted by [`Predicate::Set`]: its presence bypasses the
/// membership check entirely.
pub const MATCH_ALL: &str = "all";

/// Virtual field name resolving to a record's anomaly score rather than a
/// table column.
pub const SCORE_FIELD: &str = "anomaly_score";

/// A single filter condition over one or more fields.
///
/// Predicates combine with logical AND. A predicate whose parameters are
/// unset (empty set, empty needle, absent date bound) passes everything.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Inclusive numeric bounds; either side may be open.
    Range {
        field: String,
        min: Option<f64>,
        max: Option<f64>,
    },
    /// Membership in a finite set of allowed values.
    Set { field: String, values: Vec<String> },
    /// Case-insensitive containment, OR across the listed fields.
    Substring { fields: Vec<String>, needle: String },
    /// Inclusive timestamp bounds; a no-op unless both bounds are present.
    DateRange {
        field: String,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    },
}

/// A composable set of independent predicates.
///
/// `anomalies_only` restricts the view to records classified anomalous
/// before any predicate is evaluated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FilterSpec {
    #[serde(default)]
    pub anomalies_only: bool,
    #[serde(default)]
    pub predicates: Vec<Predicate>,
}

impl FilterSpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn anomalies_only(mut self, on: bool) -> Self {
        self.anomalies_only = on;
        self
    }

    #[must_use]
    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }
}

/// A malformed predicate, reported instead of silently mis-filtering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterWarning {
    /// Index of the offending predicate within the spec.
    pub predicate: usize,
    pub reason: String,
}

/// Ordered subsequence of scored records satisfying all active predicates,
/// plus the warnings raised while validating the spec.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilteredView {
    pub records: Vec<ScoredRecord>,
    pub warnings: Vec<FilterWarning>,
}

impl FilteredView {
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
}

/// Apply a filter spec to a scored collection.
///
/// Pure function of its inputs: original record order is preserved, active
/// predicates combine with AND, and malformed predicates are skipped as
/// no-ops with a warning on the returned view.
pub fn apply_filter(collection: &ScoredCollection, spec: &FilterSpec) -> FilteredView {
    let mut active: Vec<&Predicate> = Vec::with_capacity(spec.predicates.len());
    let mut warnings = Vec::new();

    for (i, predicate) in spec.predicates.iter().enumerate() {
        match validate(collection, predicate) {
            Validity::Active => active.push(predicate),
            Validity::Inert => {}
            Validity::Malformed(reason) => warnings.push(FilterWarning {
                predicate: i,
                reason,
            }),
        }
    }

    let records = collection
        .records()
        .iter()
        .filter(|r| !spec.anomalies_only || r.is_anomaly)
        .filter(|r| active.iter().all(|p| matches(collection, p, r)))
        .cloned()
        .collect();

    FilteredView { records, warnings }
}

enum Validity {
    Active,
    /// Unset predicate: passes everything, no warning.
    Inert,
    Malformed(String),
}

fn known_field(collection: &ScoredCollection, field: &str) -> bool {
    field == SCORE_FIELD || collection.column_index(field).is_some()
}

fn validate(collection: &ScoredCollection, predicate: &Predicate) -> Validity {
    match predicate {
        Predicate::Range { field, min, max } => {
            if !known_field(collection, field) {
                return Validity::Malformed(format!("unknown column: {field}"));
            }
            match (min, max) {
                (None, None) => Validity::Inert,
                (Some(lo), Some(hi)) if lo > hi => {
                    Validity::Malformed(format!("inverted range bounds: {lo} > {hi}"))
                }
                _ => Validity::Active,
            }
        }
        Predicate::Set { field, values } => {
            if !known_field(collection, field) {
                return Validity::Malformed(format!("unknown column: {field}"));
            }
            if values.is_empty() || values.iter().any(|v| v == MATCH_ALL) {
                Validity::Inert
            } else {
                Validity::Active
            }
        }
        Predicate::Substring { fields, needle } => {
            if needle.is_empty() {
                return Validity::Inert;
            }
            if fields.is_empty() {
                return Validity::Malformed("substring predicate lists no fields".to_string());
            }
            if !fields.iter().any(|f| known_field(collection, f)) {
                return Validity::Malformed(format!(
                    "no listed column exists: {}",
                    fields.join(", ")
                ));
            }
            Validity::Active
        }
        Predicate::DateRange { field, start, end } => match (start, end) {
            (Some(s), Some(e)) => {
                if !known_field(collection, field) {
                    Validity::Malformed(format!("unknown column: {field}"))
                } else if s > e {
                    Validity::Malformed(format!("inverted date bounds: {s} > {e}"))
                } else {
                    Validity::Active
                }
            }
            // Either bound absent: no-op per the filter contract.
            _ => Validity::Inert,
        },
    }
}

/// Numeric view of a field: the score for [`SCORE_FIELD`], a coerced cell
/// otherwise.
fn field_number(collection: &ScoredCollection, record: &ScoredRecord, field: &str) -> Option<f64> {
    if field == SCORE_FIELD {
        Some(record.score)
    } else {
        collection.value(record, field).and_then(coerce_number)
    }
}

fn matches(collection: &ScoredCollection, predicate: &Predicate, record: &ScoredRecord) -> bool {
    match predicate {
        Predicate::Range { field, min, max } => match field_number(collection, record, field) {
            Some(v) => min.map_or(true, |lo| v >= lo) && max.map_or(true, |hi| v <= hi),
            None => false,
        },
        Predicate::Set { field, values } => collection
            .value(record, field)
            .and_then(value_text)
            .map(|text| values.iter().any(|v| v == text.as_ref()))
            .unwrap_or(false),
        Predicate::Substring { fields, needle } => {
            let needle = needle.to_lowercase();
            fields.iter().any(|f| {
                collection
                    .value(record, f)
                    .and_then(value_text)
                    .map(|text| text.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
        }
        Predicate::DateRange { field, start, end } => {
            let (Some(start), Some(end)) = (start, end) else {
                return true;
            };
            collection
                .value(record, field)
                .and_then(coerce_datetime)
                .map(|dt| dt >= *start && dt <= *end)
                .unwrap_or(false)
        }
    }
}
