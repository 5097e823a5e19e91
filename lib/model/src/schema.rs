//! Analysis schema definitions
//!
//! Maps raw column names to the semantic roles the feature deriver needs:
//! a required numeric amount column, an optional date column, and any number
//! of categorical columns.

use anomx_core::{Error, RawTable, Result};
use serde::{Deserialize, Serialize};

/// A candidate schema: column names per role, not yet checked against a
/// table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisSchema {
    /// Column holding the transaction amount. Required, numeric-coercible.
    pub amount: String,
    /// Optional column holding a timestamp; enables calendar features.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Categorical columns, each encoded to an integer code per run.
    #[serde(default)]
    pub categories: Vec<String>,
}

impl AnalysisSchema {
    pub fn new(amount: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            date: None,
            categories: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_date(mut self, column: impl Into<String>) -> Self {
        self.date = Some(column.into());
        self
    }

    #[must_use]
    pub fn with_categories<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Validate this schema against a table and resolve each role to a
    /// column index.
    ///
    /// Collects *all* unresolved roles into a single error so the caller can
    /// report every problem at once. Pure: neither the schema nor the table
    /// is modified.
    pub fn bind(&self, table: &RawTable) -> Result<BoundSchema> {
        for (i, column) in self.categories.iter().enumerate() {
            if self.categories[..i].contains(column) {
                return Err(Error::DuplicateColumn(column.clone()));
            }
        }

        let mut missing = Vec::new();

        let amount = match table.column_index(&self.amount) {
            Some(i) => i,
            None => {
                missing.push(self.amount.clone());
                0
            }
        };

        let date = match &self.date {
            Some(name) => match table.column_index(name) {
                Some(i) => Some(i),
                None => {
                    missing.push(name.clone());
                    None
                }
            },
            None => None,
        };

        let mut categories = Vec::with_capacity(self.categories.len());
        for name in &self.categories {
            match table.column_index(name) {
                Some(i) => categories.push(i),
                None => missing.push(name.clone()),
            }
        }

        if !missing.is_empty() {
            return Err(Error::UnresolvedRoles { missing });
        }

        let mut feature_names = vec!["amount".to_string()];
        if self.date.is_some() {
            feature_names.push("day_of_week".to_string());
            feature_names.push("month".to_string());
        }
        for name in &self.categories {
            feature_names.push(format!("{name}_code"));
        }

        Ok(BoundSchema {
            amount,
            date,
            categories,
            feature_names,
        })
    }
}

/// A schema whose roles all resolved against a concrete table.
///
/// Holds column indices; only valid for tables with the same column layout
/// it was bound against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundSchema {
    pub(crate) amount: usize,
    pub(crate) date: Option<usize>,
    pub(crate) categories: Vec<usize>,
    feature_names: Vec<String>,
}

impl BoundSchema {
    /// Length of every feature vector derived under this schema.
    #[inline]
    #[must_use]
    pub fn feature_len(&self) -> usize {
        1 + if self.date.is_some() { 2 } else { 0 } + self.categories.len()
    }

    /// Human-readable name per feature position, for diagnostics.
    #[inline]
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}
