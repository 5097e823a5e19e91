use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("schema role(s) could not be resolved, missing column(s): {}", .missing.join(", "))]
    UnresolvedRoles { missing: Vec<String> },

    #[error("column listed more than once in schema: {0}")]
    DuplicateColumn(String),

    #[error("row {row} has {actual} cell(s), expected {expected}")]
    Shape {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("insufficient data: {valid} valid record(s), need at least {needed}")]
    InsufficientData { valid: usize, needed: usize },

    #[error("invalid session state: {0}")]
    InvalidState(&'static str),

    #[error("analysis run superseded by a reconfiguration")]
    Superseded,
}
