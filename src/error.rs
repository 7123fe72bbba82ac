//! Error taxonomy for the analysis pipeline and its collaborators.
//!
//! Parse failures are fatal to a single analysis attempt and are returned to
//! the caller verbatim. Collaborator failures (insight fetch, history
//! persistence) never invalidate a report that has already been computed.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("File is empty")]
    EmptyInput,
    #[error("CSV must contain headers and at least one data row")]
    InsufficientRows,
    #[error("Invalid headers: all columns must have names")]
    InvalidHeaders,
    #[error("No valid data rows found")]
    NoValidRows,
    #[error("Row {line} has {found} cell(s) but the header defines {expected}")]
    MalformedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("Insight service unavailable: {0}")]
    InsightUnavailable(String),
    #[error("Persistence service unavailable: {0}")]
    PersistenceUnavailable(String),
}
