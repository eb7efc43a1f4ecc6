//! Error types for loading, aggregating, and encoding shipment data.
//!
//! Every variant here aborts a run before the optimizer is invoked. Solver
//! outcomes (non-convergence, infeasibility) live in [`crate::optimizer`].

use thiserror::Error;

/// Errors raised while turning raw shipment records into encoded features.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required input column is absent.
    #[error("Required column '{column}' not found. Available columns: {available:?}")]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    /// A column could not be read as the expected type.
    #[error("Column '{column}' must be {expected} (found {found})")]
    InvalidType {
        column: String,
        expected: &'static str,
        found: String,
    },

    /// A required field is null.
    #[error("Column '{column}' has a missing value at row {row}")]
    NullValue { column: String, row: usize },

    /// A numeric field holds a value outside its domain (NaN, infinite, negative).
    #[error("Column '{column}' has invalid value {value} at row {row}: {reason}")]
    InvalidValue {
        column: String,
        row: usize,
        value: f64,
        reason: &'static str,
    },

    /// The input produced no rows to work with.
    #[error("Dataset contains no shipment records")]
    EmptyDataset,

    /// A supplier not seen when the encoder was fitted.
    #[error("Unknown supplier '{supplier}' (fitted vocabulary: {vocabulary:?})")]
    UnknownCategory {
        supplier: String,
        vocabulary: Vec<String>,
    },

    /// Decision vector, units and feature rows disagree on indexing.
    #[error("Alignment check failed: {0}")]
    Misaligned(String),

    /// The estimator could not be fitted.
    #[error("Failed to fit {estimator} estimator: {reason}")]
    FitFailed {
        estimator: &'static str,
        reason: String,
    },
}
