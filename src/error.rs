//! Error types for table construction, feature selection and task adaptation

use thiserror::Error;

/// Errors raised by the adapter core
///
/// All variants are deterministic input-validation failures; retrying with the
/// same input yields the same error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdapterError {
    /// Label vector length differs from the number of samples
    #[error("shape mismatch: {labels} labels for {samples} samples")]
    ShapeMismatch { samples: usize, labels: usize },

    /// Matrix rows and identifiers disagree on size
    #[error("malformed matrix: expected {expected} {what}, found {found}")]
    MalformedMatrix {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// A measurement is infinite; missing values must be NaN
    #[error("non-finite value for feature {feature} in sample {sample}")]
    NonFiniteValue { feature: String, sample: String },

    /// The same feature identifier appears on more than one row
    #[error("duplicate feature identifier: {0}")]
    DuplicateFeatureIdentifier(String),

    /// Requested top-K is zero, negative or larger than the feature count
    #[error("invalid feature count {requested}: must be between 1 and {available}")]
    InvalidFeatureCount { requested: i64, available: usize },

    /// A named column does not exist in the table
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// A numeric feature column was named as a classification target
    #[error("column {0} is numeric and cannot be a classification target")]
    NonCategoricalTarget(String),

    /// Task identifier is empty
    #[error("task identifier must not be empty")]
    InvalidTaskId,

    /// Task identifier already used by this caller
    #[error("duplicate task identifier: {0}")]
    DuplicateTaskId(String),

    /// Resampling parameters do not fit the task
    #[error("invalid resampling: {0}")]
    InvalidResampling(String),

    /// Operation needs at least one row or column
    #[error("empty table: {0}")]
    EmptyTable(&'static str),
}

/// Result alias for adapter operations
pub type AdapterResult<T> = std::result::Result<T, AdapterError>;
