//! Error types for the churn pipeline

use std::fmt;

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ChurnError>;

/// Main error type for the churn pipeline.
///
/// Every variant here is fatal to the operation that produced it.
/// Recoverable conditions are reported as [`Degradation`] instead.
#[derive(Error, Debug)]
pub enum ChurnError {
    #[error("{operation} called before fit")]
    NotFitted { operation: String },

    #[error("Unsupported schema: {0}")]
    UnsupportedSchema(String),

    #[error("Validation failed: {0}")]
    ValidationFailure(String),

    #[error("Artifact unavailable at {path}: {reason}")]
    ArtifactUnavailable { path: String, reason: String },

    #[error("No model has been trained yet")]
    NoTrainedModel,

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Inference error: {0}")]
    InferenceError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl ChurnError {
    pub fn not_fitted(operation: impl Into<String>) -> Self {
        ChurnError::NotFitted {
            operation: operation.into(),
        }
    }

    /// Whether the error means "no usable model" to a serving caller.
    pub fn is_model_unavailable(&self) -> bool {
        matches!(
            self,
            ChurnError::NotFitted { .. }
                | ChurnError::ArtifactUnavailable { .. }
                | ChurnError::NoTrainedModel
        )
    }
}

impl From<polars::error::PolarsError> for ChurnError {
    fn from(err: polars::error::PolarsError) -> Self {
        ChurnError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for ChurnError {
    fn from(err: serde_json::Error) -> Self {
        ChurnError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ChurnError {
    fn from(err: ndarray::ShapeError) -> Self {
        ChurnError::ShapeMismatch {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

/// Non-fatal conditions recovered inside a transform.
#[derive(Debug, Clone, PartialEq)]
pub enum Degradation {
    /// A category absent from the fitted vocabulary was replaced by index 0.
    UnseenCategory {
        column: String,
        value: String,
        substitute: String,
    },
    /// Scaling failed and the unscaled frame was returned.
    ScalingDegraded { reason: String },
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::UnseenCategory {
                column,
                value,
                substitute,
            } => write!(
                f,
                "unseen category '{}' in column '{}' replaced with '{}'",
                value, column, substitute
            ),
            Degradation::ScalingDegraded { reason } => {
                write!(f, "scaling skipped: {}", reason)
            }
        }
    }
}
