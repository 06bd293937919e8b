//! Error types for seg-eval operations.

use thiserror::Error;

/// Result type alias for seg-eval operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while comparing two label volumes.
///
/// Degenerate inputs (for example a volume that is entirely background) are
/// not errors: every metric resolves them to a documented sentinel value.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Ground truth and prediction do not cover the same extent.
    #[error("Shape mismatch: expected {expected:?} (z, y, x), got {actual:?}")]
    ShapeMismatch {
        /// Extent of the ground truth as (depth, height, width).
        expected: [usize; 3],
        /// Extent of the prediction as (depth, height, width).
        actual: [usize; 3],
    },

    /// Label buffer length does not match the declared shape.
    #[error("Label buffer holds {actual} voxels but shape {shape:?} needs {expected}")]
    BufferLength {
        /// Declared shape as (depth, height, width).
        shape: [usize; 3],
        /// Number of voxels the shape requires.
        expected: usize,
        /// Number of labels provided.
        actual: usize,
    },

    /// A configuration value is out of range.
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The dedicated worker pool could not be created.
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Error writing report files.
    #[error("Report error: {0}")]
    Report(String),

    /// I/O error wrapper.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
