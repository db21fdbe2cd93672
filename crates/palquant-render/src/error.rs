//! Error types for palquant-render

use thiserror::Error;

/// Errors that can occur during quantization and conversion
#[derive(Debug, Error)]
pub enum RenderError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] palquant_core::Error),

    /// Unsupported pixel format for this operation
    #[error("unsupported pixel format: expected {expected}, got {actual}")]
    UnsupportedFormat {
        expected: &'static str,
        actual: &'static str,
    },

    /// Invalid parameters
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Two accumulators with different shapes cannot be merged
    #[error("incompatible accumulators: {0}")]
    IncompatibleMerge(String),
}

/// Result type for render operations
pub type RenderResult<T> = Result<T, RenderError>;
