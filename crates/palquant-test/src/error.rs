//! Error types for the test framework

use thiserror::Error;

/// Errors that can occur while building regression test fixtures
#[derive(Debug, Error)]
pub enum TestError {
    /// Failed to build a fixture image
    #[error("failed to build fixture '{name}': {message}")]
    Fixture { name: String, message: String },

    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] palquant_core::Error),
}

/// Result type for test operations
pub type TestResult<T> = Result<T, TestError>;
