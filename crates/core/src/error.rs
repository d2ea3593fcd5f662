//! Error types for PMS Core

use thiserror::Error;

/// Transport-level error types
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Read timed out")]
    Timeout,

    #[error("Byte source closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// True for outcomes the caller may simply retry
    pub fn is_timeout(&self) -> bool {
        matches!(self, CoreError::Timeout)
    }
}

/// Result type for PMS Core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// A `read_exact` that stopped before the buffer was full
#[derive(Error, Debug)]
#[error("Short read after {received} bytes: {cause}")]
pub struct ShortRead {
    /// Bytes that arrived before the failure
    pub received: usize,
    /// What stopped the read
    pub cause: CoreError,
}
