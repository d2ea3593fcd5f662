//! Error types for PMS Frame

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Part of the wire frame being read when the source gave out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePart {
    Marker,
    Length,
    Payload,
    Checksum,
}

impl fmt::Display for FramePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FramePart::Marker => "start marker",
            FramePart::Length => "length field",
            FramePart::Payload => "payload",
            FramePart::Checksum => "checksum",
        };
        f.write_str(name)
    }
}

/// Frame decoding error types
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("No start marker within {waited:?}")]
    Timeout { waited: Duration },

    #[error("Unsupported frame length: expected 28, got {length}")]
    UnsupportedFrame { length: u16 },

    #[error("Frame truncated in {part}")]
    Truncated { part: FramePart, source_closed: bool },

    #[error("Checksum mismatch: frame says {expected:#06x}, computed {computed:#06x}")]
    ChecksumMismatch { expected: u16, computed: u16 },

    #[error("Byte source error: {0}")]
    Source(#[from] pms_core::CoreError),
}

impl DecodeError {
    /// True when another `read` on the same source can reasonably succeed
    pub fn is_transient(&self) -> bool {
        match self {
            DecodeError::Timeout { .. }
            | DecodeError::UnsupportedFrame { .. }
            | DecodeError::ChecksumMismatch { .. } => true,
            DecodeError::Truncated { source_closed, .. } => !source_closed,
            DecodeError::Source(_) => false,
        }
    }
}

/// Sensor command error types
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Data can only be requested in passive mode")]
    RequestInActiveMode,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for PMS Frame operations
pub type Result<T> = std::result::Result<T, DecodeError>;
