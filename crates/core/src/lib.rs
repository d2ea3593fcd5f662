//! PMS Core - byte sources and timing primitives
//!
//! This crate provides the transport abstraction that PMS frame decoding
//! depends on: a blocking-with-timeout byte source contract, adapters for
//! `std::io::Read` and in-memory data, and aggregate deadlines.

pub mod source;
pub mod timing;
pub mod error;

pub use error::{CoreError, Result, ShortRead};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        source::{ByteSource, EofPolicy, IoByteSource, SliceSource},
        timing::Deadline,
        error::{CoreError, Result, ShortRead},
    };
}
