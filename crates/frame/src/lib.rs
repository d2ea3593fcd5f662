//! PMS Frame - sensor transmission decoding
//!
//! This crate turns the serial byte stream of a PMS particulate-matter
//! sensor into validated [`Reading`](frame::Reading) values: start-marker
//! synchronization, length validation, checksum verification and field
//! extraction. It also provides a simulation mode and the host-to-sensor
//! command frames.

pub mod frame;
pub mod sync;
pub mod reader;
pub mod simulate;
pub mod command;
pub mod error;

pub use error::{CommandError, DecodeError, FramePart, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        frame::{encode_frame, Reading, FRAME_LENGTH, FRAME_SIZE},
        sync::{SyncScanner, SyncState},
        reader::{FrameReader, ReaderStats, ReadingSource},
        simulate::{SimulatedSensor, SimulatedStream, StreamProfile},
        command::{ReportingMode, SensorCommand, SensorControl},
        error::{CommandError, DecodeError, FramePart, Result},
    };
}
