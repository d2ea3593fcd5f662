//! Frame reader: synchronize, validate and decode one reading per call

use crate::error::{DecodeError, FramePart, Result};
use crate::frame::{checksum, Reading, FRAME_LENGTH, PAYLOAD_LEN, START_MARKER};
use crate::sync::{SyncScanner, SyncState};
use pms_core::prelude::*;
use std::time::Duration;
use tracing::{debug, trace};

/// Anything that yields one validated `Reading` per call
pub trait ReadingSource {
    /// Produce a reading, or report why none was available within `timeout`
    fn read(&mut self, timeout: Duration) -> Result<Reading>;

    /// [`read`](Self::read) with the budget in milliseconds
    fn read_ms(&mut self, timeout_ms: u64) -> Result<Reading> {
        self.read(Duration::from_millis(timeout_ms))
    }
}

impl<T: ReadingSource + ?Sized> ReadingSource for &mut T {
    fn read(&mut self, timeout: Duration) -> Result<Reading> {
        (**self).read(timeout)
    }
}

impl<T: ReadingSource + ?Sized> ReadingSource for Box<T> {
    fn read(&mut self, timeout: Duration) -> Result<Reading> {
        (**self).read(timeout)
    }
}

/// Decode statistics accumulated across calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderStats {
    pub frames_decoded: u64,
    pub checksum_failures: u64,
    pub unsupported_frames: u64,
    pub truncated_frames: u64,
    pub timeouts: u64,
    pub discarded_bytes: u64,
}

impl ReaderStats {
    fn record(&mut self, result: &Result<Reading>) {
        match result {
            Ok(_) => self.frames_decoded += 1,
            Err(DecodeError::ChecksumMismatch { .. }) => self.checksum_failures += 1,
            Err(DecodeError::UnsupportedFrame { .. }) => self.unsupported_frames += 1,
            Err(DecodeError::Truncated { .. }) => self.truncated_frames += 1,
            Err(DecodeError::Timeout { .. }) => self.timeouts += 1,
            Err(DecodeError::Source(_)) => {}
        }
    }
}

/// Decodes sensor frames from a [`ByteSource`].
///
/// Every call resynchronizes from scratch, so a frame cut short by a prior
/// failure never leaks into the next reading.
pub struct FrameReader<S> {
    source: S,
    scanner: SyncScanner,
    stats: ReaderStats,
}

impl<S: ByteSource> FrameReader<S> {
    /// Create a reader that owns `source`
    pub fn new(source: S) -> Self {
        Self {
            source,
            scanner: SyncScanner::new(),
            stats: ReaderStats::default(),
        }
    }

    /// Statistics since construction
    pub fn stats(&self) -> &ReaderStats {
        &self.stats
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Give back the byte source
    pub fn into_inner(self) -> S {
        self.source
    }

    /// Consume bytes until a start marker completes or the deadline passes
    fn synchronize(&mut self, deadline: &Deadline) -> Result<()> {
        self.scanner.reset();
        let mut consumed: u64 = 0;

        loop {
            match self.source.read_one() {
                Ok(byte) => {
                    consumed += 1;
                    let before = self.scanner.state();
                    if self.scanner.push(byte) {
                        let discarded = consumed - START_MARKER.len() as u64;
                        if discarded > 0 {
                            debug!(discarded, "resynchronized on start marker");
                        }
                        self.stats.discarded_bytes += discarded;
                        return Ok(());
                    }
                    trace!(byte, "no sync");
                    // A first marker byte is half an attempt, not a failed one
                    if before == SyncState::SeekingFirst
                        && self.scanner.state() == SyncState::SeekingSecond
                    {
                        continue;
                    }
                }
                Err(CoreError::Timeout) => trace!("byte source timed out during sync"),
                Err(CoreError::Closed) => {
                    self.stats.discarded_bytes += consumed;
                    return Err(DecodeError::Truncated {
                        part: FramePart::Marker,
                        source_closed: true,
                    });
                }
                Err(e) => return Err(e.into()),
            }

            if deadline.expired() {
                debug!(budget = ?deadline.budget(), consumed, "no start marker before deadline");
                self.stats.discarded_bytes += consumed;
                return Err(DecodeError::Timeout {
                    waited: deadline.elapsed(),
                });
            }
        }
    }

    fn fill(&mut self, buf: &mut [u8], part: FramePart) -> Result<()> {
        self.source.read_exact(buf).map_err(|short| {
            debug!(%part, received = short.received, wanted = buf.len(), "short read");
            match short.cause {
                CoreError::Timeout => DecodeError::Truncated { part, source_closed: false },
                CoreError::Closed => DecodeError::Truncated { part, source_closed: true },
                e @ CoreError::Io(_) => DecodeError::Source(e),
            }
        })
    }

    /// Everything after the start marker
    fn decode_frame(&mut self) -> Result<Reading> {
        let mut length = [0u8; 2];
        self.fill(&mut length, FramePart::Length)?;
        let frame_len = u16::from_be_bytes(length);
        if frame_len != FRAME_LENGTH {
            debug!(frame_len, "unsupported frame length");
            return Err(DecodeError::UnsupportedFrame { length: frame_len });
        }

        let mut payload = [0u8; PAYLOAD_LEN];
        self.fill(&mut payload, FramePart::Payload)?;

        let mut received = [0u8; 2];
        self.fill(&mut received, FramePart::Checksum)?;
        let expected = u16::from_be_bytes(received);

        let computed = checksum([&START_MARKER[..], &length[..], &payload[..]]);
        if computed != expected {
            debug!(expected, computed, "checksum mismatch");
            return Err(DecodeError::ChecksumMismatch { expected, computed });
        }

        Ok(Reading::from_payload(&payload))
    }
}

impl<S: ByteSource> ReadingSource for FrameReader<S> {
    fn read(&mut self, timeout: Duration) -> Result<Reading> {
        let deadline = Deadline::new(timeout);
        let result = self
            .synchronize(&deadline)
            .and_then(|()| self.decode_frame());
        self.stats.record(&result);
        result
    }
}
