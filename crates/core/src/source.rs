//! Byte sources: the narrow read contract a frame decoder depends on

use crate::{CoreError, Result, ShortRead};
use std::io::{ErrorKind, Read};
use tracing::trace;

/// A byte-oriented input with blocking-with-timeout read semantics.
///
/// Each call blocks for at most the transport's own read timeout and
/// reports [`CoreError::Timeout`] when nothing arrived in that window.
pub trait ByteSource {
    /// Read a single byte
    fn read_one(&mut self) -> Result<u8>;

    /// Fill `buf` completely, or report how many bytes arrived first
    fn read_exact(&mut self, buf: &mut [u8]) -> std::result::Result<(), ShortRead> {
        for (received, slot) in buf.iter_mut().enumerate() {
            *slot = self
                .read_one()
                .map_err(|cause| ShortRead { received, cause })?;
        }
        Ok(())
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read_one(&mut self) -> Result<u8> {
        (**self).read_one()
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> std::result::Result<(), ShortRead> {
        (**self).read_exact(buf)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read_one(&mut self) -> Result<u8> {
        (**self).read_one()
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> std::result::Result<(), ShortRead> {
        (**self).read_exact(buf)
    }
}

/// How a zero-length read is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EofPolicy {
    /// The source is gone (regular files, pipes)
    #[default]
    Closed,
    /// Nothing arrived within the read timeout (ttys configured with VTIME)
    Timeout,
}

impl EofPolicy {
    fn error(self) -> CoreError {
        match self {
            EofPolicy::Closed => CoreError::Closed,
            EofPolicy::Timeout => CoreError::Timeout,
        }
    }
}

/// Adapts any [`Read`] implementation (serial device node, file, pipe)
#[derive(Debug)]
pub struct IoByteSource<R> {
    inner: R,
    eof: EofPolicy,
    bytes_read: u64,
}

impl<R: Read> IoByteSource<R> {
    /// Wrap a reader; end of input is reported as [`CoreError::Closed`]
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            eof: EofPolicy::Closed,
            bytes_read: 0,
        }
    }

    /// Set how zero-length reads are reported
    pub fn with_eof_policy(mut self, eof: EofPolicy) -> Self {
        self.eof = eof;
        self
    }

    /// Total bytes delivered so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            match self.inner.read(buf) {
                Ok(0) => return Err(self.eof.error()),
                Ok(n) => {
                    self.bytes_read += n as u64;
                    return Ok(n);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Err(CoreError::Timeout);
                }
                Err(e) => return Err(CoreError::Io(e)),
            }
        }
    }
}

impl<R: Read> ByteSource for IoByteSource<R> {
    fn read_one(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.read_some(&mut byte)?;
        Ok(byte[0])
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> std::result::Result<(), ShortRead> {
        let mut received = 0;
        while received < buf.len() {
            match self.read_some(&mut buf[received..]) {
                Ok(n) => received += n,
                Err(cause) => {
                    trace!(received, wanted = buf.len(), "short read");
                    return Err(ShortRead { received, cause });
                }
            }
        }
        Ok(())
    }
}

/// In-memory byte source, mostly for tests and replaying captures
#[derive(Debug, Clone, Default)]
pub struct SliceSource {
    data: Vec<u8>,
    position: usize,
    eof: EofPolicy,
}

impl SliceSource {
    /// Create a source over the given bytes
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            position: 0,
            eof: EofPolicy::Closed,
        }
    }

    /// Set what an exhausted source reports
    pub fn with_eof_policy(mut self, eof: EofPolicy) -> Self {
        self.eof = eof;
        self
    }

    /// Number of bytes consumed so far
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Check if every byte has been consumed
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}

impl ByteSource for SliceSource {
    fn read_one(&mut self) -> Result<u8> {
        match self.data.get(self.position) {
            Some(&byte) => {
                self.position += 1;
                Ok(byte)
            }
            None => Err(self.eof.error()),
        }
    }
}
