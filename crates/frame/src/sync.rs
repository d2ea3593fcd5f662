//! Start-marker synchronization

use crate::frame::START_MARKER;

/// Position of the scanner within the two-byte start marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// Waiting for `0x42`
    #[default]
    SeekingFirst,
    /// Saw `0x42`, waiting for `0x4D`
    SeekingSecond,
}

/// Two-state scanner that finds `0x42 0x4D` in an arbitrary byte stream.
///
/// A byte that breaks a partial match is re-evaluated as a potential first
/// marker byte, so `42 42 4D` synchronizes on the second `42`.
#[derive(Debug, Clone, Default)]
pub struct SyncScanner {
    state: SyncState,
}

impl SyncScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Return to `SeekingFirst`
    pub fn reset(&mut self) {
        self.state = SyncState::SeekingFirst;
    }

    /// Feed one byte; returns `true` when it completes the start marker
    pub fn push(&mut self, byte: u8) -> bool {
        let (next, synced) = match (self.state, byte) {
            (SyncState::SeekingSecond, b) if b == START_MARKER[1] => (SyncState::SeekingFirst, true),
            (_, b) if b == START_MARKER[0] => (SyncState::SeekingSecond, false),
            _ => (SyncState::SeekingFirst, false),
        };
        self.state = next;
        synced
    }

    /// Offset just past the first complete marker in `bytes`, if any
    pub fn find(bytes: &[u8]) -> Option<usize> {
        let mut scanner = Self::new();
        bytes.iter().position(|&b| scanner.push(b)).map(|i| i + 1)
    }
}
