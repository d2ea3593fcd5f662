//! Simulation mode: readings and byte streams without sensor hardware

use crate::error::Result;
use crate::frame::{encode_frame, Reading, FIELD_COUNT, PAYLOAD_LEN, START_MARKER};
use crate::reader::ReadingSource;
use pms_core::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::trace;

/// Upper bound for simulated mass concentrations [μg/m³]
pub const MAX_SIMULATED_MASS: u16 = 50;

/// Upper bound for simulated particle counts [per 0.1 L]
pub const MAX_SIMULATED_COUNT: u16 = 3000;

/// Draw a reading with uniformly distributed fields
pub fn random_reading<R: Rng + ?Sized>(rng: &mut R) -> Reading {
    let mut fields = [0u16; FIELD_COUNT];
    for (i, field) in fields.iter_mut().enumerate() {
        let max = if i < 6 { MAX_SIMULATED_MASS } else { MAX_SIMULATED_COUNT };
        *field = rng.gen_range(0..=max);
    }
    Reading::from_fields(fields)
}

/// Stand-in sensor that synthesizes readings directly
pub struct SimulatedSensor<R = StdRng> {
    rng: R,
}

impl SimulatedSensor<StdRng> {
    /// Seeded from the OS
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Reproducible sequence
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for SimulatedSensor<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> SimulatedSensor<R> {
    pub fn from_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> ReadingSource for SimulatedSensor<R> {
    fn read(&mut self, _timeout: Duration) -> Result<Reading> {
        Ok(random_reading(&mut self.rng))
    }
}

/// Shape of a simulated byte stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamProfile {
    /// Up to this many junk bytes precede each frame
    pub max_garbage: usize,
    /// Probability that a frame has one payload bit flipped
    pub corruption_rate: f64,
}

impl Default for StreamProfile {
    fn default() -> Self {
        Self {
            max_garbage: 0,
            corruption_rate: 0.0,
        }
    }
}

/// Endless byte stream of encoded simulated frames.
///
/// Lets the full decode path run against a [`ByteSource`] without hardware.
pub struct SimulatedStream<R = StdRng> {
    rng: R,
    profile: StreamProfile,
    pending: VecDeque<u8>,
    frames: u64,
}

impl SimulatedStream<StdRng> {
    /// Seeded from the OS
    pub fn new(profile: StreamProfile) -> Self {
        Self::from_rng(StdRng::from_entropy(), profile)
    }

    /// Reproducible stream
    pub fn with_seed(seed: u64, profile: StreamProfile) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed), profile)
    }
}

impl<R: Rng> SimulatedStream<R> {
    pub fn from_rng(rng: R, mut profile: StreamProfile) -> Self {
        profile.corruption_rate = if profile.corruption_rate.is_finite() {
            profile.corruption_rate.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            rng,
            profile,
            pending: VecDeque::new(),
            frames: 0,
        }
    }

    /// Frames generated so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Leading junk plus one frame
    pub fn next_chunk(&mut self) -> Vec<u8> {
        let junk = self.rng.gen_range(0..=self.profile.max_garbage);
        // Junk never holds 0x42, and never opens with 0x4D since the previous
        // checksum may end in 0x42
        let mut chunk: Vec<u8> = (0..junk)
            .map(|i| loop {
                let byte: u8 = self.rng.gen();
                if byte != START_MARKER[0] && (i > 0 || byte != START_MARKER[1]) {
                    break byte;
                }
            })
            .collect();

        let mut frame = encode_frame(&random_reading(&mut self.rng));
        if self.rng.gen_bool(self.profile.corruption_rate) {
            let offset = 4 + self.rng.gen_range(0..PAYLOAD_LEN);
            frame[offset] ^= 1u8 << self.rng.gen_range(0..8u32);
            trace!(offset, "corrupted simulated frame");
        }
        chunk.extend_from_slice(&frame);

        self.frames += 1;
        chunk
    }
}

impl<R: Rng> ByteSource for SimulatedStream<R> {
    fn read_one(&mut self) -> pms_core::Result<u8> {
        if self.pending.is_empty() {
            let chunk = self.next_chunk();
            self.pending.extend(chunk);
        }
        self.pending.pop_front().ok_or(CoreError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::reader::FrameReader;

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn assert_in_range(reading: &Reading) {
        for value in reading.mass_concentrations() {
            assert!(value <= MAX_SIMULATED_MASS, "mass {value}");
        }
        for value in reading.particle_counts() {
            assert!(value <= MAX_SIMULATED_COUNT, "count {value}");
        }
    }

    #[test]
    fn test_simulated_readings_in_range() {
        let mut sensor = SimulatedSensor::new();
        for _ in 0..2000 {
            assert_in_range(&sensor.read(TIMEOUT).unwrap());
        }
    }

    #[test]
    fn test_seeded_sensor_is_reproducible() {
        let mut a = SimulatedSensor::with_seed(7);
        let mut b = SimulatedSensor::with_seed(7);
        for _ in 0..10 {
            assert_eq!(a.read(TIMEOUT).unwrap(), b.read(TIMEOUT).unwrap());
        }
    }

    #[test]
    fn test_simulated_values_vary() {
        let mut sensor = SimulatedSensor::with_seed(1);
        let first = sensor.read(TIMEOUT).unwrap();
        assert!((0..50).any(|_| sensor.read(TIMEOUT).unwrap() != first));
    }

    #[test]
    fn test_clean_stream_decodes() {
        let mut reader = FrameReader::new(SimulatedStream::with_seed(3, StreamProfile::default()));
        for _ in 0..100 {
            assert_in_range(&reader.read(TIMEOUT).unwrap());
        }
        assert_eq!(reader.stats().discarded_bytes, 0);
    }

    #[test]
    fn test_noisy_stream_resynchronizes() {
        let profile = StreamProfile {
            max_garbage: 40,
            corruption_rate: 0.0,
        };
        let mut reader = FrameReader::new(SimulatedStream::with_seed(11, profile));
        for _ in 0..100 {
            reader.read(TIMEOUT).unwrap();
        }
        assert_eq!(reader.source().frames(), 100);
    }

    #[test]
    fn test_corrupted_stream_fails_checksum() {
        let profile = StreamProfile {
            max_garbage: 0,
            corruption_rate: 1.0,
        };
        let mut reader = FrameReader::new(SimulatedStream::with_seed(5, profile));
        for _ in 0..50 {
            assert!(matches!(
                reader.read(TIMEOUT),
                Err(DecodeError::ChecksumMismatch { .. })
            ));
        }
    }

    #[test]
    fn test_noisy_stream_has_one_marker_per_frame() {
        let profile = StreamProfile {
            max_garbage: 40,
            corruption_rate: 0.0,
        };
        for seed in 0..20 {
            let mut stream = SimulatedStream::with_seed(seed, profile.clone());
            let bytes: Vec<u8> = (0..200).flat_map(|_| stream.next_chunk()).collect();
            let markers = bytes.windows(2).filter(|w| *w == START_MARKER).count();
            assert_eq!(markers, 200, "seed {seed}");
        }
    }

    #[test]
    fn test_non_finite_corruption_rate_disables_corruption() {
        for rate in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let profile = StreamProfile {
                max_garbage: 0,
                corruption_rate: rate,
            };
            let mut reader = FrameReader::new(SimulatedStream::with_seed(1, profile));
            for _ in 0..20 {
                assert_in_range(&reader.read(TIMEOUT).unwrap());
            }
        }
    }

    #[test]
    fn test_corruption_rate_is_clamped() {
        let profile = StreamProfile {
            max_garbage: 0,
            corruption_rate: 4.0,
        };
        let mut stream = SimulatedStream::with_seed(2, profile);
        assert_eq!(stream.next_chunk().len(), crate::frame::FRAME_SIZE);
    }
}
