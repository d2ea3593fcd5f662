//! Polling loop with caller-side retry policy

use crate::config::{MonitorConfig, OutputFormat};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use pms_frame::prelude::*;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// One reading with the time it was taken
#[derive(Debug, Clone, Serialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    /// Reads it took to get this reading
    pub attempts: u32,
    #[serde(flatten)]
    pub reading: Reading,
}

impl Sample {
    /// Render for output
    pub fn format(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Text => Ok(format!(
                "=============== {}\n{}",
                self.timestamp.format("%Y-%m-%d %H:%M:%S"),
                self.reading
            )),
            OutputFormat::Json => serde_json::to_string(self).context("Failed to encode sample"),
        }
    }
}

/// Polls a reading source, discarding and retrying transient failures
pub struct Monitor<S> {
    source: S,
    timeout: Duration,
    max_attempts: u32,
    discarded: u64,
}

impl<S: ReadingSource> Monitor<S> {
    pub fn new(source: S, config: &MonitorConfig) -> Self {
        Self {
            source,
            timeout: config.timeout(),
            max_attempts: config.max_attempts.max(1),
            discarded: 0,
        }
    }

    /// Failed reads discarded so far
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    /// Take one reading, retrying transient decode failures
    pub fn poll(&mut self) -> Result<Sample> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.source.read(self.timeout) {
                Ok(reading) => {
                    debug!(attempts, "reading decoded");
                    return Ok(Sample {
                        timestamp: Utc::now(),
                        attempts,
                        reading,
                    });
                }
                Err(e) if e.is_transient() && attempts < self.max_attempts => {
                    warn!(attempts, error = %e, "discarding failed read");
                    self.discarded += 1;
                }
                Err(e) => {
                    self.discarded += 1;
                    return Err(e)
                        .with_context(|| format!("No reading after {} attempt(s)", attempts));
                }
            }
        }
    }

    /// Poll `count` times (forever when `None`), pausing `interval` between
    /// readings. Returns the number of samples delivered to `sink`.
    pub fn run<F>(&mut self, count: Option<u64>, interval: Duration, mut sink: F) -> Result<u64>
    where
        F: FnMut(&Sample) -> Result<()>,
    {
        let mut taken = 0;
        while count.map_or(true, |c| taken < c) {
            let sample = self.poll()?;
            sink(&sample)?;
            taken += 1;

            if count.map_or(true, |c| taken < c) && !interval.is_zero() {
                std::thread::sleep(interval);
            }
        }
        Ok(taken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pms_core::source::SliceSource;
    use pms_frame::frame::FIELD_COUNT;

    fn config(max_attempts: u32) -> MonitorConfig {
        MonitorConfig {
            timeout_ms: 200,
            max_attempts,
            ..MonitorConfig::default()
        }
    }

    fn reading(value: u16) -> Reading {
        Reading::from_fields([value; FIELD_COUNT])
    }

    fn corrupted(value: u16) -> Vec<u8> {
        let mut frame = encode_frame(&reading(value));
        frame[10] ^= 0x10;
        frame.to_vec()
    }

    #[test]
    fn test_retries_transient_failures() {
        let mut bytes = corrupted(1);
        bytes.extend_from_slice(&corrupted(2));
        bytes.extend_from_slice(&encode_frame(&reading(3)));

        let mut monitor = Monitor::new(FrameReader::new(SliceSource::new(bytes)), &config(5));
        let sample = monitor.poll().unwrap();
        assert_eq!(sample.reading, reading(3));
        assert_eq!(sample.attempts, 3);
        assert_eq!(monitor.discarded(), 2);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let mut bytes = Vec::new();
        for value in 0..4 {
            bytes.extend_from_slice(&corrupted(value));
        }
        bytes.extend_from_slice(&encode_frame(&reading(9)));

        let mut monitor = Monitor::new(FrameReader::new(SliceSource::new(bytes)), &config(3));
        let err = monitor.poll().unwrap_err();
        assert!(err.to_string().contains("3 attempt(s)"));
        assert!(matches!(
            err.downcast_ref::<DecodeError>(),
            Some(DecodeError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_closed_source_is_not_retried() {
        let mut monitor = Monitor::new(FrameReader::new(SliceSource::new(vec![0u8; 5])), &config(5));
        let err = monitor.poll().unwrap_err();
        assert!(err.to_string().contains("1 attempt(s)"));
        assert_eq!(monitor.into_inner().stats().truncated_frames, 1);
    }

    #[test]
    fn test_run_collects_samples() {
        let sensor = SimulatedSensor::with_seed(42);
        let mut monitor = Monitor::new(sensor, &config(1));

        let mut seen = Vec::new();
        let taken = monitor
            .run(Some(4), Duration::ZERO, |sample| {
                seen.push(sample.reading);
                Ok(())
            })
            .unwrap();
        assert_eq!(taken, 4);
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_sink_error_stops_run() {
        let mut monitor = Monitor::new(SimulatedSensor::with_seed(1), &config(1));
        let result = monitor.run(None, Duration::ZERO, |_| anyhow::bail!("sink closed"));
        assert!(result.is_err());
    }

    #[test]
    fn test_sample_formats() {
        let sample = Sample {
            timestamp: Utc::now(),
            attempts: 1,
            reading: reading(7),
        };

        let json: serde_json::Value =
            serde_json::from_str(&sample.format(OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["atmospheric_pm2_5"], 7);
        assert_eq!(json["attempts"], 1);
        assert!(json["timestamp"].is_string());

        let text = sample.format(OutputFormat::Text).unwrap();
        assert!(text.contains("PM2.5 (CF=1): 7"));
    }
}
