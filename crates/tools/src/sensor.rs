//! Sensor handles: hardware over a device node, or simulation

use crate::config::MonitorConfig;
use anyhow::{Context, Result};
use pms_core::prelude::*;
use pms_frame::prelude::*;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;
use tracing::info;

fn command_failure(err: CommandError) -> DecodeError {
    match err {
        CommandError::Io(e) => DecodeError::Source(CoreError::Io(e)),
        other => DecodeError::Source(CoreError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            other.to_string(),
        ))),
    }
}

/// A physical sensor: frames in on `R`, commands out on `W`
pub struct HardwareSensor<R, W> {
    reader: FrameReader<IoByteSource<R>>,
    control: SensorControl<W>,
}

impl HardwareSensor<File, File> {
    /// Open an already-configured device node for reading and writing
    pub fn open(path: &Path, eof: EofPolicy) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open sensor port: {:?}", path))?;
        let writer = file
            .try_clone()
            .context("Failed to clone sensor port handle")?;
        Ok(Self::from_parts(file, writer, eof))
    }
}

impl<R: Read, W: Write> HardwareSensor<R, W> {
    pub fn from_parts(reader: R, writer: W, eof: EofPolicy) -> Self {
        Self {
            reader: FrameReader::new(IoByteSource::new(reader).with_eof_policy(eof)),
            control: SensorControl::new(writer),
        }
    }

    pub fn mode(&self) -> ReportingMode {
        self.control.mode()
    }

    pub fn wake(&mut self) -> Result<()> {
        self.control.wake().context("Failed to wake sensor")
    }

    pub fn sleep(&mut self) -> Result<()> {
        self.control.sleep().context("Failed to put sensor to sleep")
    }

    pub fn set_mode(&mut self, mode: ReportingMode) -> Result<()> {
        self.control
            .set_mode(mode)
            .with_context(|| format!("Failed to set {:?} mode", mode))
    }

    /// Send a raw command without mode checks
    pub fn send(&mut self, command: SensorCommand) -> Result<()> {
        self.control
            .send(command)
            .with_context(|| format!("Failed to send {:?}", command))
    }

    pub fn stats(&self) -> &ReaderStats {
        self.reader.stats()
    }

    /// Put the sensor to sleep and drop the handles
    pub fn release(mut self) -> Result<()> {
        self.sleep()
    }
}

impl<R: Read, W: Write> ReadingSource for HardwareSensor<R, W> {
    fn read(&mut self, timeout: Duration) -> pms_frame::Result<Reading> {
        if self.control.mode() == ReportingMode::Passive {
            self.control.request_read().map_err(command_failure)?;
        }
        self.reader.read(timeout)
    }
}

/// Regular files and stdin are replayed; device nodes are treated as sensors
fn open_replay(port: &Path) -> Result<Option<Box<dyn Read + Send>>> {
    if port == Path::new("-") {
        return Ok(Some(Box::new(std::io::stdin())));
    }
    let metadata = std::fs::metadata(port)
        .with_context(|| format!("Failed to open sensor port: {:?}", port))?;
    if !metadata.is_file() {
        return Ok(None);
    }
    let file = File::open(port).with_context(|| format!("Failed to open capture: {:?}", port))?;
    Ok(Some(Box::new(file)))
}

/// Whatever the configuration selected as the reading source
pub enum SensorHandle {
    Hardware(HardwareSensor<File, File>),
    /// Read-only byte stream: a capture file or stdin (`-`)
    Replay(FrameReader<IoByteSource<Box<dyn Read + Send>>>),
    Simulated(SimulatedSensor),
}

impl SensorHandle {
    /// Open the configured source.
    ///
    /// Simulation is used only when requested; a missing port is an error.
    pub fn open(config: &MonitorConfig) -> Result<Self> {
        if config.simulate {
            info!("Using simulated sensor");
            let sensor = match config.seed {
                Some(seed) => SimulatedSensor::with_seed(seed),
                None => SimulatedSensor::new(),
            };
            return Ok(SensorHandle::Simulated(sensor));
        }

        let port = config
            .port
            .as_deref()
            .context("No sensor port given (use --port or --simulate)")?;
        if let Some(input) = open_replay(port)? {
            info!("Replaying frames from {:?}", port);
            return Ok(SensorHandle::Replay(FrameReader::new(IoByteSource::new(input))));
        }
        info!("Opening sensor on {:?}", port);

        let mut sensor = HardwareSensor::open(port, config.eof_policy())?;
        if config.wake_on_start {
            sensor.wake()?;
        }
        sensor.set_mode(config.mode)?;
        Ok(SensorHandle::Hardware(sensor))
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self, SensorHandle::Simulated(_))
    }

    /// Release the hardware, putting the sensor to sleep if asked
    pub fn release(self, sleep: bool) -> Result<()> {
        match self {
            SensorHandle::Hardware(sensor) if sleep => sensor.release(),
            _ => Ok(()),
        }
    }
}

impl ReadingSource for SensorHandle {
    fn read(&mut self, timeout: Duration) -> pms_frame::Result<Reading> {
        match self {
            SensorHandle::Hardware(sensor) => sensor.read(timeout),
            SensorHandle::Replay(reader) => reader.read(timeout),
            SensorHandle::Simulated(sensor) => sensor.read(timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn frame_bytes() -> (Reading, Vec<u8>) {
        let reading = Reading::from_fields([3, 4, 5, 3, 4, 5, 400, 300, 200, 100, 50, 25]);
        (reading, encode_frame(&reading).to_vec())
    }

    #[test]
    fn test_active_mode_reads_without_commands() {
        let (reading, bytes) = frame_bytes();
        let mut sensor = HardwareSensor::from_parts(Cursor::new(bytes), Vec::<u8>::new(), EofPolicy::Closed);

        assert_eq!(sensor.read(TIMEOUT).unwrap(), reading);
        assert!(sensor.control.get_ref().is_empty());
        assert_eq!(sensor.stats().frames_decoded, 1);
    }

    #[test]
    fn test_passive_mode_requests_each_frame() {
        let (reading, bytes) = frame_bytes();
        let mut doubled = bytes.clone();
        doubled.extend_from_slice(&bytes);
        let mut sensor = HardwareSensor::from_parts(Cursor::new(doubled), Vec::<u8>::new(), EofPolicy::Closed);

        sensor.set_mode(ReportingMode::Passive).unwrap();
        assert_eq!(sensor.read(TIMEOUT).unwrap(), reading);
        assert_eq!(sensor.read(TIMEOUT).unwrap(), reading);

        let written = sensor.control.get_ref();
        let request = SensorCommand::RequestRead.to_bytes();
        assert_eq!(written.len(), 3 * request.len());
        assert_eq!(&written[written.len() - request.len()..], &request);
    }

    #[test]
    fn test_sleep_command_written() {
        let mut sensor = HardwareSensor::from_parts(Cursor::new(Vec::<u8>::new()), Vec::<u8>::new(), EofPolicy::Closed);
        sensor.sleep().unwrap();
        assert_eq!(sensor.control.get_ref().as_slice(), &SensorCommand::Sleep.to_bytes());
    }

    #[test]
    fn test_simulation_requires_explicit_flag() {
        let config = MonitorConfig::default();
        assert!(SensorHandle::open(&config).is_err());

        let config = MonitorConfig {
            simulate: true,
            seed: Some(9),
            ..MonitorConfig::default()
        };
        let mut handle = SensorHandle::open(&config).unwrap();
        assert!(handle.is_simulated());
        assert!(handle.read(TIMEOUT).is_ok());
        handle.release(true).unwrap();
    }

    #[test]
    fn test_capture_file_is_replayed() {
        let (reading, bytes) = frame_bytes();
        let capture = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(capture.path(), &bytes).unwrap();

        let config = MonitorConfig {
            port: Some(capture.path().to_path_buf()),
            ..MonitorConfig::default()
        };
        let mut handle = SensorHandle::open(&config).unwrap();
        assert!(matches!(handle, SensorHandle::Replay(_)));
        assert_eq!(handle.read(TIMEOUT).unwrap(), reading);
        handle.release(true).unwrap();

        assert_eq!(std::fs::read(capture.path()).unwrap(), bytes);
    }

    #[test]
    fn test_missing_port_is_reported() {
        let config = MonitorConfig {
            port: Some("/nonexistent/ttyPMS".into()),
            ..MonitorConfig::default()
        };
        assert!(SensorHandle::open(&config).is_err());
    }
}
