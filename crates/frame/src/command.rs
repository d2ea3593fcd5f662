//! Host-to-sensor command frames

use crate::error::CommandError;
use crate::frame::START_MARKER;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::debug;

/// Size of a command frame on the wire
pub const COMMAND_SIZE: usize = 7;

/// Command bytes
pub mod command_codes {
    pub const CHANGE_MODE: u8 = 0xE1;
    pub const READ_PASSIVE: u8 = 0xE2;
    pub const SLEEP_WAKE: u8 = 0xE4;
}

/// How the sensor delivers frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportingMode {
    /// Frames stream continuously (power-up default)
    #[default]
    Active,
    /// Frames are sent only on request
    Passive,
}

/// Commands understood by the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorCommand {
    Sleep,
    Wake,
    SetMode(ReportingMode),
    RequestRead,
}

impl SensorCommand {
    fn code_and_data(self) -> (u8, u16) {
        use command_codes::*;
        match self {
            SensorCommand::Sleep => (SLEEP_WAKE, 0x0000),
            SensorCommand::Wake => (SLEEP_WAKE, 0x0001),
            SensorCommand::SetMode(ReportingMode::Passive) => (CHANGE_MODE, 0x0000),
            SensorCommand::SetMode(ReportingMode::Active) => (CHANGE_MODE, 0x0001),
            SensorCommand::RequestRead => (READ_PASSIVE, 0x0000),
        }
    }

    /// Encode as `42 4D CMD DATA_H DATA_L CHK_H CHK_L`
    pub fn to_bytes(self) -> [u8; COMMAND_SIZE] {
        let (code, data) = self.code_and_data();
        let data = data.to_be_bytes();
        let head = [START_MARKER[0], START_MARKER[1], code, data[0], data[1]];
        let sum = crate::frame::checksum([&head[..]]);

        let mut bytes = [0u8; COMMAND_SIZE];
        bytes[..5].copy_from_slice(&head);
        bytes[5..].copy_from_slice(&sum.to_be_bytes());
        bytes
    }
}

/// Sends commands to a sensor and tracks its reporting mode
pub struct SensorControl<W> {
    writer: W,
    mode: ReportingMode,
}

impl<W: Write> SensorControl<W> {
    /// Assumes the sensor is in its power-up `Active` mode
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            mode: ReportingMode::Active,
        }
    }

    /// Mode last set through this controller
    pub fn mode(&self) -> ReportingMode {
        self.mode
    }

    /// Write one command frame
    pub fn send(&mut self, command: SensorCommand) -> Result<(), CommandError> {
        debug!(?command, "sending sensor command");
        self.writer.write_all(&command.to_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn sleep(&mut self) -> Result<(), CommandError> {
        self.send(SensorCommand::Sleep)
    }

    /// Stable data follows about 30 s after wake-up while the fan spins up
    pub fn wake(&mut self) -> Result<(), CommandError> {
        self.send(SensorCommand::Wake)
    }

    pub fn set_mode(&mut self, mode: ReportingMode) -> Result<(), CommandError> {
        self.send(SensorCommand::SetMode(mode))?;
        self.mode = mode;
        Ok(())
    }

    /// Ask for one frame; only valid in passive mode
    pub fn request_read(&mut self) -> Result<(), CommandError> {
        if self.mode != ReportingMode::Passive {
            return Err(CommandError::RequestInActiveMode);
        }
        self.send(SensorCommand::RequestRead)
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_bytes() {
        assert_eq!(SensorCommand::Sleep.to_bytes(), [0x42, 0x4D, 0xE4, 0x00, 0x00, 0x01, 0x73]);
        assert_eq!(SensorCommand::Wake.to_bytes(), [0x42, 0x4D, 0xE4, 0x00, 0x01, 0x01, 0x74]);
        assert_eq!(
            SensorCommand::SetMode(ReportingMode::Active).to_bytes(),
            [0x42, 0x4D, 0xE1, 0x00, 0x01, 0x01, 0x71]
        );
        assert_eq!(
            SensorCommand::SetMode(ReportingMode::Passive).to_bytes(),
            [0x42, 0x4D, 0xE1, 0x00, 0x00, 0x01, 0x70]
        );
        assert_eq!(SensorCommand::RequestRead.to_bytes(), [0x42, 0x4D, 0xE2, 0x00, 0x00, 0x01, 0x71]);
    }

    #[test]
    fn test_request_rejected_in_active_mode() {
        let mut control = SensorControl::new(Vec::<u8>::new());
        assert!(matches!(control.request_read(), Err(CommandError::RequestInActiveMode)));
        assert!(control.get_ref().is_empty());
    }

    #[test]
    fn test_passive_request_sequence() {
        let mut control = SensorControl::new(Vec::<u8>::new());
        control.wake().unwrap();
        control.set_mode(ReportingMode::Passive).unwrap();
        control.request_read().unwrap();
        assert_eq!(control.mode(), ReportingMode::Passive);

        let written = control.into_inner();
        assert_eq!(written.len(), 3 * COMMAND_SIZE);
        assert_eq!(&written[14..], &SensorCommand::RequestRead.to_bytes());
    }

    #[test]
    fn test_write_failure_keeps_mode() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::ErrorKind::BrokenPipe.into())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut control = SensorControl::new(Broken);
        assert!(matches!(control.set_mode(ReportingMode::Passive), Err(CommandError::Io(_))));
        assert_eq!(control.mode(), ReportingMode::Active);
    }
}
