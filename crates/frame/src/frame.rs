//! Wire frame layout, checksum and the decoded `Reading`

use serde::{Deserialize, Serialize};
use std::fmt;

/// Start marker that opens every frame ("BM")
pub const START_MARKER: [u8; 2] = [0x42, 0x4D];

/// Number of measurement fields carried in a frame
pub const FIELD_COUNT: usize = 12;

/// Payload bytes: 12 fields plus one reserved word
pub const PAYLOAD_LEN: usize = 2 * FIELD_COUNT + 2;

/// Value of the length field: payload plus checksum
pub const FRAME_LENGTH: u16 = (PAYLOAD_LEN + 2) as u16;

/// Total bytes on the wire
pub const FRAME_SIZE: usize = 4 + PAYLOAD_LEN + 2;

/// Sum of bytes, truncated to the 16-bit width of the checksum field.
///
/// Accumulates in 32 bits so longer inputs wrap only at the final truncation.
pub fn checksum<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> u16 {
    let sum = parts
        .into_iter()
        .flat_map(|part| part.iter())
        .fold(0u32, |acc, &byte| acc.wrapping_add(byte as u32));
    (sum & 0xFFFF) as u16
}

/// One decoded sensor transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reading {
    /// PM1.0 [μg/m³], CF=1
    pub atmospheric_pm1_0: u16,
    /// PM2.5 [μg/m³], CF=1
    pub atmospheric_pm2_5: u16,
    /// PM10 [μg/m³], CF=1
    pub atmospheric_pm10: u16,
    /// PM1.0 [μg/m³], standard atmosphere
    pub standard_pm1_0: u16,
    /// PM2.5 [μg/m³], standard atmosphere
    pub standard_pm2_5: u16,
    /// PM10 [μg/m³], standard atmosphere
    pub standard_pm10: u16,
    /// Particles > 0.3 µm per 0.1 L
    pub particles_over_0_3um: u16,
    /// Particles > 0.5 µm per 0.1 L
    pub particles_over_0_5um: u16,
    /// Particles > 1.0 µm per 0.1 L
    pub particles_over_1_0um: u16,
    /// Particles > 2.5 µm per 0.1 L
    pub particles_over_2_5um: u16,
    /// Particles > 5.0 µm per 0.1 L
    pub particles_over_5_0um: u16,
    /// Particles > 10 µm per 0.1 L
    pub particles_over_10um: u16,
}

impl Reading {
    /// Build a reading from fields in wire order
    pub fn from_fields(fields: [u16; FIELD_COUNT]) -> Self {
        let [
            atmospheric_pm1_0,
            atmospheric_pm2_5,
            atmospheric_pm10,
            standard_pm1_0,
            standard_pm2_5,
            standard_pm10,
            particles_over_0_3um,
            particles_over_0_5um,
            particles_over_1_0um,
            particles_over_2_5um,
            particles_over_5_0um,
            particles_over_10um,
        ] = fields;
        Self {
            atmospheric_pm1_0,
            atmospheric_pm2_5,
            atmospheric_pm10,
            standard_pm1_0,
            standard_pm2_5,
            standard_pm10,
            particles_over_0_3um,
            particles_over_0_5um,
            particles_over_1_0um,
            particles_over_2_5um,
            particles_over_5_0um,
            particles_over_10um,
        }
    }

    /// Fields in wire order
    pub fn to_fields(&self) -> [u16; FIELD_COUNT] {
        [
            self.atmospheric_pm1_0,
            self.atmospheric_pm2_5,
            self.atmospheric_pm10,
            self.standard_pm1_0,
            self.standard_pm2_5,
            self.standard_pm10,
            self.particles_over_0_3um,
            self.particles_over_0_5um,
            self.particles_over_1_0um,
            self.particles_over_2_5um,
            self.particles_over_5_0um,
            self.particles_over_10um,
        ]
    }

    /// Extract the twelve big-endian fields from a frame payload
    pub fn from_payload(payload: &[u8; PAYLOAD_LEN]) -> Self {
        let mut fields = [0u16; FIELD_COUNT];
        for (field, pair) in fields.iter_mut().zip(payload.chunks_exact(2)) {
            *field = u16::from_be_bytes([pair[0], pair[1]]);
        }
        Self::from_fields(fields)
    }

    /// Encode the fields as a frame payload, reserved word zeroed
    pub fn to_payload(&self) -> [u8; PAYLOAD_LEN] {
        let mut payload = [0u8; PAYLOAD_LEN];
        for (pair, field) in payload.chunks_exact_mut(2).zip(self.to_fields()) {
            pair.copy_from_slice(&field.to_be_bytes());
        }
        payload
    }

    /// Mass concentrations, atmospheric then standard
    pub fn mass_concentrations(&self) -> [u16; 6] {
        let fields = self.to_fields();
        [fields[0], fields[1], fields[2], fields[3], fields[4], fields[5]]
    }

    /// Cumulative particle counts, smallest size first
    pub fn particle_counts(&self) -> [u16; 6] {
        let fields = self.to_fields();
        [fields[6], fields[7], fields[8], fields[9], fields[10], fields[11]]
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PM1.0 (CF=1): {}", self.atmospheric_pm1_0)?;
        writeln!(f, "PM2.5 (CF=1): {}", self.atmospheric_pm2_5)?;
        writeln!(f, "PM10  (CF=1): {}", self.atmospheric_pm10)?;
        writeln!(f, "PM1.0  (STD): {}", self.standard_pm1_0)?;
        writeln!(f, "PM2.5  (STD): {}", self.standard_pm2_5)?;
        writeln!(f, "PM10   (STD): {}", self.standard_pm10)?;
        writeln!(f, ">0.3um      : {}", self.particles_over_0_3um)?;
        writeln!(f, ">0.5um      : {}", self.particles_over_0_5um)?;
        writeln!(f, ">1.0um      : {}", self.particles_over_1_0um)?;
        writeln!(f, ">2.5um      : {}", self.particles_over_2_5um)?;
        writeln!(f, ">5.0um      : {}", self.particles_over_5_0um)?;
        write!(f, ">10um       : {}", self.particles_over_10um)
    }
}

/// Encode a reading as a complete, valid wire frame
pub fn encode_frame(reading: &Reading) -> [u8; FRAME_SIZE] {
    let length = FRAME_LENGTH.to_be_bytes();
    let payload = reading.to_payload();
    let sum = checksum([&START_MARKER[..], &length[..], &payload[..]]);

    let mut frame = [0u8; FRAME_SIZE];
    frame[..2].copy_from_slice(&START_MARKER);
    frame[2..4].copy_from_slice(&length);
    frame[4..4 + PAYLOAD_LEN].copy_from_slice(&payload);
    frame[4 + PAYLOAD_LEN..].copy_from_slice(&sum.to_be_bytes());
    frame
}
