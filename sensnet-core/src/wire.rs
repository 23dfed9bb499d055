//! Radio Frame Format
//!
//! Every frame is a 5-byte header followed by a payload whose size is fixed
//! by the packet type. All integers are little-endian.
//!
//! ```text
//! ┌──────┬──────────────┬──────────────────────────────┐
//! │ type │ address (LE) │ payload                      │
//! │ 1 B  │     4 B      │ 0 / 9 / 12 B, fixed per type │
//! └──────┴──────────────┴──────────────────────────────┘
//! ```
//!
//! `address` is the sender on uplink frames and the destination on downlink
//! frames. A frame whose length is not exactly the size of its declared type
//! is rejected; nothing is ever reinterpreted from raw memory.
//!
//! | type              | tag | payload                                          | frame |
//! |-------------------|-----|--------------------------------------------------|-------|
//! | `MEASUREMENT`     | 0   | index u8, timestamp u32, vcc u8, hum u8, temp i16 | 14    |
//! | `PAIR_REQUEST`    | 1   | none                                             | 5     |
//! | `PAIR_RESPONSE`   | 2   | address u32, server timestamp i64                | 17    |

use crate::constants::radio::{FRAME_HEADER_SIZE, MAX_FRAME_SIZE};
use crate::errors::{DecodeError, DecodeResult};
use crate::measurement::{Measurement, Quantized};

/// Encoded frame, never larger than [`MAX_FRAME_SIZE`]
pub type FrameBuf = heapless::Vec<u8, MAX_FRAME_SIZE>;

/// Packet type tag, first byte of every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PacketType {
    Measurement = 0,
    PairRequest = 1,
    PairResponse = 2,
}

impl PacketType {
    /// Exact frame size for this type, header included
    pub const fn frame_size(self) -> usize {
        FRAME_HEADER_SIZE + self.payload_size()
    }

    pub const fn payload_size(self) -> usize {
        match self {
            Self::Measurement => MeasurementPacket::SIZE,
            Self::PairRequest => 0,
            Self::PairResponse => PairResponse::SIZE,
        }
    }
}

impl TryFrom<u8> for PacketType {
    type Error = DecodeError;

    fn try_from(tag: u8) -> DecodeResult<Self> {
        match tag {
            0 => Ok(Self::Measurement),
            1 => Ok(Self::PairRequest),
            2 => Ok(Self::PairResponse),
            other => Err(DecodeError::UnknownType(other)),
        }
    }
}

/// One buffered measurement on its way to the base station
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MeasurementPacket {
    /// Running counter, wraps at 256
    pub index: u8,
    /// Unix seconds at which the sample was taken
    pub timestamp: u32,
    pub vcc: u8,
    pub humidity: u8,
    pub temperature: i16,
}

impl MeasurementPacket {
    pub const SIZE: usize = 9;

    pub fn new(index: u8, timestamp: u32, value: Quantized) -> Self {
        Self {
            index,
            timestamp,
            vcc: value.vcc,
            humidity: value.humidity,
            temperature: value.temperature,
        }
    }

    pub fn quantized(&self) -> Quantized {
        Quantized {
            temperature: self.temperature,
            humidity: self.humidity,
            vcc: self.vcc,
        }
    }

    pub fn measurement(&self) -> Measurement {
        self.quantized().to_measurement()
    }

    fn write(&self, out: &mut [u8]) {
        out[0] = self.index;
        out[1..5].copy_from_slice(&self.timestamp.to_le_bytes());
        out[5] = self.vcc;
        out[6] = self.humidity;
        out[7..9].copy_from_slice(&self.temperature.to_le_bytes());
    }

    fn read(payload: &[u8]) -> Self {
        Self {
            index: payload[0],
            timestamp: u32::from_le_bytes([payload[1], payload[2], payload[3], payload[4]]),
            vcc: payload[5],
            humidity: payload[6],
            temperature: i16::from_le_bytes([payload[7], payload[8]]),
        }
    }
}

/// Server answer to a pairing request
///
/// The frame header carries the pairing address the request came from; the
/// payload carries the sensor's new permanent address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PairResponse {
    pub address: u32,
    /// Server clock in unix seconds when the response was built
    pub server_timestamp: i64,
}

impl PairResponse {
    pub const SIZE: usize = 12;

    fn write(&self, out: &mut [u8]) {
        out[0..4].copy_from_slice(&self.address.to_le_bytes());
        out[4..12].copy_from_slice(&self.server_timestamp.to_le_bytes());
    }

    fn read(payload: &[u8]) -> Self {
        let mut address = [0u8; 4];
        let mut timestamp = [0u8; 8];
        address.copy_from_slice(&payload[0..4]);
        timestamp.copy_from_slice(&payload[4..12]);
        Self {
            address: u32::from_le_bytes(address),
            server_timestamp: i64::from_le_bytes(timestamp),
        }
    }
}

/// Decoded payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Packet {
    Measurement(MeasurementPacket),
    PairRequest,
    PairResponse(PairResponse),
}

impl Packet {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Self::Measurement(_) => PacketType::Measurement,
            Self::PairRequest => PacketType::PairRequest,
            Self::PairResponse(_) => PacketType::PairResponse,
        }
    }
}

/// Header address plus packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    pub address: u32,
    pub packet: Packet,
}

impl Frame {
    pub const fn new(address: u32, packet: Packet) -> Self {
        Self { address, packet }
    }

    /// Serialize into `out`, returning the frame length
    pub fn encode_into(&self, out: &mut [u8; MAX_FRAME_SIZE]) -> usize {
        let packet_type = self.packet.packet_type();
        out[0] = packet_type as u8;
        out[1..FRAME_HEADER_SIZE].copy_from_slice(&self.address.to_le_bytes());

        let payload = &mut out[FRAME_HEADER_SIZE..];
        match &self.packet {
            Packet::Measurement(m) => m.write(payload),
            Packet::PairRequest => {}
            Packet::PairResponse(r) => r.write(payload),
        }
        packet_type.frame_size()
    }

    pub fn encode(&self) -> FrameBuf {
        let mut out = [0u8; MAX_FRAME_SIZE];
        let len = self.encode_into(&mut out);
        // len <= MAX_FRAME_SIZE for every packet type
        FrameBuf::from_slice(&out[..len]).unwrap_or_default()
    }
}

/// Classify and decode a received frame
///
/// The type tag must be known and the length must equal that type's frame
/// size exactly.
pub fn decode_frame(bytes: &[u8]) -> DecodeResult<Frame> {
    let tag = *bytes.first().ok_or(DecodeError::Empty)?;
    let packet_type = PacketType::try_from(tag)?;

    let expected = packet_type.frame_size();
    if bytes.len() != expected {
        return Err(DecodeError::SizeMismatch {
            expected,
            actual: bytes.len(),
        });
    }

    let address = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
    let payload = &bytes[FRAME_HEADER_SIZE..];
    let packet = match packet_type {
        PacketType::Measurement => Packet::Measurement(MeasurementPacket::read(payload)),
        PacketType::PairRequest => Packet::PairRequest,
        PacketType::PairResponse => Packet::PairResponse(PairResponse::read(payload)),
    };

    Ok(Frame { address, packet })
}
