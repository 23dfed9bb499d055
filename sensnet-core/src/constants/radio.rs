//! Network Addresses and Frame Geometry
//!
//! The network is a star: one base station, many sensors, one channel.
//! Addresses are split into fixed ranges so a receiver can tell from the
//! header alone whether a frame comes from a paired sensor, a sensor that
//! is still pairing, or the base station itself.

// ===== ADDRESS RANGES =====

/// Address nobody owns; frames sent here are heard by everyone.
pub const BROADCAST_ADDRESS: u32 = 0;

/// First address of the pairing range.
///
/// Unpaired sensors transmit their PAIR_REQUEST from this range and
/// listen for the PAIR_RESPONSE on the same address.
pub const PAIR_ADDRESS_BEGIN: u32 = BROADCAST_ADDRESS + 1;

/// Last address of the pairing range (inclusive).
pub const PAIR_ADDRESS_END: u32 = PAIR_ADDRESS_BEGIN + 1000;

/// Address an unpaired sensor uses for its pairing handshake.
pub const PAIR_ADDRESS: u32 = PAIR_ADDRESS_BEGIN;

/// First address handed out to a paired sensor.
///
/// Addresses are assigned monotonically from here and never reused, even
/// after the sensor is removed.
pub const FIRST_SENSOR_ADDRESS: u32 = PAIR_ADDRESS_END + 1;

/// The base station.
pub const SERVER_ADDRESS: u32 = 0xFFFF;

// ===== FRAME GEOMETRY =====

/// Frame header: 1-byte type tag followed by a 4-byte little-endian address.
pub const FRAME_HEADER_SIZE: usize = 5;

/// Largest payload any packet type carries (PAIR_RESPONSE).
pub const MAX_PAYLOAD_SIZE: usize = 12;

/// Largest frame on the air, header included.
///
/// Encoded frames are built into a `heapless::Vec` of this capacity so the
/// sensor never touches a heap.
pub const MAX_FRAME_SIZE: usize = FRAME_HEADER_SIZE + MAX_PAYLOAD_SIZE;
