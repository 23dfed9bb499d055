//! Compact Storage Layout and Quantization Scales
//!
//! The sensor keeps its backlog in RAM (or a flash page per group), so every
//! byte is accounted for. A group is 37 bytes; 30 of them take 1110 bytes,
//! which is the budget the firmware reserves for buffered measurements.

// ===== GROUP LAYOUT =====

/// Number of groups held by the default storage.
pub const GROUP_COUNT: usize = 30;

/// Packed size of one group in bytes.
///
/// ```text
/// ┌────────┬─────┬──────────┬─────────────┬──────────────────┐
/// │ header │ vcc │ humidity │ temperature │ delta payload    │
/// │  1 B   │ 1 B │   1 B    │  2 B (LE)   │      32 B        │
/// └────────┴─────┴──────────┴─────────────┴──────────────────┘
/// ```
pub const GROUP_SIZE: usize = 37;

/// Bytes of delta-encoded payload per group.
pub const GROUP_PAYLOAD_SIZE: usize = 32;

/// Bits of delta-encoded payload per group.
pub const GROUP_PAYLOAD_BITS: usize = GROUP_PAYLOAD_SIZE * 8;

/// Granularity of the header's used-size field, in bits.
///
/// The field is 7 bits wide, so it cannot count 256 bits directly. Every
/// delta record is a whole number of nibbles, and the header stores
/// `used_bits / 4` (at most 64).
pub const USED_SIZE_UNIT_BITS: usize = 4;

// ===== QUANTIZATION SCALES =====

/// Supply voltage offset: the quantized value stores `vcc - 2.0 V`.
pub const VCC_BIAS: f32 = 2.0;

/// Supply voltage steps per volt (10 mV resolution, 2.00 V to 4.55 V).
pub const VCC_SCALE: f32 = 100.0;

/// Humidity steps per %RH (0 to 100 % mapped onto 0 to 255).
pub const HUMIDITY_SCALE: f32 = 2.55;

/// Temperature steps per °C (0.01 °C resolution).
pub const TEMPERATURE_SCALE: f32 = 100.0;
