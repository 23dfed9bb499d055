//! Constants for sensnet Core
//!
//! All numeric values shared between the sensor firmware and the base
//! station live here, next to an explanation of where they come from.
//! Several of them are part of the on-air or on-flash format: changing
//! them breaks compatibility with already deployed sensors.
//!
//! ## Organization
//!
//! - **Radio**: network addresses and frame sizes
//! - **Storage**: group layout and quantization scales
//! - **Time**: unit conversions, scheduling defaults and lower bounds

/// Network addresses and frame geometry.
pub mod radio;

/// Compact storage layout and quantization scales.
pub mod storage;

/// Time conversions and scheduling limits.
pub mod time;

pub use radio::{
    BROADCAST_ADDRESS, PAIR_ADDRESS, FIRST_SENSOR_ADDRESS, SERVER_ADDRESS,
    FRAME_HEADER_SIZE, MAX_FRAME_SIZE,
};

pub use storage::{GROUP_COUNT, GROUP_SIZE, GROUP_PAYLOAD_SIZE, GROUP_PAYLOAD_BITS};

pub use time::{
    MS_PER_SECOND, DEFAULT_MEASUREMENT_PERIOD_S, DEFAULT_COMMS_PERIOD_S,
    DEFAULT_SLOT_DURATION_S, MIN_MEASUREMENT_PERIOD_S, MIN_SLOT_DURATION_S,
    DEFAULT_RECEIVE_TIMEOUT_MS,
};
