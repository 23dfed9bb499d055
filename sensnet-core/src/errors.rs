//! Error Types for Radio Frames and Stored Groups
//!
//! ## Design Philosophy
//!
//! Everything that crosses the radio or comes back from flash is untrusted:
//! frames get truncated, bits flip, a neighbour network may share the channel.
//! Decoding therefore never panics and never reinterprets raw memory; it
//! returns a `DecodeError` that the caller logs and drops.
//!
//! The errors follow the same rules as the rest of the core:
//!
//! 1. **Small Size**: every variant fits in a few bytes, the enum is `Copy`.
//! 2. **No Heap Allocation**: no `String`, nothing boxed.
//! 3. **Actionable**: the variant says what was wrong with the input, so a
//!    receive loop can count discards per cause.
//!
//! Capacity exhaustion and unknown identifiers are *not* errors here. Storage
//! evicts by policy and the scheduler reports `None`; see the respective
//! modules.
//!
//! ```rust
//! use sensnet_core::errors::DecodeError;
//! use sensnet_core::wire::decode_frame;
//!
//! match decode_frame(&[0x07, 0, 0, 0, 0]) {
//!     Err(DecodeError::UnknownType(tag)) => assert_eq!(tag, 7),
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for decoding operations
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Reasons a frame or a stored group was rejected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Zero-length input, no type tag to look at
    #[error("Empty frame")]
    Empty,

    /// Type tag does not name any known packet
    #[error("Unknown packet type {0}")]
    UnknownType(u8),

    /// Frame length does not match the exact size of its declared type
    #[error("Frame size {actual} does not match expected {expected}")]
    SizeMismatch {
        /// Exact size the declared type requires
        expected: usize,
        /// Size actually received
        actual: usize,
    },

    /// Group header claims more payload than a group can hold
    #[error("Invalid group header")]
    InvalidGroupHeader,
}

#[cfg(feature = "defmt")]
impl defmt::Format for DecodeError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Empty => defmt::write!(fmt, "Empty frame"),
            Self::UnknownType(tag) => defmt::write!(fmt, "Unknown packet type {}", tag),
            Self::SizeMismatch { expected, actual } => {
                defmt::write!(fmt, "Frame size {} != {}", actual, expected)
            }
            Self::InvalidGroupHeader => defmt::write!(fmt, "Invalid group header"),
        }
    }
}
