//! Sensor-side core for sensnet
//!
//! Everything a battery sensor needs to survive radio outages and share one
//! channel with its neighbours: bit packing, measurement quantization, the
//! compact group storage, the interrupt sample queue and the radio frame
//! format. The base station links the same crate for the frame codec.
//!
//! Key constraints:
//! - Runs without an allocator (`default-features = false`)
//! - No heap allocation anywhere, fixed memory per storage
//! - Malformed input is rejected, never panicked on
//!
//! ```
//! use sensnet_core::{CompactStorage, Measurement};
//! use sensnet_core::wire::{decode_frame, Frame, MeasurementPacket, Packet};
//!
//! let mut storage: CompactStorage = CompactStorage::new();
//! storage.push(Measurement::new(21.37, 45.0, 3.3));
//!
//! let value = storage.iter_quantized().next().unwrap();
//! let frame = Frame::new(1002, Packet::Measurement(MeasurementPacket::new(0, 1_700_000_000, value)));
//! let bytes = frame.encode();
//! assert_eq!(decode_frame(&bytes), Ok(frame));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod macros;

pub mod bitpack;
pub mod constants;
pub mod errors;
pub mod measurement;
pub mod node;
pub mod queue;
pub mod storage;
pub mod time;
pub mod traits;
pub mod wire;

// Public API
pub use bitpack::BitPacker;
pub use errors::{DecodeError, DecodeResult};
pub use measurement::{Measurement, Quantized};
pub use node::{NodeError, SensorNode};
pub use queue::{Consumer, Producer, SpscQueue};
pub use storage::{CompactStorage, Group, StorageIter};
pub use time::{FixedTime, Timestamp, TimeSource};
pub use traits::{Radio, SampleSource};
pub use wire::{decode_frame, Frame, Packet, PacketType};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
