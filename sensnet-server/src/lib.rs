//! Base Station for a Slot-Scheduled Sensor Network
//!
//! ## Overview
//!
//! The base station is the only always-on node. It hands out addresses and
//! transmission slots, collects the measurements sensors flush during their
//! slot, and keeps per-sensor history in memory.
//!
//! ```text
//!              ┌──────────────────── Network ───────────────────┐
//!  radio ──→ CollectionLoop ──→ PairingCoordinator ──→ SlotScheduler
//!              │                    │
//!              │                    └──→ SensorRegistry ←── export (TSV)
//!              └──→ measurements ───────────┘
//!  stdin ──→ commands ──→ Network
//! ```
//!
//! ## Modules
//!
//! - [`scheduler`]: slot assignment inside the comms period
//! - [`pairing`]: address and slot allocation for new sensors
//! - [`registry`]: paired sensors, their history and the registry file
//! - [`network`]: keeps the three above consistent
//! - [`collection`]: the receive loop
//! - [`commands`]: operator console
//! - [`export`]: tab-separated history dumps
//! - [`udp`]: radio bridge over UDP
//! - [`config`]: JSON configuration
//!
//! ## Example
//!
//! ```rust
//! use sensnet_server::Network;
//!
//! let mut network = Network::default();
//! let grant = network.pair(0).unwrap();
//! assert_eq!(grant.address, 1002);
//! assert_eq!(network.scheduler().get_max_slot_count(), 120);
//! ```

use sensnet_core::errors::DecodeError;
use thiserror::Error;

pub mod collection;
pub mod commands;
pub mod config;
pub mod export;
pub mod network;
pub mod pairing;
pub mod registry;
pub mod scheduler;
pub mod udp;

pub use collection::{CollectionLoop, CollectionStats, DiscardReason, PollOutcome};
pub use commands::{Command, Flow};
pub use config::ServerConfig;
pub use network::Network;
pub use pairing::{PairingCoordinator, PairingError, PairingGrant};
pub use registry::{Record, Sensor, SensorRegistry};
pub use scheduler::{SlotId, SlotScheduler};
pub use udp::UdpRadio;

/// Result type for base station operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Base station errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Pairing refused: {0}")]
    Pairing(#[from] PairingError),

    #[error("Unknown sensor {0}")]
    UnknownSensor(u32),

    #[error("Measurement from the past for sensor {address}: last {last}, new {timestamp}")]
    StaleRecord { address: u32, last: u32, timestamp: u32 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid command: {0}")]
    Command(String),
}
