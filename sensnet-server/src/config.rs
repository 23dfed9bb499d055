//! Base station configuration
//!
//! Loaded from a JSON file; every field has a default so an empty object
//! (or no file at all) gives a working 5 min / 20 min / 10 s network.
//!
//! ```json
//! {
//!   "measurement_period_secs": 300,
//!   "comms_period_secs": 1200,
//!   "slot_duration_secs": 10,
//!   "receive_timeout_ms": 1000,
//!   "require_pairing_window": false,
//!   "registry_path": "sensors.json",
//!   "bind_addr": "0.0.0.0:4210"
//! }
//! ```
//!
//! Periods below their lower bounds are clamped by the scheduler, not
//! rejected here.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sensnet_core::constants::{
    DEFAULT_COMMS_PERIOD_S, DEFAULT_MEASUREMENT_PERIOD_S, DEFAULT_RECEIVE_TIMEOUT_MS,
    DEFAULT_SLOT_DURATION_S,
};

use crate::scheduler::SlotScheduler;
use crate::{Result, ServerError};

/// Default UDP port of the radio bridge
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:4210";

/// Default pairing window length when the operator gives none
pub const DEFAULT_PAIRING_WINDOW_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub measurement_period_secs: u64,
    pub comms_period_secs: u64,
    pub slot_duration_secs: u64,
    /// Receive timeout of the collection loop
    pub receive_timeout_ms: u64,
    /// Refuse pairing requests outside an operator-opened window
    pub require_pairing_window: bool,
    pub pairing_window_secs: u64,
    /// How long measurements are kept; forever when absent
    pub history_days: Option<u64>,
    /// Registry file, loaded on start and rewritten after each pairing
    pub registry_path: Option<PathBuf>,
    /// Local address of the radio bridge socket
    pub bind_addr: String,
    /// Where frames are sent; the last sender when absent
    pub peer_addr: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            measurement_period_secs: DEFAULT_MEASUREMENT_PERIOD_S,
            comms_period_secs: DEFAULT_COMMS_PERIOD_S,
            slot_duration_secs: DEFAULT_SLOT_DURATION_S,
            receive_timeout_ms: DEFAULT_RECEIVE_TIMEOUT_MS,
            require_pairing_window: false,
            pairing_window_secs: DEFAULT_PAIRING_WINDOW_SECS,
            history_days: None,
            registry_path: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            peer_addr: None,
        }
    }
}

impl ServerConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Scheduler set up with these periods
    pub fn scheduler(&self) -> SlotScheduler {
        SlotScheduler::new(
            Duration::from_secs(self.measurement_period_secs),
            Duration::from_secs(self.comms_period_secs),
            Duration::from_secs(self.slot_duration_secs),
        )
    }

    pub fn history(&self) -> Option<Duration> {
        self.history_days
            .map(|days| Duration::from_secs(days.saturating_mul(24 * 3600)))
    }

    pub fn bind_socket_addr(&self) -> Result<SocketAddr> {
        parse_addr(&self.bind_addr)
    }

    pub fn peer_socket_addr(&self) -> Result<Option<SocketAddr>> {
        self.peer_addr.as_deref().map(parse_addr).transpose()
    }
}

fn parse_addr(text: &str) -> Result<SocketAddr> {
    text.parse()
        .map_err(|_| ServerError::Config(format!("invalid socket address '{}'", text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = ServerConfig::from_json("{}").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.scheduler().get_max_slot_count(), 120);
    }

    #[test]
    fn short_periods_are_clamped() {
        let config = ServerConfig::from_json(
            r#"{ "measurement_period_secs": 5, "slot_duration_secs": 2, "comms_period_secs": 1 }"#,
        )
        .unwrap();
        let scheduler = config.scheduler();
        assert_eq!(scheduler.get_measurement_period(), Duration::from_secs(30));
        assert_eq!(scheduler.get_max_slot_count(), 1);
    }

    #[test]
    fn bad_address_is_a_config_error() {
        let config = ServerConfig {
            bind_addr: "nowhere".into(),
            ..ServerConfig::default()
        };
        assert!(matches!(config.bind_socket_addr(), Err(ServerError::Config(_))));
        assert_eq!(config.peer_socket_addr().unwrap(), None);
    }

    #[test]
    fn history_saturates() {
        let config = ServerConfig {
            history_days: Some(u64::MAX),
            ..ServerConfig::default()
        };
        assert_eq!(config.history(), Some(Duration::from_secs(u64::MAX)));

        let config = ServerConfig {
            history_days: Some(2),
            ..ServerConfig::default()
        };
        assert_eq!(config.history(), Some(Duration::from_secs(2 * 24 * 3600)));
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(ServerConfig::from_json("{"), Err(ServerError::Json(_))));
    }
}
