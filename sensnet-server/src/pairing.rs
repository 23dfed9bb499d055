//! Pairing of new sensors
//!
//! A new sensor sends PAIR_REQUEST from the pairing address. The coordinator
//! reserves a slot first and only then takes the next address, so a full
//! network refuses the sensor without burning an address:
//!
//! ```text
//! request ──→ window ok? ──→ add_slot ──→ next address ──→ schedule ──→ register
//!                │               │
//!                ↓               ↓
//!          NotExpected /   CapacityExceeded
//!          WindowExpired   (nothing changed)
//! ```
//!
//! An operator can open a pairing window naming the next sensor. With
//! `require_window` set, requests outside a window are refused; otherwise
//! they are accepted under a generated name.

use std::time::Duration;

use log::{info, warn};
use sensnet_core::constants::FIRST_SENSOR_ADDRESS;
use sensnet_core::time::Timestamp;
use thiserror::Error;

use crate::registry::{Sensor, SensorRegistry};
use crate::scheduler::{SlotId, SlotScheduler};

/// Why a pairing request was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PairingError {
    #[error("No free slot, all {max_slots} slots are taken")]
    CapacityExceeded { max_slots: u32 },

    #[error("Pair request but not expecting any sensor")]
    NotExpected,

    #[error("Pair request for sensor '{name}' after its window closed")]
    WindowExpired { name: String },

    #[error("No sensor addresses left")]
    AddressesExhausted,
}

/// What a successfully paired sensor is told (and what the server keeps)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingGrant {
    pub address: u32,
    pub name: String,
    pub slot: SlotId,
    /// Server clock in unix seconds
    pub server_timestamp: i64,
    pub next_comm_time: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PairingWindow {
    name: String,
    deadline: Timestamp,
}

/// Hands out addresses and slots to new sensors
#[derive(Debug, Clone)]
pub struct PairingCoordinator {
    next_address: u32,
    window: Option<PairingWindow>,
    require_window: bool,
}

impl Default for PairingCoordinator {
    fn default() -> Self {
        Self::new(false)
    }
}

impl PairingCoordinator {
    pub fn new(require_window: bool) -> Self {
        Self {
            next_address: FIRST_SENSOR_ADDRESS,
            window: None,
            require_window,
        }
    }

    /// Address the next paired sensor gets
    pub fn next_address(&self) -> u32 {
        self.next_address
    }

    /// Move the address counter forward; it never goes back
    pub fn reserve_addresses_up_to(&mut self, next_address: u32) {
        self.next_address = self.next_address.max(next_address);
    }

    /// Accept one sensor named `name` until `now + timeout`
    pub fn open_window(&mut self, name: impl Into<String>, timeout: Duration, now: Timestamp) {
        let name = name.into();
        info!("expecting sensor '{}' for {:?}", name, timeout);
        self.window = Some(PairingWindow {
            name,
            deadline: now.saturating_add(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)),
        });
    }

    pub fn is_window_open(&self, now: Timestamp) -> bool {
        self.window.as_ref().is_some_and(|w| now <= w.deadline)
    }

    /// Handle one pairing request, all or nothing
    pub fn pair(
        &mut self,
        scheduler: &mut SlotScheduler,
        registry: &mut SensorRegistry,
        now: Timestamp,
    ) -> Result<PairingGrant, PairingError> {
        // u32::MAX marks the counter as used up
        if self.next_address == u32::MAX {
            warn!("pair request but no addresses are left");
            return Err(PairingError::AddressesExhausted);
        }

        let window = self.window.take();
        let name = match &window {
            Some(w) if now > w.deadline => {
                warn!("pair request for sensor '{}' but it timed out", w.name);
                return Err(PairingError::WindowExpired { name: w.name.clone() });
            }
            Some(w) => w.name.clone(),
            None if self.require_window => {
                warn!("pair request but not expecting any sensor");
                return Err(PairingError::NotExpected);
            }
            None => format!("sensor-{}", self.next_address),
        };

        let Some(slot) = scheduler.add_slot(now) else {
            self.window = window;
            return Err(PairingError::CapacityExceeded {
                max_slots: scheduler.get_max_slot_count(),
            });
        };

        let address = self.next_address;
        self.next_address += 1;

        let next_comm_time = scheduler.schedule(slot).unwrap_or(now);
        registry.insert(Sensor::new(address, name.clone(), slot, next_comm_time));

        info!("paired sensor '{}' as {} on slot {}", name, address, slot);
        Ok(PairingGrant {
            address,
            name,
            slot,
            server_timestamp: (now / 1000) as i64,
            next_comm_time,
        })
    }
}
