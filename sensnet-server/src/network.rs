//! The base station's view of the network
//!
//! `Network` owns the slot scheduler, the sensor registry and the pairing
//! coordinator, and keeps them consistent: a sensor exists exactly while it
//! holds a slot, and addresses only ever move forward.

use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use sensnet_core::time::Timestamp;

use crate::config::ServerConfig;
use crate::pairing::{PairingCoordinator, PairingError, PairingGrant};
use crate::registry::{Record, RegistryFile, Sensor, SensorRegistry};
use crate::scheduler::SlotScheduler;
use crate::{Result, ServerError};

#[derive(Debug, Clone, Default)]
pub struct Network {
    scheduler: SlotScheduler,
    registry: SensorRegistry,
    pairing: PairingCoordinator,
}

impl Network {
    pub fn new(config: &ServerConfig) -> Self {
        let mut registry = SensorRegistry::new();
        registry.set_history(config.history());
        Self {
            scheduler: config.scheduler(),
            registry,
            pairing: PairingCoordinator::new(config.require_pairing_window),
        }
    }

    pub fn from_parts(scheduler: SlotScheduler, pairing: PairingCoordinator) -> Self {
        Self {
            scheduler,
            registry: SensorRegistry::new(),
            pairing,
        }
    }

    /// Handle a pairing request received at `now`
    pub fn pair(&mut self, now: Timestamp) -> std::result::Result<PairingGrant, PairingError> {
        self.pairing.pair(&mut self.scheduler, &mut self.registry, now)
    }

    pub fn open_pairing_window(&mut self, name: impl Into<String>, timeout: Duration, now: Timestamp) {
        self.pairing.open_window(name, timeout, now);
    }

    /// Forget a sensor and free its slot; its address is never reused
    pub fn remove_sensor(&mut self, address: u32) -> Result<Sensor> {
        let sensor = self
            .registry
            .remove(address)
            .ok_or(ServerError::UnknownSensor(address))?;
        self.scheduler.remove_slot(sensor.time_slot);
        info!("removed sensor {} '{}'", address, sensor.name);
        Ok(sensor)
    }

    /// Store a record received from `address`
    pub fn record(&mut self, address: u32, record: Record, now: Timestamp) -> Result<()> {
        self.registry.add_record(address, record, now)
    }

    /// Give a sensor its next transmission time
    pub fn reschedule(&mut self, address: u32) -> Result<Timestamp> {
        let sensor = self
            .registry
            .get_mut(address)
            .ok_or(ServerError::UnknownSensor(address))?;
        let next = self
            .scheduler
            .schedule(sensor.time_slot)
            .ok_or(ServerError::UnknownSensor(address))?;
        sensor.next_comm_time = next;
        Ok(next)
    }

    pub fn save_registry(&self, path: impl AsRef<Path>) -> Result<()> {
        RegistryFile {
            next_address: self.pairing.next_address(),
            sensors: self.registry.entries(),
        }
        .save(path)
    }

    /// Replace all sensors with the ones in the registry file
    ///
    /// Each loaded sensor gets a fresh slot. Sensors that do not fit in the
    /// comms period are skipped. Returns the number loaded.
    pub fn load_registry(&mut self, path: impl AsRef<Path>, now: Timestamp) -> Result<usize> {
        let file = RegistryFile::load(path)?;

        let addresses: Vec<u32> = self.registry.iter().map(|s| s.address).collect();
        for address in addresses {
            self.remove_sensor(address)?;
        }

        let mut loaded = 0;
        let mut next_address = file.next_address;
        for entry in file.sensors {
            next_address = next_address.max(entry.address.saturating_add(1));

            let Some(slot) = self.scheduler.add_slot(now) else {
                warn!("no slot left for sensor {} '{}'", entry.address, entry.name);
                continue;
            };
            let next_comm_time = self.scheduler.schedule(slot).unwrap_or(now);
            info!("loaded sensor {} '{}'", entry.address, entry.name);
            self.registry
                .insert(Sensor::new(entry.address, entry.name, slot, next_comm_time));
            loaded += 1;
        }

        self.pairing.reserve_addresses_up_to(next_address);
        Ok(loaded)
    }

    pub fn scheduler(&self) -> &SlotScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut SlotScheduler {
        &mut self.scheduler
    }

    pub fn registry(&self) -> &SensorRegistry {
        &self.registry
    }

    pub fn pairing(&self) -> &PairingCoordinator {
        &self.pairing
    }

    pub fn sensor(&self, address: u32) -> Option<&Sensor> {
        self.registry.get(address)
    }
}
