//! Paired sensors and their measurement history
//!
//! Each sensor keeps an append-only, time-ordered list of records. A record
//! older than the last stored one is refused, so the list never has to be
//! sorted. An optional retention window prunes records from the front.
//!
//! Only identity survives a restart: the registry file lists addresses and
//! names plus the next address to hand out, so addresses stay unique even
//! across removals.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sensnet_core::time::Timestamp;
use sensnet_core::Measurement;

use crate::scheduler::SlotId;
use crate::{Result, ServerError};

/// One measurement as received from a sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unix seconds the sensor took the sample at
    pub timestamp: u32,
    /// Sensor's running packet counter
    pub index: u8,
    pub measurement: Measurement,
}

/// A paired sensor
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    pub address: u32,
    pub name: String,
    pub time_slot: SlotId,
    /// When the sensor is next expected on air
    pub next_comm_time: Timestamp,
    records: Vec<Record>,
}

impl Sensor {
    pub fn new(address: u32, name: impl Into<String>, time_slot: SlotId, next_comm_time: Timestamp) -> Self {
        Self {
            address,
            name: name.into(),
            time_slot,
            next_comm_time,
            records: Vec::new(),
        }
    }

    /// Records, oldest first
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn last_record(&self) -> Option<&Record> {
        self.records.last()
    }

    /// Records with `begin <= timestamp <= end`
    pub fn records_between(&self, begin: u32, end: u32) -> &[Record] {
        let start = self.records.partition_point(|r| r.timestamp < begin);
        let stop = self.records.partition_point(|r| r.timestamp <= end);
        &self.records[start..stop.max(start)]
    }

    fn prune_before(&mut self, cutoff: u32) {
        let stale = self.records.partition_point(|r| r.timestamp < cutoff);
        if stale > 0 {
            self.records.drain(..stale);
        }
    }
}

/// Persisted identity of a sensor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorEntry {
    pub address: u32,
    pub name: String,
}

/// Registry file contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryFile {
    pub next_address: u32,
    pub sensors: Vec<SensorEntry>,
}

impl RegistryFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }
}

/// All paired sensors, keyed by address
#[derive(Debug, Clone, Default)]
pub struct SensorRegistry {
    sensors: BTreeMap<u32, Sensor>,
    history: Option<Duration>,
}

impl SensorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only records younger than `history`
    pub fn with_history(mut self, history: Duration) -> Self {
        self.history = Some(history);
        self
    }

    pub fn set_history(&mut self, history: Option<Duration>) {
        self.history = history;
    }

    pub fn insert(&mut self, sensor: Sensor) {
        debug!("sensor {} '{}' registered on slot {}", sensor.address, sensor.name, sensor.time_slot);
        self.sensors.insert(sensor.address, sensor);
    }

    pub fn remove(&mut self, address: u32) -> Option<Sensor> {
        self.sensors.remove(&address)
    }

    pub fn get(&self, address: u32) -> Option<&Sensor> {
        self.sensors.get(&address)
    }

    pub fn get_mut(&mut self, address: u32) -> Option<&mut Sensor> {
        self.sensors.get_mut(&address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sensor> {
        self.sensors.values()
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Append a record to a sensor's history
    ///
    /// Fails for an unknown address and for a record older than the last
    /// one stored. Records already outside the retention window are
    /// accepted and dropped.
    pub fn add_record(&mut self, address: u32, record: Record, now: Timestamp) -> Result<()> {
        let cutoff = self.cutoff(now);
        let sensor = self
            .sensors
            .get_mut(&address)
            .ok_or(ServerError::UnknownSensor(address))?;

        if let Some(last) = sensor.last_record() {
            if last.timestamp > record.timestamp {
                return Err(ServerError::StaleRecord {
                    address,
                    last: last.timestamp,
                    timestamp: record.timestamp,
                });
            }
        }

        match cutoff {
            Some(cutoff) if record.timestamp < cutoff => {
                warn!("record {} of sensor {} is past the history window", record.timestamp, address);
            }
            _ => sensor.records.push(record),
        }

        if let Some(cutoff) = cutoff {
            sensor.prune_before(cutoff);
        }
        Ok(())
    }

    /// Identity of every sensor, for the registry file
    pub fn entries(&self) -> Vec<SensorEntry> {
        self.sensors
            .values()
            .map(|s| SensorEntry {
                address: s.address,
                name: s.name.clone(),
            })
            .collect()
    }

    fn cutoff(&self, now: Timestamp) -> Option<u32> {
        let history = self.history?;
        let now_secs = now / 1000;
        Some(now_secs.saturating_sub(history.as_secs()).min(u64::from(u32::MAX)) as u32)
    }
}
