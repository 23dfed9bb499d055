//! Time Slot Scheduler
//!
//! ## Overview
//!
//! All sensors share one half-duplex channel. The comms period is cut into
//! slots of `slot_duration`; every paired sensor owns one slot and only
//! talks during it.
//!
//! ```text
//! comms period (20 min)
//! ├──────┬──────┬──────┬──────┬─────────────────────────┤
//! │ id 0 │ id 1 │ id 2 │ id 3 │ ...           id 119    │
//! └──────┴──────┴──────┴──────┴─────────────────────────┘
//!   10 s   10 s   10 s
//! ```
//!
//! `max_slot_count = comms_period / slot_duration` bounds the number of
//! sensors. Slot ids are reused after removal; addresses are not (that is
//! the pairing coordinator's business).
//!
//! ## Scheduling
//!
//! `schedule(id)` places the slot's next time point right after the latest
//! time point handed out so far: `max(next_time_point) + slot_duration`.
//! Consecutive calls therefore never overlap and strictly increase.
//!
//! ## Limits
//!
//! | setting            | lower bound      |
//! |--------------------|------------------|
//! | measurement period | 30 s             |
//! | slot duration      | 10 s             |
//! | comms period       | slot duration    |
//!
//! Shorter values are clamped up, never rejected.

use std::collections::BTreeMap;
use std::time::Duration;

use log::{debug, warn};
use sensnet_core::constants::{
    DEFAULT_COMMS_PERIOD_S, DEFAULT_MEASUREMENT_PERIOD_S, DEFAULT_SLOT_DURATION_S,
    MIN_MEASUREMENT_PERIOD_S, MIN_SLOT_DURATION_S,
};
use sensnet_core::time::Timestamp;

/// Identifier of a slot inside the comms period
pub type SlotId = u32;

const MIN_MEASUREMENT_PERIOD: Duration = Duration::from_secs(MIN_MEASUREMENT_PERIOD_S);
const MIN_SLOT_DURATION: Duration = Duration::from_secs(MIN_SLOT_DURATION_S);

fn as_ms(duration: Duration) -> Timestamp {
    duration.as_millis() as Timestamp
}

/// Assigns slots and hands out transmission times
#[derive(Debug, Clone)]
pub struct SlotScheduler {
    /// Active slots and their next time point
    slots: BTreeMap<SlotId, Timestamp>,
    measurement_period: Duration,
    comms_period: Duration,
    slot_duration: Duration,
}

impl Default for SlotScheduler {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_MEASUREMENT_PERIOD_S),
            Duration::from_secs(DEFAULT_COMMS_PERIOD_S),
            Duration::from_secs(DEFAULT_SLOT_DURATION_S),
        )
    }
}

impl SlotScheduler {
    /// Scheduler with the given periods, clamped to their lower bounds
    pub fn new(measurement_period: Duration, comms_period: Duration, slot_duration: Duration) -> Self {
        let mut scheduler = Self {
            slots: BTreeMap::new(),
            measurement_period: MIN_MEASUREMENT_PERIOD,
            comms_period: MIN_SLOT_DURATION,
            slot_duration: MIN_SLOT_DURATION,
        };
        scheduler.set_slot_duration(slot_duration);
        scheduler.set_comms_period(comms_period);
        scheduler.set_measurement_period(measurement_period);
        scheduler
    }

    pub fn set_measurement_period(&mut self, period: Duration) {
        if period < MIN_MEASUREMENT_PERIOD {
            debug!("measurement period {:?} clamped to {:?}", period, MIN_MEASUREMENT_PERIOD);
        }
        self.measurement_period = period.max(MIN_MEASUREMENT_PERIOD);
    }

    pub fn get_measurement_period(&self) -> Duration {
        self.measurement_period
    }

    /// Comms period, at least one slot long
    pub fn set_comms_period(&mut self, period: Duration) {
        if period < self.slot_duration {
            debug!("comms period {:?} clamped to {:?}", period, self.slot_duration);
        }
        self.comms_period = period.max(self.slot_duration);
    }

    pub fn get_comms_period(&self) -> Duration {
        self.comms_period
    }

    /// Slot duration; the comms period grows along if it gets shorter
    pub fn set_slot_duration(&mut self, duration: Duration) {
        if duration < MIN_SLOT_DURATION {
            debug!("slot duration {:?} clamped to {:?}", duration, MIN_SLOT_DURATION);
        }
        self.slot_duration = duration.max(MIN_SLOT_DURATION);
        self.comms_period = self.comms_period.max(self.slot_duration);
    }

    pub fn get_slot_duration(&self) -> Duration {
        self.slot_duration
    }

    /// How many slots fit in one comms period
    pub fn get_max_slot_count(&self) -> u32 {
        (self.comms_period.as_millis() / self.slot_duration.as_millis()) as u32
    }

    /// Active slots
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Reserve the lowest free slot id, first due at `now`
    ///
    /// Returns `None` when every slot of the comms period is taken.
    pub fn add_slot(&mut self, now: Timestamp) -> Option<SlotId> {
        let max = self.get_max_slot_count();
        if self.slots.len() >= max as usize {
            warn!("all {} slots taken", max);
            return None;
        }

        let id = (0..max).find(|id| !self.slots.contains_key(id))?;
        self.slots.insert(id, now);
        debug!("slot {} reserved", id);
        Some(id)
    }

    /// Release a slot; unknown ids are ignored
    ///
    /// Returns whether a slot was released.
    pub fn remove_slot(&mut self, id: SlotId) -> bool {
        if self.slots.remove(&id).is_none() {
            warn!("cannot find slot id {}", id);
            return false;
        }
        debug!("slot {} released", id);
        true
    }

    /// Next time point of `id`: right after the latest one handed out
    pub fn schedule(&mut self, id: SlotId) -> Option<Timestamp> {
        if !self.slots.contains_key(&id) {
            warn!("cannot schedule unknown slot id {}", id);
            return None;
        }

        let latest = self.slots.values().copied().max().unwrap_or_default();
        let next = latest + as_ms(self.slot_duration);
        self.slots.insert(id, next);
        Some(next)
    }

    /// Time point last assigned to `id`
    pub fn next_time_point(&self, id: SlotId) -> Option<Timestamp> {
        self.slots.get(&id).copied()
    }

    /// Position of the slot inside the comms period
    pub fn slot_offset(&self, id: SlotId) -> Duration {
        self.slot_duration * id
    }

    /// First instant after `now` on the measurement period grid
    ///
    /// All sensors measure on the same grid so their records line up.
    pub fn next_measurement_time(&self, now: Timestamp) -> Timestamp {
        let period = as_ms(self.measurement_period);
        (now / period + 1) * period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn default_capacity() {
        let scheduler = SlotScheduler::default();
        assert_eq!(scheduler.get_max_slot_count(), 120);
    }

    #[test]
    fn clamps_to_lower_bounds() {
        let scheduler = SlotScheduler::new(secs(1), secs(1), secs(1));
        assert_eq!(scheduler.get_measurement_period(), secs(30));
        assert_eq!(scheduler.get_slot_duration(), secs(10));
        assert_eq!(scheduler.get_comms_period(), secs(10));
        assert_eq!(scheduler.get_max_slot_count(), 1);
    }

    #[test]
    fn longer_slot_stretches_comms_period() {
        let mut scheduler = SlotScheduler::new(secs(60), secs(30), secs(10));
        scheduler.set_slot_duration(secs(45));
        assert_eq!(scheduler.get_comms_period(), secs(45));
    }

    #[test]
    fn lowest_free_id_is_reused() {
        let mut scheduler = SlotScheduler::new(secs(60), secs(40), secs(10));
        assert_eq!(scheduler.add_slot(0), Some(0));
        assert_eq!(scheduler.add_slot(0), Some(1));
        assert_eq!(scheduler.add_slot(0), Some(2));
        assert!(scheduler.remove_slot(1));
        assert_eq!(scheduler.add_slot(0), Some(1));
        assert_eq!(scheduler.add_slot(0), Some(3));
        assert_eq!(scheduler.add_slot(0), None);
    }

    #[test]
    fn removing_unknown_slot_is_noop() {
        let mut scheduler = SlotScheduler::default();
        scheduler.add_slot(0);
        assert!(!scheduler.remove_slot(7));
        assert_eq!(scheduler.slot_count(), 1);
    }

    #[test]
    fn schedule_strictly_increases() {
        let mut scheduler = SlotScheduler::default();
        let a = scheduler.add_slot(1_000).unwrap();
        let b = scheduler.add_slot(1_000).unwrap();

        let first = scheduler.schedule(a).unwrap();
        let second = scheduler.schedule(b).unwrap();
        let third = scheduler.schedule(a).unwrap();
        assert_eq!(first, 11_000);
        assert_eq!(second, 21_000);
        assert_eq!(third, 31_000);
        assert_eq!(scheduler.schedule(99), None);
    }

    #[test]
    fn offsets_and_measurement_grid() {
        let scheduler = SlotScheduler::default();
        assert_eq!(scheduler.slot_offset(3), secs(30));
        assert_eq!(scheduler.next_measurement_time(0), 300_000);
        assert_eq!(scheduler.next_measurement_time(299_999), 300_000);
        assert_eq!(scheduler.next_measurement_time(300_000), 600_000);
    }
}
