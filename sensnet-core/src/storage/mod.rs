//! Compact On-Device Measurement Storage
//!
//! ## Overview
//!
//! A sensor that cannot reach the base station keeps measuring. The backlog
//! lives in a fixed ring of [`Group`]s, each a 37-byte block holding an
//! absolute seed record and as many delta records as fit in its 256-bit
//! payload. Typical indoor data changes by a few hundredths of a degree
//! between samples, so most records take 12 bits and one group holds around
//! twenty of them.
//!
//! ```text
//!             first_group_idx           newest group
//!                   ↓                        ↓
//! ┌───────┬───────┬───────┬───────┬───────┬───────┬───────┐
//! │ empty │ empty │ G0    │ G1    │ G2    │ G3    │ empty │
//! └───────┴───────┴───────┴───────┴───────┴───────┴───────┘
//!                   └ skip: records of G0 already popped
//! ```
//!
//! ## Policy
//!
//! - Pushes always succeed (for `N > 0`). When the newest group has no room
//!   for the next record a new group is started; when all `N` groups are in
//!   use the oldest one is evicted first. New data wins over old data.
//! - Pops and iteration are strictly FIFO.
//! - Memory use is `N * 37` bytes plus a few counters, regardless of how
//!   many measurements go through.
//!
//! ## Example
//!
//! ```rust
//! use sensnet_core::measurement::Measurement;
//! use sensnet_core::storage::CompactStorage;
//!
//! let mut storage: CompactStorage = CompactStorage::new();
//! storage.push(Measurement::new(21.5, 40.0, 3.3));
//! storage.push(Measurement::new(21.6, 40.0, 3.3));
//!
//! assert_eq!(storage.get_data_count(), 2);
//! let oldest = storage.front().unwrap();
//! assert!((oldest.temperature - 21.5).abs() < 0.01);
//!
//! assert!(storage.pop_front());
//! assert_eq!(storage.get_data_count(), 1);
//! ```

mod codec;
mod group;

pub use group::{pack_header, unpack_header, Group, GroupRecords};

use crate::constants::storage::{GROUP_COUNT, GROUP_SIZE};
use crate::measurement::{Measurement, Quantized};

/// Ring of delta-encoded groups
#[derive(Debug, Clone)]
pub struct CompactStorage<const N: usize = GROUP_COUNT> {
    groups: [Group; N],
    first_group_idx: usize,
    group_count: usize,
    /// Records of the oldest group already popped
    first_group_skip_count: usize,
    data_count: usize,
    /// Last pushed value, base for the next delta
    last: Quantized,
}

impl<const N: usize> Default for CompactStorage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> CompactStorage<N> {
    pub const fn new() -> Self {
        Self {
            groups: [Group::EMPTY; N],
            first_group_idx: 0,
            group_count: 0,
            first_group_skip_count: 0,
            data_count: 0,
            last: Quantized {
                temperature: 0,
                humidity: 0,
                vcc: 0,
            },
        }
    }

    /// Store a measurement, evicting the oldest group if needed
    ///
    /// Returns false only for a zero-capacity storage.
    pub fn push(&mut self, measurement: Measurement) -> bool {
        if N == 0 {
            return false;
        }

        let next = measurement.quantize();

        if self.group_count > 0 {
            let newest = self.physical(self.group_count - 1);
            if self.groups[newest].try_append(self.last, next) {
                self.last = next;
                self.data_count += 1;
                return true;
            }
        }

        if self.group_count == N {
            self.evict_oldest();
        }

        let slot = self.physical(self.group_count);
        self.groups[slot] = Group::seeded(next);
        self.group_count += 1;
        self.last = next;
        self.data_count += 1;
        true
    }

    /// Drop the oldest record
    ///
    /// Returns false when there is nothing to drop.
    pub fn pop_front(&mut self) -> bool {
        if self.data_count == 0 {
            return false;
        }

        self.first_group_skip_count += 1;
        self.data_count -= 1;

        let records = self.groups[self.first_group_idx].record_count();
        if self.first_group_skip_count >= records {
            self.release_oldest();
        }
        true
    }

    /// Oldest record, if any
    pub fn front(&self) -> Option<Measurement> {
        self.iter().next()
    }

    /// Records in insertion order, oldest first
    pub fn iter(&self) -> StorageIter<'_, N> {
        StorageIter {
            inner: self.iter_quantized(),
        }
    }

    /// Same as [`iter`](Self::iter) but yields the stored fixed-point values
    pub fn iter_quantized(&self) -> QuantizedIter<'_, N> {
        let mut records = if self.group_count > 0 {
            Some(self.groups[self.first_group_idx].records())
        } else {
            None
        };
        if let Some(records) = records.as_mut() {
            for _ in 0..self.first_group_skip_count {
                records.next();
            }
        }

        QuantizedIter {
            storage: self,
            group: 0,
            records,
            remaining: self.data_count,
        }
    }

    /// Records currently stored
    pub fn get_data_count(&self) -> usize {
        self.data_count
    }

    /// Groups currently in use
    pub fn get_group_count(&self) -> usize {
        self.group_count
    }

    pub fn is_empty(&self) -> bool {
        self.data_count == 0
    }

    /// Maximum number of groups
    pub const fn capacity_groups(&self) -> usize {
        N
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.groups = [Group::EMPTY; N];
        self.first_group_idx = 0;
        self.group_count = 0;
        self.first_group_skip_count = 0;
        self.data_count = 0;
        self.last = Quantized::default();
    }

    /// Group at `index` counted from the oldest
    pub fn group(&self, index: usize) -> Option<&Group> {
        if index < self.group_count {
            Some(&self.groups[self.physical(index)])
        } else {
            None
        }
    }

    /// Packed image of the group at `index` counted from the oldest
    pub fn group_bytes(&self, index: usize) -> Option<[u8; GROUP_SIZE]> {
        self.group(index).map(Group::to_bytes)
    }

    fn physical(&self, logical: usize) -> usize {
        (self.first_group_idx + logical) % N
    }

    fn evict_oldest(&mut self) {
        let records = self.groups[self.first_group_idx].record_count();
        let lost = records.saturating_sub(self.first_group_skip_count);
        self.data_count -= lost;
        log_debug!("storage full, evicting group with {} records", lost);
        self.release_oldest();
    }

    fn release_oldest(&mut self) {
        self.groups[self.first_group_idx] = Group::EMPTY;
        self.first_group_idx = (self.first_group_idx + 1) % N;
        self.group_count -= 1;
        self.first_group_skip_count = 0;
    }
}

/// Lazy FIFO iterator over the fixed-point records of a storage
#[derive(Debug, Clone)]
pub struct QuantizedIter<'a, const N: usize> {
    storage: &'a CompactStorage<N>,
    group: usize,
    records: Option<GroupRecords<'a>>,
    remaining: usize,
}

impl<const N: usize> Iterator for QuantizedIter<'_, N> {
    type Item = Quantized;

    fn next(&mut self) -> Option<Quantized> {
        loop {
            if let Some(q) = self.records.as_mut().and_then(Iterator::next) {
                self.remaining = self.remaining.saturating_sub(1);
                return Some(q);
            }

            self.group += 1;
            match self.storage.group(self.group) {
                Some(group) => self.records = Some(group.records()),
                None => {
                    self.records = None;
                    self.remaining = 0;
                    return None;
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<const N: usize> core::iter::FusedIterator for QuantizedIter<'_, N> {}

impl<const N: usize> ExactSizeIterator for QuantizedIter<'_, N> {}

/// Lazy FIFO iterator over the measurements of a storage
#[derive(Debug, Clone)]
pub struct StorageIter<'a, const N: usize> {
    inner: QuantizedIter<'a, N>,
}

impl<const N: usize> Iterator for StorageIter<'_, N> {
    type Item = Measurement;

    fn next(&mut self) -> Option<Measurement> {
        self.inner.next().map(Quantized::to_measurement)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<const N: usize> core::iter::FusedIterator for StorageIter<'_, N> {}

impl<const N: usize> ExactSizeIterator for StorageIter<'_, N> {}

impl<'a, const N: usize> IntoIterator for &'a CompactStorage<N> {
    type Item = Measurement;
    type IntoIter = StorageIter<'a, N>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
