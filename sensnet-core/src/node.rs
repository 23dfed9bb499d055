//! Sensor-side protocol driver
//!
//! `SensorNode` ties the pieces a sensor runs together: samples arrive from
//! the interrupt queue, are buffered in [`CompactStorage`] and leave as
//! MEASUREMENT frames when the node's slot comes around.
//!
//! ```text
//! ISR ──→ SpscQueue ──→ collect_pending ──→ CompactStorage ──→ drain ──→ Radio
//! ```
//!
//! Storage keeps values only, no per-record time. The node remembers when
//! the oldest buffered record was taken and derives the rest from the
//! measurement period, so a record sent in position `k` is stamped
//! `oldest + k * period`. Evictions move the oldest timestamp forward by the
//! number of records lost.

use thiserror_no_std::Error;

use crate::constants::radio::PAIR_ADDRESS;
use crate::constants::storage::GROUP_COUNT;
use crate::constants::time::{DEFAULT_MEASUREMENT_PERIOD_S, PAIR_RESPONSE_TIMEOUT_MS};
use crate::errors::DecodeError;
use crate::measurement::Measurement;
use crate::queue::Consumer;
use crate::storage::CompactStorage;
use crate::time::Timestamp;
use crate::traits::{Radio, SampleSource};
use crate::wire::{decode_frame, Frame, MeasurementPacket, Packet, PacketType, PairResponse};

/// Failures of the sensor-side handshake
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeError {
    /// The radio driver refused the frame
    #[error("Radio send failed")]
    SendFailed,

    /// Nothing arrived before the timeout
    #[error("No response from base station")]
    NoResponse,

    /// A frame arrived but was malformed
    #[error("Malformed response: {0}")]
    Decode(DecodeError),

    /// A well-formed frame of the wrong kind, or for someone else
    #[error("Unexpected packet {0:?}")]
    Unexpected(PacketType),
}

impl From<DecodeError> for NodeError {
    fn from(err: DecodeError) -> Self {
        Self::Decode(err)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for NodeError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::SendFailed => defmt::write!(fmt, "Radio send failed"),
            Self::NoResponse => defmt::write!(fmt, "No response"),
            Self::Decode(err) => defmt::write!(fmt, "Malformed response: {}", err),
            Self::Unexpected(kind) => defmt::write!(fmt, "Unexpected packet {}", kind),
        }
    }
}

/// One battery sensor
pub struct SensorNode<R: Radio, const N: usize = GROUP_COUNT> {
    radio: R,
    storage: CompactStorage<N>,
    address: Option<u32>,
    /// Server unix seconds minus local unix seconds
    clock_offset_secs: i64,
    measurement_period_secs: u32,
    pair_timeout_ms: Timestamp,
    /// Unix seconds of the oldest buffered record
    oldest_timestamp: Option<u32>,
    next_index: u8,
}

impl<R: Radio, const N: usize> SensorNode<R, N> {
    pub fn new(radio: R) -> Self {
        Self {
            radio,
            storage: CompactStorage::new(),
            address: None,
            clock_offset_secs: 0,
            measurement_period_secs: DEFAULT_MEASUREMENT_PERIOD_S as u32,
            pair_timeout_ms: PAIR_RESPONSE_TIMEOUT_MS,
            oldest_timestamp: None,
            next_index: 0,
        }
    }

    pub fn with_measurement_period(mut self, secs: u32) -> Self {
        self.measurement_period_secs = secs.max(1);
        self
    }

    /// How long `pair` waits for the PAIR_RESPONSE
    pub fn with_pair_timeout(mut self, timeout_ms: Timestamp) -> Self {
        self.pair_timeout_ms = timeout_ms;
        self
    }

    /// Ask the base station for an address
    ///
    /// Sends PAIR_REQUEST from the pairing address and waits for the answer
    /// (2 s unless changed with [`with_pair_timeout`](Self::with_pair_timeout)). On success the node adopts the new
    /// address and the server's clock.
    pub fn pair(&mut self, local_now_secs: u32) -> Result<PairResponse, NodeError> {
        let request = Frame::new(PAIR_ADDRESS, Packet::PairRequest).encode();
        if !self.radio.send(&request) {
            return Err(NodeError::SendFailed);
        }

        let bytes = self.radio.receive(self.pair_timeout_ms).ok_or(NodeError::NoResponse)?;
        let frame = decode_frame(&bytes)?;

        match frame.packet {
            Packet::PairResponse(response) if frame.address == PAIR_ADDRESS => {
                self.address = Some(response.address);
                self.clock_offset_secs = response.server_timestamp - i64::from(local_now_secs);
                log_debug!("paired as {}", response.address);
                Ok(response)
            }
            other => Err(NodeError::Unexpected(other.packet_type())),
        }
    }

    /// Local unix seconds translated to server time
    pub fn server_time(&self, local_secs: u32) -> u32 {
        (i64::from(local_secs) + self.clock_offset_secs).clamp(0, i64::from(u32::MAX)) as u32
    }

    /// Buffer one sample taken at `timestamp` (server unix seconds)
    pub fn record(&mut self, measurement: Measurement, timestamp: u32) {
        let before = self.storage.get_data_count();
        if !self.storage.push(measurement) {
            return;
        }
        let after = self.storage.get_data_count();

        match self.oldest_timestamp {
            Some(oldest) if before > 0 => {
                let evicted = (before + 1 - after) as u32;
                if evicted > 0 {
                    let shifted = oldest.saturating_add(evicted.saturating_mul(self.measurement_period_secs));
                    self.oldest_timestamp = Some(shifted);
                }
            }
            _ => self.oldest_timestamp = Some(timestamp),
        }
    }

    /// Take one sample from `source` and buffer it
    ///
    /// Returns false when the driver had nothing to give.
    pub fn measure<S: SampleSource + ?Sized>(&mut self, source: &mut S, timestamp: u32) -> bool {
        match source.sample() {
            Some(measurement) => {
                self.record(measurement, timestamp);
                true
            }
            None => {
                log_warn!("sensor read failed at {}", timestamp);
                false
            }
        }
    }

    /// Move everything the interrupt handler queued into storage
    ///
    /// Samples are stamped `first_timestamp`, `first_timestamp + period`, ...
    /// in queue order. Returns the number moved.
    pub fn collect_pending<const Q: usize>(
        &mut self,
        consumer: &mut Consumer<'_, Measurement, Q>,
        first_timestamp: u32,
    ) -> usize {
        let mut moved = 0u32;
        while let Some(measurement) = consumer.pop() {
            let timestamp = first_timestamp.saturating_add(moved.saturating_mul(self.measurement_period_secs));
            self.record(measurement, timestamp);
            moved += 1;
        }
        moved as usize
    }

    /// Send buffered records, oldest first
    ///
    /// A record is dropped from storage only after the radio accepted it;
    /// the first failure ends the burst and keeps the rest for the next slot.
    /// Returns the number of records sent.
    pub fn drain(&mut self) -> usize {
        let Some(address) = self.address else {
            log_warn!("drain before pairing, {} records kept", self.storage.get_data_count());
            return 0;
        };

        let mut sent = 0;
        while let (Some(value), Some(timestamp)) =
            (self.storage.iter_quantized().next(), self.oldest_timestamp)
        {
            let packet = MeasurementPacket::new(self.next_index, timestamp, value);
            let frame = Frame::new(address, Packet::Measurement(packet)).encode();
            if !self.radio.send(&frame) {
                log_warn!("send failed, {} records kept", self.storage.get_data_count());
                break;
            }

            self.storage.pop_front();
            self.next_index = self.next_index.wrapping_add(1);
            self.oldest_timestamp = Some(timestamp.saturating_add(self.measurement_period_secs));
            sent += 1;
        }

        if self.storage.is_empty() {
            self.oldest_timestamp = None;
        }
        sent
    }

    pub fn address(&self) -> Option<u32> {
        self.address
    }

    pub fn is_paired(&self) -> bool {
        self.address.is_some()
    }

    pub fn storage(&self) -> &CompactStorage<N> {
        &self.storage
    }

    pub fn oldest_timestamp(&self) -> Option<u32> {
        self.oldest_timestamp
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }
}
