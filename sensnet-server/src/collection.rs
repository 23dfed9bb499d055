//! Measurement collection loop
//!
//! The base station spends its life here: wait for one frame (bounded by
//! the receive timeout), dispatch it, repeat.
//!
//! ```text
//! receive ─┬─ nothing ───────────────→ Idle
//!          ├─ malformed ─────────────→ Discarded (logged)
//!          ├─ PAIR_REQUEST ─→ pair ──→ PAIR_RESPONSE sent, Paired
//!          ├─ MEASUREMENT ──→ store ─→ Stored / Discarded
//!          └─ anything else ─────────→ Discarded
//! ```
//!
//! Nothing a sensor sends can stop the loop. Every outcome is counted in
//! [`CollectionStats`].

use std::path::PathBuf;

use log::{debug, error, info, warn};
use sensnet_core::errors::DecodeError;
use sensnet_core::time::{TimeSource, Timestamp};
use sensnet_core::wire::{decode_frame, Frame, Packet, PacketType, PairResponse};
use sensnet_core::Radio;

use crate::network::Network;
use crate::pairing::{PairingError, PairingGrant};
use crate::registry::Record;
use crate::ServerError;

/// Why a received frame was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    Malformed(DecodeError),
    /// A well-formed packet the base station never expects to receive
    Unexpected(PacketType),
    UnknownSensor(u32),
    /// Older than the sensor's last stored record
    Stale { address: u32, last: u32, timestamp: u32 },
    PairingRefused(PairingError),
    /// Refused by the network for any other reason
    Rejected(String),
}

/// Result of one loop iteration
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Receive timed out
    Idle,
    Paired(PairingGrant),
    Stored { address: u32, record: Record },
    Discarded(DiscardReason),
}

/// Loop counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectionStats {
    /// Frames handed over by the radio
    pub received: u64,
    pub paired: u64,
    pub pairing_failed: u64,
    /// Measurements stored
    pub measurements: u64,
    /// Frames dropped for any reason, refused pairings included
    pub discarded: u64,
    /// PAIR_RESPONSE frames the radio refused to send
    pub send_failures: u64,
}

/// Receive loop of the base station
pub struct CollectionLoop<R: Radio, C: TimeSource> {
    radio: R,
    clock: C,
    network: Network,
    receive_timeout_ms: Timestamp,
    registry_path: Option<PathBuf>,
    stats: CollectionStats,
}

impl<R: Radio, C: TimeSource> CollectionLoop<R, C> {
    pub fn new(radio: R, clock: C, network: Network, receive_timeout_ms: Timestamp) -> Self {
        Self {
            radio,
            clock,
            network,
            receive_timeout_ms,
            registry_path: None,
            stats: CollectionStats::default(),
        }
    }

    /// Rewrite the registry file after every successful pairing
    pub fn with_registry_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry_path = Some(path.into());
        self
    }

    /// Receive at most one frame and dispatch it
    pub fn poll_once(&mut self) -> PollOutcome {
        let Some(bytes) = self.radio.receive(self.receive_timeout_ms) else {
            return PollOutcome::Idle;
        };
        self.stats.received += 1;

        let outcome = self.dispatch(&bytes);
        match &outcome {
            PollOutcome::Idle => {}
            PollOutcome::Paired(_) => self.stats.paired += 1,
            PollOutcome::Stored { .. } => self.stats.measurements += 1,
            PollOutcome::Discarded(reason) => {
                if matches!(reason, DiscardReason::PairingRefused(_)) {
                    self.stats.pairing_failed += 1;
                }
                self.stats.discarded += 1;
            }
        }
        outcome
    }

    /// Poll until `should_stop` returns true
    ///
    /// The callback runs before every iteration and can reach the network
    /// (to apply operator commands, for example).
    pub fn run<F>(&mut self, mut should_stop: F)
    where
        F: FnMut(&mut Network, Timestamp) -> bool,
    {
        info!("collection loop started");
        loop {
            let now = self.clock.now();
            if should_stop(&mut self.network, now) {
                break;
            }
            self.poll_once();
        }
        info!("collection loop stopped: {:?}", self.stats);
    }

    fn dispatch(&mut self, bytes: &[u8]) -> PollOutcome {
        let frame = match decode_frame(bytes) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("discarding frame of {} bytes: {}", bytes.len(), err);
                return PollOutcome::Discarded(DiscardReason::Malformed(err));
            }
        };

        match frame.packet {
            Packet::PairRequest => self.handle_pair_request(frame.address),
            Packet::Measurement(packet) => {
                let record = Record {
                    timestamp: packet.timestamp,
                    index: packet.index,
                    measurement: packet.measurement(),
                };
                self.handle_measurement(frame.address, record)
            }
            Packet::PairResponse(_) => {
                warn!("unexpected PAIR_RESPONSE from {}", frame.address);
                PollOutcome::Discarded(DiscardReason::Unexpected(PacketType::PairResponse))
            }
        }
    }

    fn handle_pair_request(&mut self, requester: u32) -> PollOutcome {
        let now = self.clock.now();
        let grant = match self.network.pair(now) {
            Ok(grant) => grant,
            Err(err) => {
                warn!("pairing request from {} refused: {}", requester, err);
                return PollOutcome::Discarded(DiscardReason::PairingRefused(err));
            }
        };

        let reply = Frame::new(
            requester,
            Packet::PairResponse(PairResponse {
                address: grant.address,
                server_timestamp: grant.server_timestamp,
            }),
        );
        if !self.radio.send(&reply.encode()) {
            error!("failed to send PAIR_RESPONSE to {}", requester);
            self.stats.send_failures += 1;
        } else {
            info!(
                "pair requested, replying with address {} and timestamp {}",
                grant.address, grant.server_timestamp
            );
        }

        if let Some(path) = &self.registry_path {
            if let Err(err) = self.network.save_registry(path) {
                error!("cannot save registry to {}: {}", path.display(), err);
            }
        }

        PollOutcome::Paired(grant)
    }

    fn handle_measurement(&mut self, address: u32, record: Record) -> PollOutcome {
        let now = self.clock.now();
        match self.network.record(address, record, now) {
            Ok(()) => {
                debug!(
                    "{}: #{} t={} T={:.2} H={:.1} V={:.2}",
                    address,
                    record.index,
                    record.timestamp,
                    record.measurement.temperature,
                    record.measurement.humidity,
                    record.measurement.vcc
                );
                PollOutcome::Stored { address, record }
            }
            Err(ServerError::UnknownSensor(address)) => {
                warn!("measurement from unknown sensor {}", address);
                PollOutcome::Discarded(DiscardReason::UnknownSensor(address))
            }
            Err(ServerError::StaleRecord {
                address,
                last,
                timestamp,
            }) => {
                warn!(
                    "measurement from the past for sensor {}: last {}, new {}",
                    address, last, timestamp
                );
                PollOutcome::Discarded(DiscardReason::Stale {
                    address,
                    last,
                    timestamp,
                })
            }
            Err(err) => {
                warn!("measurement from {} dropped: {}", address, err);
                PollOutcome::Discarded(DiscardReason::Rejected(err.to_string()))
            }
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    pub fn stats(&self) -> &CollectionStats {
        &self.stats
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
