//! Radios for driving the base station without hardware

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sensnet_core::time::Timestamp;
use sensnet_core::traits::RxBuf;
use sensnet_core::Radio;

/// Scripted radio: frames are queued by hand, sent frames are recorded
#[derive(Debug, Default)]
pub struct MockRadio {
    pub inbox: VecDeque<RxBuf>,
    pub sent: Vec<Vec<u8>>,
    pub fail_sends: bool,
}

impl MockRadio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliver(&mut self, frame: &[u8]) {
        self.inbox.push_back(RxBuf::from_slice(frame).unwrap());
    }
}

impl Radio for MockRadio {
    fn send(&mut self, frame: &[u8]) -> bool {
        if self.fail_sends {
            return false;
        }
        self.sent.push(frame.to_vec());
        true
    }

    fn receive(&mut self, _timeout_ms: Timestamp) -> Option<RxBuf> {
        self.inbox.pop_front()
    }
}

/// Base station end of a simulated channel
pub struct BaseRadio {
    tx: Sender<RxBuf>,
    rx: Receiver<RxBuf>,
}

/// Sensor end of a simulated channel; clones share the air
#[derive(Clone)]
pub struct SensorRadio {
    tx: Sender<RxBuf>,
    rx: Arc<Mutex<Receiver<RxBuf>>>,
}

/// One shared channel between a base station and any number of sensors
pub fn air() -> (BaseRadio, SensorRadio) {
    let (uplink_tx, uplink_rx) = mpsc::channel();
    let (downlink_tx, downlink_rx) = mpsc::channel();
    (
        BaseRadio {
            tx: downlink_tx,
            rx: uplink_rx,
        },
        SensorRadio {
            tx: uplink_tx,
            rx: Arc::new(Mutex::new(downlink_rx)),
        },
    )
}

impl Radio for BaseRadio {
    fn send(&mut self, frame: &[u8]) -> bool {
        self.tx.send(RxBuf::from_slice(frame).unwrap()).is_ok()
    }

    fn receive(&mut self, timeout_ms: Timestamp) -> Option<RxBuf> {
        self.rx.recv_timeout(Duration::from_millis(timeout_ms)).ok()
    }
}

impl Radio for SensorRadio {
    fn send(&mut self, frame: &[u8]) -> bool {
        self.tx.send(RxBuf::from_slice(frame).unwrap()).is_ok()
    }

    fn receive(&mut self, timeout_ms: Timestamp) -> Option<RxBuf> {
        let rx = self.rx.lock().unwrap();
        rx.recv_timeout(Duration::from_millis(timeout_ms)).ok()
    }
}
