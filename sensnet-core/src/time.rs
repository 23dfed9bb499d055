//! Time management for sensors and the base station
//!
//! Provides clock abstraction to handle different time sources:
//! - System clock (hosted builds)
//! - Fixed time (tests, or a sensor before it learned the server time)
//! - A shareable mock clock that tests advance by hand
//!
//! Sensors have no RTC worth trusting. At pairing they receive the server's
//! clock once and keep an offset from their own counter, see
//! [`SensorNode::server_time`](crate::node::SensorNode::server_time).

/// Timestamp in milliseconds since the unix epoch (or device boot)
pub type Timestamp = u64;

/// Source of time for the system
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Current time in whole unix seconds, as carried by the radio frames
    fn now_secs(&self) -> u32 {
        (self.now() / crate::constants::MS_PER_SECOND) as u32
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// System time source (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTime;

#[cfg(feature = "std")]
impl TimeSource for SystemTime {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime as StdSystemTime, UNIX_EPOCH};

        StdSystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// Fixed time source for testing
#[derive(Debug, Clone)]
pub struct FixedTime {
    timestamp: Timestamp,
}

impl FixedTime {
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    pub fn advance(&mut self, ms: u64) {
        self.timestamp += ms;
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp
    }
}

/// Clock shared between a test and the code under test
///
/// Clones observe the same time.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Default)]
pub struct MockTimeSource {
    now: std::sync::Arc<core::sync::atomic::AtomicU64>,
}

#[cfg(feature = "std")]
impl MockTimeSource {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: std::sync::Arc::new(core::sync::atomic::AtomicU64::new(start)),
        }
    }

    pub fn set(&self, timestamp: Timestamp) {
        self.now.store(timestamp, core::sync::atomic::Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, core::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(feature = "std")]
impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        self.now.load(core::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_time_advances() {
        let mut time = FixedTime::new(1000);
        assert_eq!(time.now(), 1000);

        time.advance(500);
        assert_eq!(time.now(), 1500);
        assert_eq!(time.now_secs(), 1);
    }

    #[cfg(feature = "std")]
    #[test]
    fn mock_clones_share_time() {
        let clock = MockTimeSource::new(10);
        let observer = clock.clone();
        clock.advance(90);
        assert_eq!(observer.now(), 100);
    }
}
