//! Time-Related Constants
//!
//! Time conversions plus the defaults and lower bounds of the three periods
//! that drive the network: how often sensors measure, how often every
//! sensor gets to talk, and how long one sensor may occupy the channel.

// ===== TIME UNIT CONVERSIONS =====

/// Milliseconds per second.
pub const MS_PER_SECOND: u64 = 1000;

/// Seconds per minute.
pub const SECONDS_PER_MINUTE: u64 = 60;

// ===== SCHEDULING DEFAULTS =====

/// Default measurement period (seconds).
///
/// Five minutes is plenty for indoor climate and keeps a battery sensor
/// alive for years.
pub const DEFAULT_MEASUREMENT_PERIOD_S: u64 = 5 * SECONDS_PER_MINUTE;

/// Default comms period (seconds).
///
/// Every paired sensor gets one slot per comms period.
pub const DEFAULT_COMMS_PERIOD_S: u64 = 20 * SECONDS_PER_MINUTE;

/// Default slot duration (seconds).
///
/// Long enough for a sensor to wake up, drain a full backlog with retries
/// and go back to sleep.
pub const DEFAULT_SLOT_DURATION_S: u64 = 10;

// ===== LOWER BOUNDS =====

/// Shortest accepted measurement period (seconds). Shorter values are
/// clamped up.
pub const MIN_MEASUREMENT_PERIOD_S: u64 = 30;

/// Shortest accepted slot duration (seconds). Shorter values are clamped up.
pub const MIN_SLOT_DURATION_S: u64 = 10;

// ===== RADIO TIMING =====

/// Receive timeout of the base station loop (milliseconds).
pub const DEFAULT_RECEIVE_TIMEOUT_MS: u64 = 1000;

/// How long a sensor waits for the PAIR_RESPONSE (milliseconds).
pub const PAIR_RESPONSE_TIMEOUT_MS: u64 = 2000;
