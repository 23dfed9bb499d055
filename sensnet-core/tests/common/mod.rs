//! Shared helpers for the sensnet-core integration tests
//!
//! - Deterministic xorshift RNG
//! - Climate series generators (slow drift, spikes)
//! - Tolerance checks matching the quantization steps

#![allow(dead_code)]

use sensnet_core::Measurement;

/// Half a quantization step per field, plus float slack
pub const TEMPERATURE_TOLERANCE: f32 = 0.005 + 1e-3;
pub const HUMIDITY_TOLERANCE: f32 = 0.5 / 2.55 + 1e-3;
pub const VCC_TOLERANCE: f32 = 0.005 + 1e-3;

/// Deterministic random numbers for reproducible series
pub struct TestRng {
    state: u32,
}

impl TestRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u32(&mut self) -> u32 {
        // Xorshift algorithm
        self.state ^= self.state << 13;
        self.state ^= self.state >> 17;
        self.state ^= self.state << 5;
        self.state
    }

    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / 16777216.0
    }

    pub fn gen_range(&mut self, min: f32, max: f32) -> f32 {
        min + self.next_f32() * (max - min)
    }
}

/// Indoor climate drifting slowly, the common case on a real deployment
pub fn indoor_series(seed: u32, len: usize) -> Vec<Measurement> {
    let mut rng = TestRng::new(seed);
    let mut temperature = 21.0;
    let mut humidity = 45.0;
    let mut vcc = 3.3;

    (0..len)
        .map(|_| {
            temperature += rng.gen_range(-0.05, 0.05);
            humidity = (humidity + rng.gen_range(-0.5, 0.5)).clamp(0.0, 100.0);
            if rng.next_u32() % 50 == 0 {
                vcc -= 0.01;
            }
            Measurement::new(temperature, humidity, vcc)
        })
        .collect()
}

/// Values jumping across the whole range, worst case for the delta codec
pub fn chaotic_series(seed: u32, len: usize) -> Vec<Measurement> {
    let mut rng = TestRng::new(seed);
    (0..len)
        .map(|_| {
            Measurement::new(
                rng.gen_range(-40.0, 85.0),
                rng.gen_range(0.0, 100.0),
                rng.gen_range(2.0, 4.5),
            )
        })
        .collect()
}

pub fn assert_close(expected: &Measurement, actual: &Measurement) {
    assert!(
        (expected.temperature - actual.temperature).abs() <= TEMPERATURE_TOLERANCE,
        "temperature {} vs {}",
        expected.temperature,
        actual.temperature
    );
    assert!(
        (expected.humidity - actual.humidity).abs() <= HUMIDITY_TOLERANCE,
        "humidity {} vs {}",
        expected.humidity,
        actual.humidity
    );
    assert!(
        (expected.vcc - actual.vcc).abs() <= VCC_TOLERANCE,
        "vcc {} vs {}",
        expected.vcc,
        actual.vcc
    );
}
