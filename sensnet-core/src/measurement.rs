//! Measurements and their fixed-point form
//!
//! A measurement leaves the sensor driver as three floats and is quantized
//! once, as soon as it enters storage or goes on the air. Both the group
//! seed and the MEASUREMENT packet use the same quantization:
//!
//! | field       | stored as | scale               | range            |
//! |-------------|-----------|---------------------|------------------|
//! | vcc         | `u8`      | `(v - 2.0) * 100`   | 2.00 V .. 4.55 V |
//! | humidity    | `u8`      | `h * 2.55`          | 0 % .. 100 %     |
//! | temperature | `i16`     | `t * 100`           | ±327.67 °C       |
//!
//! Values are rounded to the nearest step and clamped to the range; NaN
//! becomes 0. Dequantizing a quantized value and quantizing it again gives
//! the same integers, which is what the delta codec relies on.

use crate::constants::storage::{HUMIDITY_SCALE, TEMPERATURE_SCALE, VCC_BIAS, VCC_SCALE};

/// One sample of the climate sensor
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    /// Degrees Celsius
    pub temperature: f32,
    /// Relative humidity in percent
    pub humidity: f32,
    /// Supply voltage in volts
    pub vcc: f32,
}

impl Measurement {
    pub const fn new(temperature: f32, humidity: f32, vcc: f32) -> Self {
        Self {
            temperature,
            humidity,
            vcc,
        }
    }

    /// Fixed-point form of this measurement
    pub fn quantize(&self) -> Quantized {
        Quantized {
            temperature: quantize_temperature(self.temperature),
            humidity: quantize_humidity(self.humidity),
            vcc: quantize_vcc(self.vcc),
        }
    }
}

/// Fixed-point measurement, exactly what storage and the wire carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Quantized {
    pub temperature: i16,
    pub humidity: u8,
    pub vcc: u8,
}

impl Quantized {
    pub fn to_measurement(self) -> Measurement {
        Measurement {
            temperature: dequantize_temperature(self.temperature),
            humidity: dequantize_humidity(self.humidity),
            vcc: dequantize_vcc(self.vcc),
        }
    }
}

impl From<Quantized> for Measurement {
    fn from(q: Quantized) -> Self {
        q.to_measurement()
    }
}

fn round_clamped(value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() {
        return 0.0f32.clamp(min, max);
    }
    libm::roundf(value).clamp(min, max)
}

pub fn quantize_vcc(vcc: f32) -> u8 {
    round_clamped((vcc - VCC_BIAS) * VCC_SCALE, 0.0, 255.0) as u8
}

pub fn dequantize_vcc(q: u8) -> f32 {
    f32::from(q) / VCC_SCALE + VCC_BIAS
}

pub fn quantize_humidity(humidity: f32) -> u8 {
    round_clamped(humidity * HUMIDITY_SCALE, 0.0, 255.0) as u8
}

pub fn dequantize_humidity(q: u8) -> f32 {
    f32::from(q) / HUMIDITY_SCALE
}

pub fn quantize_temperature(temperature: f32) -> i16 {
    round_clamped(
        temperature * TEMPERATURE_SCALE,
        f32::from(i16::MIN),
        f32::from(i16::MAX),
    ) as i16
}

pub fn dequantize_temperature(q: i16) -> f32 {
    f32::from(q) / TEMPERATURE_SCALE
}
