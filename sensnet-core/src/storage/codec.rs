//! Delta record encoding inside a group payload
//!
//! Every record after the seed is stored relative to the previous record's
//! quantized values. A record starts with four tag bits that choose the
//! width of each field, followed by the fields themselves:
//!
//! ```text
//! ┌──────────┬───────┬───────┬─────────────┬──────────┬─────────┐
//! │ t tag 2b │ h 1b  │ v 1b  │ temperature │ humidity │ vcc     │
//! └──────────┴───────┴───────┴─────────────┴──────────┴─────────┘
//!
//! t tag: 0 = 4-bit delta, 1 = 8-bit delta, 2 = 12-bit delta, 3 = 16-bit absolute
//! h tag: 0 = 4-bit delta, 1 = 8-bit absolute
//! v tag: 0 = unchanged,   1 = 8-bit absolute
//! ```
//!
//! Deltas are two's complement. The narrowest tag that holds the value
//! exactly is picked, so decoding always reproduces the quantized input.
//! All field widths are multiples of 4, hence so is every record.

use crate::bitpack::BitPacker;
use crate::measurement::Quantized;

const TAG_BITS: usize = 4;
const TEMPERATURE_WIDTHS: [u8; 4] = [4, 8, 12, 16];
const TEMPERATURE_ABSOLUTE_TAG: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    temperature_tag: u8,
    humidity_absolute: bool,
    vcc_present: bool,
}

impl Layout {
    fn choose(prev: Quantized, next: Quantized) -> Self {
        let dt = i32::from(next.temperature) - i32::from(prev.temperature);
        let temperature_tag = TEMPERATURE_WIDTHS[..3]
            .iter()
            .position(|&bits| fits_signed(dt, bits))
            .map(|tag| tag as u8)
            .unwrap_or(TEMPERATURE_ABSOLUTE_TAG);

        let dh = i32::from(next.humidity) - i32::from(prev.humidity);

        Self {
            temperature_tag,
            humidity_absolute: !fits_signed(dh, 4),
            vcc_present: next.vcc != prev.vcc,
        }
    }

    fn from_tags(tags: u32) -> Self {
        Self {
            temperature_tag: (tags & 0b11) as u8,
            humidity_absolute: tags & 0b100 != 0,
            vcc_present: tags & 0b1000 != 0,
        }
    }

    fn tags(&self) -> u32 {
        u32::from(self.temperature_tag)
            | (u32::from(self.humidity_absolute) << 2)
            | (u32::from(self.vcc_present) << 3)
    }

    fn temperature_bits(&self) -> u8 {
        TEMPERATURE_WIDTHS[self.temperature_tag as usize]
    }

    fn humidity_bits(&self) -> u8 {
        if self.humidity_absolute {
            8
        } else {
            4
        }
    }

    fn vcc_bits(&self) -> u8 {
        if self.vcc_present {
            8
        } else {
            0
        }
    }

    fn total_bits(&self) -> usize {
        TAG_BITS
            + self.temperature_bits() as usize
            + self.humidity_bits() as usize
            + self.vcc_bits() as usize
    }
}

fn fits_signed(value: i32, bits: u8) -> bool {
    let limit = 1i32 << (bits - 1);
    (-limit..limit).contains(&value)
}

fn to_field(value: i32, bits: u8) -> u32 {
    (value as u32) & ((1u32 << bits) - 1)
}

fn sign_extend(raw: u32, bits: u8) -> i32 {
    let shift = 32 - u32::from(bits);
    ((raw << shift) as i32) >> shift
}

/// Size in bits of the record that encodes `next` after `prev`
pub(crate) fn record_bits(prev: Quantized, next: Quantized) -> usize {
    Layout::choose(prev, next).total_bits()
}

/// Append the record for `next`; the caller has checked `remaining()`
pub(crate) fn write_record<B>(bits: &mut BitPacker<B>, prev: Quantized, next: Quantized)
where
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    let layout = Layout::choose(prev, next);
    bits.write(layout.tags(), TAG_BITS as u8);

    let temperature = if layout.temperature_tag == TEMPERATURE_ABSOLUTE_TAG {
        u32::from(next.temperature as u16)
    } else {
        let dt = i32::from(next.temperature) - i32::from(prev.temperature);
        to_field(dt, layout.temperature_bits())
    };
    bits.write(temperature, layout.temperature_bits());

    let humidity = if layout.humidity_absolute {
        u32::from(next.humidity)
    } else {
        to_field(i32::from(next.humidity) - i32::from(prev.humidity), 4)
    };
    bits.write(humidity, layout.humidity_bits());

    if layout.vcc_present {
        bits.write(u32::from(next.vcc), 8);
    }
}

/// Decode the record at `pos` relative to `prev`
///
/// Returns `None` when no complete record starts at `pos`, which is how the
/// end of a group (or a damaged one) is detected. `pos` only moves on
/// success.
pub(crate) fn read_record<B>(bits: &BitPacker<B>, pos: &mut usize, prev: Quantized) -> Option<Quantized>
where
    B: AsRef<[u8]>,
{
    if *pos + TAG_BITS > bits.len() {
        return None;
    }

    let mut cursor = *pos;
    let layout = Layout::from_tags(bits.read(&mut cursor, TAG_BITS as u8));
    if *pos + layout.total_bits() > bits.len() {
        return None;
    }

    let raw = bits.read(&mut cursor, layout.temperature_bits());
    let temperature = if layout.temperature_tag == TEMPERATURE_ABSOLUTE_TAG {
        raw as u16 as i16
    } else {
        let dt = sign_extend(raw, layout.temperature_bits());
        (i32::from(prev.temperature) + dt) as i16
    };

    let raw = bits.read(&mut cursor, layout.humidity_bits());
    let humidity = if layout.humidity_absolute {
        raw as u8
    } else {
        (i32::from(prev.humidity) + sign_extend(raw, 4)) as u8
    };

    let vcc = if layout.vcc_present {
        bits.read(&mut cursor, 8) as u8
    } else {
        prev.vcc
    };

    *pos = cursor;
    Some(Quantized {
        temperature,
        humidity,
        vcc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(temperature: i16, humidity: u8, vcc: u8) -> Quantized {
        Quantized {
            temperature,
            humidity,
            vcc,
        }
    }

    fn round_trip(prev: Quantized, next: Quantized) -> (Quantized, usize) {
        let mut bits = BitPacker::new();
        write_record(&mut bits, prev, next);
        let mut pos = 0;
        let decoded = read_record(&bits, &mut pos, prev).unwrap();
        assert_eq!(pos, bits.len());
        (decoded, pos)
    }

    #[test]
    fn small_change_uses_minimal_record() {
        let prev = q(2137, 115, 130);
        let next = q(2140, 113, 130);
        let (decoded, used) = round_trip(prev, next);
        assert_eq!(decoded, next);
        assert_eq!(used, 12);
    }

    #[test]
    fn widths_step_up_with_delta() {
        let prev = q(0, 100, 130);
        assert_eq!(record_bits(prev, q(7, 100, 130)), 12);
        assert_eq!(record_bits(prev, q(-8, 100, 130)), 12);
        assert_eq!(record_bits(prev, q(8, 100, 130)), 16);
        assert_eq!(record_bits(prev, q(-129, 100, 130)), 20);
        assert_eq!(record_bits(prev, q(2048, 100, 130)), 24);
        assert_eq!(record_bits(prev, q(0, 108, 130)), 16);
        assert_eq!(record_bits(prev, q(0, 100, 129)), 20);
    }

    #[test]
    fn extreme_jumps_round_trip() {
        let prev = q(i16::MIN, 0, 0);
        let next = q(i16::MAX, 255, 255);
        let (decoded, used) = round_trip(prev, next);
        assert_eq!(decoded, next);
        assert_eq!(used, 36);

        let (decoded, _) = round_trip(next, prev);
        assert_eq!(decoded, prev);
    }

    #[test]
    fn every_record_is_nibble_aligned() {
        let prev = q(100, 50, 50);
        for dt in [-3000i16, -200, -5, 0, 5, 200, 3000] {
            for dh in [-100i16, -3, 0, 3, 100] {
                for vcc in [50u8, 51] {
                    let next = q(100 + dt, (50 + dh).clamp(0, 255) as u8, vcc);
                    assert_eq!(record_bits(prev, next) % 4, 0);
                    assert_eq!(round_trip(prev, next).0, next);
                }
            }
        }
    }

    #[test]
    fn truncated_record_is_rejected() {
        let prev = q(0, 0, 0);
        let mut bits = BitPacker::new();
        write_record(&mut bits, prev, q(5000, 200, 10));

        let short = BitPacker::with_len(bits.into_inner(), 20);
        let mut pos = 0;
        assert_eq!(read_record(&short, &mut pos, prev), None);
        assert_eq!(pos, 0);
    }
}
