//! One 37-byte storage group
//!
//! A group holds an absolute seed measurement and a bit-packed run of delta
//! records that follow it. The header byte says whether the group is in use
//! and how much of the payload is filled:
//!
//! ```text
//! header:  bit 7 .. bit 1   bit 0
//!          used size         initialized
//!          (nibbles, 0..=64)
//! ```

use crate::bitpack::BitPacker;
use crate::constants::storage::{GROUP_PAYLOAD_BITS, GROUP_PAYLOAD_SIZE, GROUP_SIZE, USED_SIZE_UNIT_BITS};
use crate::errors::{DecodeError, DecodeResult};
use crate::measurement::Quantized;

use super::codec;

const INITIALIZED_BIT: u8 = 0x01;
const USED_SHIFT: u8 = 1;
const MAX_USED_UNITS: u8 = (GROUP_PAYLOAD_BITS / USED_SIZE_UNIT_BITS) as u8;

/// Build a header byte from its two fields
///
/// `used_units` counts payload nibbles; values above 127 are truncated to
/// the 7-bit field.
pub const fn pack_header(initialized: bool, used_units: u8) -> u8 {
    (initialized as u8) | ((used_units & 0x7F) << USED_SHIFT)
}

/// Split a header byte into `(initialized, used_units)`
pub const fn unpack_header(header: u8) -> (bool, u8) {
    (header & INITIALIZED_BIT != 0, header >> USED_SHIFT)
}

/// Seed plus delta payload, laid out exactly as stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct Group {
    header: u8,
    vcc: u8,
    humidity: u8,
    temperature: [u8; 2],
    payload: [u8; GROUP_PAYLOAD_SIZE],
}

const _: () = assert!(core::mem::size_of::<Group>() == GROUP_SIZE);

impl Default for Group {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Group {
    /// Unused group, all zero
    pub const EMPTY: Self = Self {
        header: 0,
        vcc: 0,
        humidity: 0,
        temperature: [0; 2],
        payload: [0; GROUP_PAYLOAD_SIZE],
    };

    /// New group whose first record is `seed`
    pub fn seeded(seed: Quantized) -> Self {
        Self {
            header: pack_header(true, 0),
            vcc: seed.vcc,
            humidity: seed.humidity,
            temperature: seed.temperature.to_le_bytes(),
            payload: [0; GROUP_PAYLOAD_SIZE],
        }
    }

    pub fn is_initialized(&self) -> bool {
        unpack_header(self.header).0
    }

    /// Bits of payload holding delta records
    pub fn used_bits(&self) -> usize {
        usize::from(unpack_header(self.header).1) * USED_SIZE_UNIT_BITS
    }

    /// Bits of payload still free
    pub fn remaining_bits(&self) -> usize {
        GROUP_PAYLOAD_BITS.saturating_sub(self.used_bits())
    }

    /// Absolute first record
    pub fn seed(&self) -> Quantized {
        Quantized {
            temperature: i16::from_le_bytes(self.temperature),
            humidity: self.humidity,
            vcc: self.vcc,
        }
    }

    /// Append `next` as a delta from `prev` if the record fits
    ///
    /// `prev` must be the last record of this group.
    pub(crate) fn try_append(&mut self, prev: Quantized, next: Quantized) -> bool {
        if !self.is_initialized() || codec::record_bits(prev, next) > self.remaining_bits() {
            return false;
        }

        let used = self.used_bits();
        let mut bits = BitPacker::with_len(&mut self.payload[..], used);
        codec::write_record(&mut bits, prev, next);
        let used_units = (bits.len() / USED_SIZE_UNIT_BITS) as u8;

        self.header = pack_header(true, used_units);
        true
    }

    /// Records stored here, seed included
    pub fn record_count(&self) -> usize {
        self.records().count()
    }

    /// Decode the records of this group in order
    pub fn records(&self) -> GroupRecords<'_> {
        GroupRecords {
            bits: BitPacker::with_len(&self.payload[..], self.used_bits()),
            pos: 0,
            last: if self.is_initialized() {
                Some(self.seed())
            } else {
                None
            },
            seed_pending: self.is_initialized(),
        }
    }

    /// Packed 37-byte image
    pub fn to_bytes(&self) -> [u8; GROUP_SIZE] {
        let mut out = [0u8; GROUP_SIZE];
        out[0] = self.header;
        out[1] = self.vcc;
        out[2] = self.humidity;
        out[3..5].copy_from_slice(&self.temperature);
        out[5..].copy_from_slice(&self.payload);
        out
    }

    /// Parse a packed image
    ///
    /// Rejects a header whose used size exceeds the payload or that claims
    /// payload without being initialized.
    pub fn from_bytes(bytes: &[u8; GROUP_SIZE]) -> DecodeResult<Self> {
        let (initialized, used_units) = unpack_header(bytes[0]);
        if used_units > MAX_USED_UNITS || (!initialized && used_units != 0) {
            return Err(DecodeError::InvalidGroupHeader);
        }

        let mut payload = [0u8; GROUP_PAYLOAD_SIZE];
        payload.copy_from_slice(&bytes[5..]);
        Ok(Self {
            header: bytes[0],
            vcc: bytes[1],
            humidity: bytes[2],
            temperature: [bytes[3], bytes[4]],
            payload,
        })
    }
}

/// Iterator over the records of one group
#[derive(Debug, Clone)]
pub struct GroupRecords<'a> {
    bits: BitPacker<&'a [u8]>,
    pos: usize,
    last: Option<Quantized>,
    seed_pending: bool,
}

impl Iterator for GroupRecords<'_> {
    type Item = Quantized;

    fn next(&mut self) -> Option<Quantized> {
        let last = self.last?;
        if self.seed_pending {
            self.seed_pending = false;
            return Some(last);
        }

        match codec::read_record(&self.bits, &mut self.pos, last) {
            Some(q) => {
                self.last = Some(q);
                Some(q)
            }
            None => {
                self.last = None;
                None
            }
        }
    }
}

impl core::iter::FusedIterator for GroupRecords<'_> {}
