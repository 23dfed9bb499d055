//! Bit-Level Packing for Compact Encodings
//!
//! ## Overview
//!
//! `BitPacker` is a write cursor plus random-access reader over a fixed byte
//! buffer. Values are appended least-significant bit first: bit `p` of the
//! stream is bit `p % 8` of byte `p / 8`.
//!
//! ```text
//! write(0b101, 3); write(0b11, 2);
//!
//! byte 0:  bit7 .. bit0
//!          0 0 0 1 1 1 0 1
//!                └┬┘ └─┬─┘
//!             0b11   0b101
//! ```
//!
//! ## Failure Policy
//!
//! Firmware must not panic on a full buffer. A write that does not fit is
//! dropped as a whole and leaves both the cursor and the previously written
//! bits untouched; a read past the written length returns 0 without moving
//! the caller's cursor. Callers that cannot afford to lose data check
//! `remaining()` first, which is what the storage codec does.
//!
//! ## Buffers
//!
//! The packer is generic over its buffer: the default owns `[u8; 128]`
//! (1024 bits), while the storage codec wraps a group's 32-byte payload slice
//! in place with `with_len`. Reads need `AsRef<[u8]>`, writes additionally
//! `AsMut<[u8]>`.

/// Default buffer size in bytes (1024 bits)
pub const DEFAULT_CAPACITY_BYTES: usize = 128;

/// Fixed-capacity bit stream
#[derive(Debug, Clone)]
pub struct BitPacker<B = [u8; DEFAULT_CAPACITY_BYTES]> {
    buffer: B,
    /// Number of valid bits
    len: usize,
}

impl BitPacker {
    /// Empty packer with the default 1024-bit capacity
    pub const fn new() -> Self {
        Self {
            buffer: [0; DEFAULT_CAPACITY_BYTES],
            len: 0,
        }
    }
}

impl Default for BitPacker {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: AsRef<[u8]>> BitPacker<B> {
    /// Wrap an existing buffer whose first `len` bits are valid
    ///
    /// `len` is clamped to the buffer capacity.
    pub fn with_len(buffer: B, len: usize) -> Self {
        let capacity = buffer.as_ref().len() * 8;
        Self {
            buffer,
            len: len.min(capacity),
        }
    }

    /// Number of bits written
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when nothing has been written
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total capacity in bits
    pub fn capacity(&self) -> usize {
        self.buffer.as_ref().len() * 8
    }

    /// Bits still available for writing
    pub fn remaining(&self) -> usize {
        self.capacity() - self.len
    }

    /// Raw backing bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_ref()
    }

    /// Give the buffer back
    pub fn into_inner(self) -> B {
        self.buffer
    }

    /// Read up to 8 bits at `pos`, advancing `pos`
    ///
    /// Returns 0 and leaves `pos` alone if `bits` is not in `1..=8` or the
    /// read would pass the written length.
    pub fn read8(&self, pos: &mut usize, bits: u8) -> u8 {
        if bits == 0 || bits > 8 || !self.can_read(*pos, bits) {
            return 0;
        }

        let data = self.buffer.as_ref();
        let mut value = 0u8;
        for i in 0..bits as usize {
            let p = *pos + i;
            if data[p >> 3] & (1 << (p & 7)) != 0 {
                value |= 1 << i;
            }
        }
        *pos += bits as usize;
        value
    }

    /// Read up to 32 bits at `pos`, advancing `pos`
    ///
    /// Same failure contract as [`read8`](Self::read8).
    pub fn read(&self, pos: &mut usize, bits: u8) -> u32 {
        if bits == 0 || bits > 32 || !self.can_read(*pos, bits) {
            return 0;
        }

        let mut value = 0u32;
        let mut shift = 0u32;
        let mut left = bits;
        while left > 0 {
            let chunk = left.min(8);
            value |= u32::from(self.read8(pos, chunk)) << shift;
            shift += u32::from(chunk);
            left -= chunk;
        }
        value
    }

    fn can_read(&self, pos: usize, bits: u8) -> bool {
        pos <= self.len && bits as usize <= self.len - pos
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> BitPacker<B> {
    /// Append the low `bits` (1..=8) bits of `value`
    ///
    /// Dropped silently if it does not fit.
    pub fn write8(&mut self, value: u8, bits: u8) {
        if bits == 0 || bits > 8 || bits as usize > self.remaining() {
            return;
        }

        let start = self.len;
        let data = self.buffer.as_mut();
        for i in 0..bits as usize {
            let p = start + i;
            let mask = 1u8 << (p & 7);
            if value & (1 << i) != 0 {
                data[p >> 3] |= mask;
            } else {
                data[p >> 3] &= !mask;
            }
        }
        self.len += bits as usize;
    }

    /// Append the low `bits` (1..=32) bits of `value`
    ///
    /// The whole value is dropped if it does not fit; partial writes never
    /// happen.
    pub fn write(&mut self, value: u32, bits: u8) {
        if bits == 0 || bits > 32 || bits as usize > self.remaining() {
            return;
        }

        let mut shift = 0u32;
        let mut left = bits;
        while left > 0 {
            let chunk = left.min(8);
            self.write8((value >> shift) as u8, chunk);
            shift += u32::from(chunk);
            left -= chunk;
        }
    }

    /// Reset length to zero and zero the buffer
    pub fn clear(&mut self) {
        self.buffer.as_mut().fill(0);
        self.len = 0;
    }
}
