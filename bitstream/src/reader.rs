//! Bit-level reader with bounded operations.

use crate::adaptive::{is_last_level, ADAPTIVE_WIDTHS};
use crate::error::{BitError, BitResult};

/// A bit-level reader for decoding packed binary data.
///
/// All read operations are bounds-checked against the declared bit length and
/// return errors on failure. The reader never panics on malformed input.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_len: usize,
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a new `BitReader` over every bit of `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            bit_len: data.len().saturating_mul(8),
            bit_pos: 0,
        }
    }

    /// Creates a reader that refuses to read past `bit_len` bits.
    ///
    /// `bit_len` is capped at the length of `data`.
    #[must_use]
    pub const fn with_bit_len(data: &'a [u8], bit_len: usize) -> Self {
        let available = data.len().saturating_mul(8);
        Self {
            data,
            bit_len: if bit_len < available {
                bit_len
            } else {
                available
            },
            bit_pos: 0,
        }
    }

    /// Returns the declared length in bits.
    #[must_use]
    pub const fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Returns the number of bits remaining to read.
    #[must_use]
    pub const fn bits_remaining(&self) -> usize {
        self.bit_len.saturating_sub(self.bit_pos)
    }

    /// Returns `true` if there are no more bits to read.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits_remaining() == 0
    }

    /// Returns the current bit position.
    #[must_use]
    pub const fn bit_position(&self) -> usize {
        self.bit_pos
    }

    /// Reads a single bit as a boolean.
    pub fn read_bit(&mut self) -> BitResult<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Reads up to 64 bits as an unsigned integer, most significant first.
    pub fn read_bits(&mut self, bits: u8) -> BitResult<u64> {
        if bits > 64 {
            return Err(BitError::InvalidBitCount {
                bits: bits as usize,
                max_bits: 64,
            });
        }
        if bits == 0 {
            return Ok(0);
        }
        self.ensure_bits(bits as usize)?;

        let mut value = 0u64;
        let mut remaining = bits as usize;
        while remaining > 0 {
            let byte = self.data[self.bit_pos / 8];
            let used = self.bit_pos % 8;
            let free = 8 - used;
            let take = free.min(remaining);
            let chunk = (byte >> (free - take)) & ((1u16 << take) - 1) as u8;
            value = (value << take) | u64::from(chunk);
            self.bit_pos += take;
            remaining -= take;
        }
        Ok(value)
    }

    /// Aligns to the next byte boundary.
    pub fn align_to_byte(&mut self) -> BitResult<()> {
        let rem = self.bit_pos % 8;
        if rem == 0 {
            return Ok(());
        }
        let skip = 8 - rem;
        self.ensure_bits(skip)?;
        self.bit_pos += skip;
        Ok(())
    }

    /// Fills `out` with raw bytes. The cursor must be byte aligned.
    pub fn read_block(&mut self, out: &mut [u8]) -> BitResult<()> {
        let bytes = self.read_block_slice(out.len())?;
        out.copy_from_slice(bytes);
        Ok(())
    }

    /// Borrows `len` raw bytes from the underlying buffer. The cursor must be byte aligned.
    pub fn read_block_slice(&mut self, len: usize) -> BitResult<&'a [u8]> {
        self.ensure_aligned()?;
        self.ensure_bits(len.saturating_mul(8))?;
        let start = self.bit_pos / 8;
        self.bit_pos += len * 8;
        Ok(&self.data[start..start + len])
    }

    /// Reads an adaptive number.
    pub fn read_adaptive_number(&mut self) -> BitResult<u64> {
        let mut level = 0;
        while !is_last_level(level) && self.read_bit()? {
            level += 1;
        }
        self.read_bits(ADAPTIVE_WIDTHS[level])
    }

    fn ensure_aligned(&self) -> BitResult<()> {
        if self.bit_pos % 8 != 0 {
            return Err(BitError::MisalignedAccess {
                bit_position: self.bit_pos,
            });
        }
        Ok(())
    }

    fn ensure_bits(&self, bits: usize) -> BitResult<()> {
        if bits > self.bits_remaining() {
            return Err(BitError::UnexpectedEof {
                requested: bits,
                available: self.bits_remaining(),
            });
        }
        Ok(())
    }
}
