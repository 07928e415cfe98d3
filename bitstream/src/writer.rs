//! Bit-level writer for encoding packed binary data.

use crate::adaptive::{is_last_level, level_for, ADAPTIVE_WIDTHS};
use crate::error::{BitError, BitResult};

#[derive(Debug)]
enum Storage<'a> {
    /// Growable buffer owned by the writer.
    Owned(Vec<u8>),
    /// Caller memory; never grown, never freed by the writer.
    External(&'a mut [u8]),
}

/// A bit-level writer for encoding packed binary data.
///
/// Bits are written MSB-first within each byte. Writers created with
/// [`new`](Self::new) own a buffer that grows as needed; writers created with
/// [`over`](Self::over) write into caller memory and fail with
/// [`BitError::BufferOverflow`] when it runs out.
#[derive(Debug)]
pub struct BitWriter<'a> {
    storage: Storage<'a>,
    /// Number of bits written so far.
    bit_pos: usize,
}

impl Default for BitWriter<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWriter<'static> {
    /// Creates a new empty growable `BitWriter`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            storage: Storage::Owned(Vec::new()),
            bit_pos: 0,
        }
    }

    /// Creates a new growable `BitWriter` with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            storage: Storage::Owned(Vec::with_capacity(bytes)),
            bit_pos: 0,
        }
    }
}

impl<'a> BitWriter<'a> {
    /// Creates a writer over caller-supplied memory.
    ///
    /// Existing contents of `buf` are overwritten as bits are written.
    #[must_use]
    pub fn over(buf: &'a mut [u8]) -> Self {
        Self {
            storage: Storage::External(buf),
            bit_pos: 0,
        }
    }

    /// Returns the number of bits written so far.
    #[must_use]
    pub const fn bits_written(&self) -> usize {
        self.bit_pos
    }

    /// Returns the number of bytes touched so far, including a partial last byte.
    #[must_use]
    pub const fn bytes_written(&self) -> usize {
        self.bit_pos.div_ceil(8)
    }

    /// Returns `true` if the cursor sits on a byte boundary.
    #[must_use]
    pub const fn is_aligned(&self) -> bool {
        self.bit_pos % 8 == 0
    }

    /// Returns the written bytes. A partial last byte is zero padded.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        let len = self.bytes_written();
        match &self.storage {
            Storage::Owned(bytes) => &bytes[..len],
            Storage::External(buf) => &buf[..len],
        }
    }

    /// Writes a single bit.
    pub fn write_bit(&mut self, value: bool) -> BitResult<()> {
        self.write_bits(u64::from(value), 1)
    }

    /// Writes the low `bits` bits of `value`, most significant first.
    ///
    /// # Errors
    ///
    /// Returns [`BitError::InvalidBitCount`] if `bits > 64`.
    /// Returns [`BitError::ValueOutOfRange`] if `value` doesn't fit in `bits`.
    /// Returns [`BitError::BufferOverflow`] if external memory is exhausted.
    pub fn write_bits(&mut self, value: u64, bits: u8) -> BitResult<()> {
        if bits > 64 {
            return Err(BitError::InvalidBitCount {
                bits: bits as usize,
                max_bits: 64,
            });
        }
        if bits == 0 {
            return Ok(());
        }
        if bits < 64 && value >= (1u64 << bits) {
            return Err(BitError::ValueOutOfRange {
                value,
                bits: bits as usize,
            });
        }
        self.reserve(bits as usize)?;

        let mut pos = self.bit_pos;
        let buf = self.buffer_mut();
        let mut remaining = bits as usize;
        while remaining > 0 {
            let used = pos % 8;
            let free = 8 - used;
            let take = free.min(remaining);
            let chunk = ((value >> (remaining - take)) & low_mask(take)) as u8;
            let placed = chunk << (free - take);
            let byte = &mut buf[pos / 8];
            if used == 0 {
                *byte = placed;
            } else {
                *byte |= placed;
            }
            pos += take;
            remaining -= take;
        }
        self.bit_pos = pos;
        Ok(())
    }

    /// Pads with zero bits up to the next byte boundary.
    pub fn align_to_byte(&mut self) -> BitResult<()> {
        let rem = self.bit_pos % 8;
        if rem == 0 {
            return Ok(());
        }
        self.write_bits(0, (8 - rem) as u8)
    }

    /// Copies `bytes` verbatim. The cursor must be byte aligned.
    pub fn write_block(&mut self, bytes: &[u8]) -> BitResult<()> {
        if !self.is_aligned() {
            return Err(BitError::MisalignedAccess {
                bit_position: self.bit_pos,
            });
        }
        self.reserve(bytes.len().saturating_mul(8))?;
        let start = self.bit_pos / 8;
        self.buffer_mut()[start..start + bytes.len()].copy_from_slice(bytes);
        self.bit_pos += bytes.len() * 8;
        Ok(())
    }

    /// Writes `value` as an adaptive number.
    pub fn write_adaptive_number(&mut self, value: u64) -> BitResult<()> {
        let level = level_for(value);
        for _ in 0..level {
            self.write_bit(true)?;
        }
        if !is_last_level(level) {
            self.write_bit(false)?;
        }
        self.write_bits(value, ADAPTIVE_WIDTHS[level])
    }

    /// Finishes writing and returns the bytes written.
    ///
    /// If the last byte is incomplete, it is padded with zeros on the right.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        let len = self.bytes_written();
        match self.storage {
            Storage::Owned(mut bytes) => {
                bytes.truncate(len);
                bytes
            }
            Storage::External(buf) => buf[..len].to_vec(),
        }
    }

    /// Finishes writing and appends the bytes written to `out`.
    pub fn finish_into(self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes());
    }

    fn reserve(&mut self, bits: usize) -> BitResult<()> {
        let needed_bits = self
            .bit_pos
            .checked_add(bits)
            .ok_or(BitError::BufferOverflow {
                attempted: usize::MAX,
                capacity: self.capacity_bits(),
            })?;
        let needed_bytes = needed_bits.div_ceil(8);
        match &mut self.storage {
            Storage::Owned(bytes) => {
                if bytes.len() < needed_bytes {
                    if bytes.capacity() < needed_bytes {
                        let target = needed_bytes.max(bytes.capacity() * 2);
                        bytes.reserve_exact(target - bytes.len());
                    }
                    bytes.resize(needed_bytes, 0);
                }
                Ok(())
            }
            Storage::External(buf) => {
                let capacity = buf.len().saturating_mul(8);
                if needed_bits > capacity {
                    return Err(BitError::BufferOverflow {
                        attempted: needed_bits,
                        capacity,
                    });
                }
                Ok(())
            }
        }
    }

    fn capacity_bits(&self) -> usize {
        match &self.storage {
            Storage::Owned(_) => usize::MAX,
            Storage::External(buf) => buf.len().saturating_mul(8),
        }
    }

    fn buffer_mut(&mut self) -> &mut [u8] {
        match &mut self.storage {
            Storage::Owned(bytes) => bytes.as_mut_slice(),
            Storage::External(buf) => buf,
        }
    }
}

const fn low_mask(bits: usize) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}
