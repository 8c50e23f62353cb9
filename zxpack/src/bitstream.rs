//! Bit-level plumbing shared by the three codecs
//!
//! All three stream formats interleave "bit cells" with verbatim data bytes:
//! whenever an encoder needs to write a bit and no cell has room left, it
//! reserves the next free byte in the stream as a new cell and fills it MSB
//! first. Data bytes (literals, offset bytes) are written in between, at the
//! current end of the stream. Decoders mirror this exactly, which is what
//! allows the Z80 depackers to run with a single rotating bit register.

use crate::DecompressError;

/// A bit writer that interleaves MSB-first bit cells with verbatim bytes
///
/// The ZX0 format additionally requires *backtracking*: the low bit of an
/// already-written offset byte is patched once the first bit of the following
/// length code is known. [`BitWriter::set_backtrack`] arms that behaviour for
/// the next bit.
pub struct BitWriter {
    buffer: Vec<u8>,
    cell: usize,
    mask: u8,
    backtrack: bool,
}

impl BitWriter {
    /// Create a writer, pre-allocating for the given number of output bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            cell: 0,
            mask: 0,
            backtrack: false,
        }
    }

    /// Append a single bit, reserving a new bit cell if the current one is full
    pub fn write_bit(&mut self, bit: bool) {
        if self.backtrack {
            debug_assert!(!self.buffer.is_empty());
            if bit && let Some(last) = self.buffer.last_mut() {
                *last |= 1;
            }
            self.backtrack = false;
        } else {
            if self.mask == 0 {
                self.mask = 0x80;
                self.cell = self.buffer.len();
                self.buffer.push(0);
            }
            if bit {
                self.buffer[self.cell] |= self.mask;
            }
            self.mask >>= 1;
        }
    }

    /// Append the low `count` bits of `value`, most significant first
    pub fn write_bits(&mut self, value: u32, count: u32) {
        debug_assert!(count <= 32);
        for shift in (0..count).rev() {
            self.write_bit(value >> shift & 1 != 0);
        }
    }

    /// Append a verbatim byte at the current end of the stream
    pub fn write_byte(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Route the next bit into the low bit of the last written byte
    pub fn set_backtrack(&mut self) {
        self.backtrack = true;
    }

    /// Finish the stream; any partial bit cell keeps its zero padding
    pub fn finish(self) -> Vec<u8> {
        self.buffer
    }
}

/// The matching bit reader; fails fast when the stream runs out
pub struct BitReader<'a> {
    input: &'a [u8],
    pos: usize,
    cell: u8,
    mask: u8,
    last_byte: u8,
    backtrack: bool,
}

impl<'a> BitReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            cell: 0,
            mask: 0,
            last_byte: 0,
            backtrack: false,
        }
    }

    /// Read a verbatim byte from the current stream position
    pub fn read_byte(&mut self) -> Result<u8, DecompressError> {
        let byte = *self
            .input
            .get(self.pos)
            .ok_or(DecompressError::UnexpectedEnd)?;
        self.pos += 1;
        self.last_byte = byte;
        Ok(byte)
    }

    /// Read a single bit, fetching the next bit cell when needed
    pub fn read_bit(&mut self) -> Result<bool, DecompressError> {
        if self.backtrack {
            self.backtrack = false;
            return Ok(self.last_byte & 1 != 0);
        }
        self.mask >>= 1;
        if self.mask == 0 {
            self.mask = 0x80;
            self.cell = self.read_byte()?;
        }
        Ok(self.cell & self.mask != 0)
    }

    /// Read `count` bits, most significant first
    pub fn read_bits(&mut self, count: u32) -> Result<u32, DecompressError> {
        debug_assert!(count <= 32);
        let mut value = 0;
        for _ in 0..count {
            value = value << 1 | self.read_bit()? as u32;
        }
        Ok(value)
    }

    /// Take the low bit of the most recent data byte as the next bit
    pub fn set_backtrack(&mut self) {
        self.backtrack = true;
    }
}
