//! The ZX7 stream format (backwards variant by Antonio Villena)
//!
//! A ZX7 stream starts with one verbatim byte, then alternates flag bits
//! between literals (`0` + byte) and copies (`1` + Elias gamma length +
//! offset). Offsets up to 128 fit in one byte; larger ones add four extra
//! bits for a reach of [`MAX_OFFSET`] bytes. The stream ends with a length
//! code of more than fifteen leading zeros.
//!
//! Compression uses an optimal parse, so the emitted stream is the smallest
//! this format can express for the given input.

mod decompress;
mod parse;

pub use parse::{MAX_LEN, MAX_OFFSET};

use crate::{
    DecompressError, Direction,
    bitstream::BitWriter,
    zx7::parse::{elias_gamma_bits, optimize},
};

/// Compress `input` into a ZX7 stream
///
/// With [`Direction::Backwards`] the stream is laid out for depackers that
/// walk down through memory; the input is processed reversed and the stream
/// is stored reversed.
pub fn compress(input: &[u8], direction: Direction) -> Vec<u8> {
    if input.is_empty() {
        return Vec::new();
    }
    let reversed;
    let data = match direction {
        Direction::Forward => input,
        Direction::Backwards => {
            reversed = reverse(input);
            &reversed
        }
    };

    let optimal = optimize(data);

    // Walk the parse back from the last byte to recover the emission order.
    let mut path = Vec::new();
    let mut i = data.len() - 1;
    while i > 0 {
        path.push(i);
        let step = if optimal[i].len > 0 {
            optimal[i].len as usize
        } else {
            1
        };
        i -= step;
    }

    let total_bits = optimal[data.len() - 1].bits;
    let mut writer = BitWriter::with_capacity((total_bits as usize + 18 + 7) / 8);
    writer.write_byte(data[0]);

    for &end in path.iter().rev() {
        let parse = optimal[end];
        if parse.len == 0 {
            writer.write_bit(false);
            writer.write_byte(data[end]);
        } else {
            writer.write_bit(true);
            write_elias_gamma(&mut writer, parse.len - 1);
            write_offset(&mut writer, parse.offset - 1);
        }
    }

    // End marker: a length code with sixteen leading zeros.
    writer.write_bit(true);
    writer.write_bits(1, 17);

    let mut output = writer.finish();
    if direction == Direction::Backwards {
        output.reverse();
    }
    output
}

/// Decompress a ZX7 stream produced for the given direction
///
/// `capacity_hint` pre-sizes the output buffer; it does not limit the
/// decoded size.
pub fn decompress(
    input: &[u8],
    direction: Direction,
    capacity_hint: usize,
) -> Result<Vec<u8>, DecompressError> {
    if input.is_empty() {
        return Ok(Vec::new());
    }
    match direction {
        Direction::Forward => decompress::decompress_forward(input, capacity_hint),
        Direction::Backwards => {
            let reversed = reverse(input);
            let mut output = decompress::decompress_forward(&reversed, capacity_hint)?;
            output.reverse();
            Ok(output)
        }
    }
}

fn reverse(input: &[u8]) -> Vec<u8> {
    input.iter().rev().copied().collect()
}

fn write_elias_gamma(writer: &mut BitWriter, value: u32) {
    let zeros = (elias_gamma_bits(value) - 1) / 2;
    for _ in 0..zeros {
        writer.write_bit(false);
    }
    let mut mask = 1 << zeros;
    while mask > 0 {
        writer.write_bit(value & mask != 0);
        mask >>= 1;
    }
}

fn write_offset(writer: &mut BitWriter, offset: u32) {
    if offset < 128 {
        writer.write_byte(offset as u8);
    } else {
        let offset = offset - 128;
        writer.write_byte((offset & 127 | 128) as u8);
        writer.write_bits(offset >> 7, 4);
    }
}
