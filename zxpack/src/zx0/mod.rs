//! The ZX0 stream format (Einar Saukas)
//!
//! ZX0 knows three kinds of block: a literal run, a copy reusing the last
//! offset, and a copy from a new offset. Lengths and offset high parts use
//! *interlaced* Elias gamma codes, whose marker bits sit between the value
//! bits so the Z80 depacker can keep them in one rotating register. A new
//! offset writes its low seven bits in a whole byte whose last bit is
//! back-filled with the first bit of the following length code.
//!
//! Compression uses an optimal parse over the whole offset window, or over
//! the smaller [`QUICK_MAX_OFFSET`] window in quick mode.

mod decompress;
mod parse;

pub use parse::{MAX_OFFSET, QUICK_MAX_OFFSET};

use crate::{
    DecompressError, Direction,
    bitstream::BitWriter,
    zx0::parse::{INITIAL_OFFSET, NONE, optimize},
};

/// Offset window selection for the ZX0 parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetLimit {
    /// Full 32640-byte window
    Full,
    /// 2176-byte window; parses much faster on large inputs
    Quick,
}

impl OffsetLimit {
    fn window(self) -> usize {
        match self {
            OffsetLimit::Full => MAX_OFFSET,
            OffsetLimit::Quick => QUICK_MAX_OFFSET,
        }
    }
}

/// Compress `input` into a ZX0 stream
pub fn compress(input: &[u8], limit: OffsetLimit, direction: Direction) -> Vec<u8> {
    if input.is_empty() {
        return Vec::new();
    }
    let backwards = direction == Direction::Backwards;
    let reversed;
    let data = match direction {
        Direction::Forward => input,
        Direction::Backwards => {
            reversed = reverse(input);
            &reversed
        }
    };

    let (arena, last) = optimize(data, limit.window());

    // Chains lead from the last block back to the sentinel; emit forwards.
    let mut path = Vec::new();
    let mut cursor = last;
    while cursor != NONE {
        path.push(cursor);
        cursor = arena.block(cursor).chain;
    }
    path.reverse();

    let total_bits = arena.block(last).bits;
    let mut writer = BitWriter::with_capacity((total_bits as usize + 18 + 7) / 8);
    let mut input_index = 0;
    let mut last_offset = INITIAL_OFFSET as u32;
    let mut first_block = true;

    // path[0] is the sentinel.
    for &id in &path[1..] {
        let block = arena.block(id);
        if block.offset == 0 {
            // Literal run; the leading indicator bit is implicit for the
            // very first block.
            if first_block {
                first_block = false;
            } else {
                writer.write_bit(false);
            }
            write_interlaced_gamma(&mut writer, block.length, backwards);
            for _ in 0..block.length {
                writer.write_byte(data[input_index]);
                input_index += 1;
            }
        } else if block.offset == last_offset {
            writer.write_bit(false);
            write_interlaced_gamma(&mut writer, block.length, backwards);
            input_index += block.length as usize;
        } else {
            writer.write_bit(true);
            write_interlaced_gamma(&mut writer, (block.offset - 1) / 128 + 1, backwards);
            let low = (block.offset - 1) % 128;
            let offset_byte = if backwards { low << 1 } else { (255 - low) << 1 };
            writer.write_byte(offset_byte as u8);
            writer.set_backtrack();
            write_interlaced_gamma(&mut writer, block.length - 1, backwards);
            input_index += block.length as usize;
            last_offset = block.offset;
        }
    }

    // End marker: an offset high part of 256, unreachable by real offsets.
    writer.write_bit(true);
    write_interlaced_gamma(&mut writer, 256, backwards);

    let mut output = writer.finish();
    if backwards {
        output.reverse();
    }
    output
}

/// Decompress a ZX0 stream produced for the given direction
pub fn decompress(
    input: &[u8],
    direction: Direction,
    capacity_hint: usize,
) -> Result<Vec<u8>, DecompressError> {
    if input.is_empty() {
        return Ok(Vec::new());
    }
    match direction {
        Direction::Forward => decompress::decompress_stream(input, false, capacity_hint),
        Direction::Backwards => {
            let reversed = reverse(input);
            let mut output = decompress::decompress_stream(&reversed, true, capacity_hint)?;
            output.reverse();
            Ok(output)
        }
    }
}

fn reverse(input: &[u8]) -> Vec<u8> {
    input.iter().rev().copied().collect()
}

/// Interlaced gamma: each value bit is preceded by a continuation marker.
/// Backwards streams flip the marker polarity.
fn write_interlaced_gamma(writer: &mut BitWriter, value: u32, backwards: bool) {
    let mut mask = 1u32 << 31;
    while value & mask == 0 {
        mask >>= 1;
    }
    // The top bit is implicit; the rest alternate marker and value bits.
    mask >>= 1;
    while mask > 0 {
        writer.write_bit(backwards);
        writer.write_bit(value & mask != 0);
        mask >>= 1;
    }
    writer.write_bit(!backwards);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_round_trips_to_empty() {
        assert_eq!(
            compress(&[], OffsetLimit::Full, Direction::Forward),
            Vec::<u8>::new()
        );
        assert_eq!(
            decompress(&[], Direction::Forward, 0).unwrap(),
            Vec::<u8>::new()
        );
    }

    #[test]
    fn single_literal_stream_layout() {
        // Implicit literal indicator, gamma(1) = "1", the byte, then the end
        // marker: indicator "1" + gamma(256), sixteen zero bits and a one.
        let output = compress(&[0xAA], OffsetLimit::Full, Direction::Forward);
        assert_eq!(output, vec![0b1100_0000, 0xAA, 0x00, 0b0010_0000]);
    }

    #[test]
    fn round_trip_text() {
        let input = b"compression by the book, compression by the book";
        let output = compress(input, OffsetLimit::Full, Direction::Forward);
        assert!(output.len() < input.len());
        let decoded = decompress(&output, Direction::Forward, input.len()).unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn round_trip_runs_and_literals() {
        let mut input = Vec::new();
        input.extend_from_slice(b"header");
        input.extend(std::iter::repeat(0x00).take(300));
        input.extend_from_slice(b"header");
        input.extend(std::iter::repeat(0xFF).take(130));
        for limit in [OffsetLimit::Full, OffsetLimit::Quick] {
            let output = compress(&input, limit, Direction::Forward);
            let decoded = decompress(&output, Direction::Forward, input.len()).unwrap();
            assert_eq!(decoded, input);
        }
    }

    #[test]
    fn round_trip_backwards() {
        let input = b"zx spectrum next zx spectrum next zx spectrum";
        let output = compress(input, OffsetLimit::Full, Direction::Backwards);
        let decoded = decompress(&output, Direction::Backwards, input.len()).unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn round_trip_wide_offsets() {
        // The marker bytes never occur in the filler, so their repeat is
        // only reachable beyond the quick window, with a multi-part offset
        // high gamma.
        let marker: Vec<u8> = (200u8..=255).collect();
        let mut input = marker.clone();
        input.extend((0u32..2500).map(|i| (i * 7 % 200) as u8));
        input.extend_from_slice(&marker);
        let output = compress(&input, OffsetLimit::Full, Direction::Forward);
        let decoded = decompress(&output, Direction::Forward, input.len()).unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn quick_mode_round_trips_random_data() {
        use rand::{Rng, SeedableRng, rngs::StdRng};

        let mut rng = StdRng::seed_from_u64(0x0320);
        let input: Vec<u8> = (0..8192).map(|_| rng.r#gen::<u8>() % 3).collect();
        let output = compress(&input, OffsetLimit::Quick, Direction::Forward);
        let decoded = decompress(&output, Direction::Forward, input.len()).unwrap();
        assert_eq!(decoded, input);
    }

    /// Largest copy offset used anywhere in the chosen parse chain
    fn max_copy_offset(input: &[u8], window: usize) -> usize {
        let (arena, last) = optimize(input, window);
        let mut max_used = 0;
        let mut cursor = last;
        while cursor != NONE {
            let block = arena.block(cursor);
            if block.offset > 0 && block.length > 0 {
                max_used = max_used.max(block.offset as usize);
            }
            cursor = block.chain;
        }
        max_used
    }

    #[test]
    fn parse_stays_inside_the_offset_window() {
        // The marker bytes never occur in the filler, so the only
        // long-range match sits one byte past the quick window.
        let marker: Vec<u8> = (200u8..=231).collect();
        let gap = QUICK_MAX_OFFSET - marker.len() + 1;
        let mut input = marker.clone();
        input.extend((0..gap).map(|i| (i % 13) as u8));
        input.extend_from_slice(&marker);

        // The full window takes the wide copy; quick mode must not.
        assert_eq!(max_copy_offset(&input, MAX_OFFSET), QUICK_MAX_OFFSET + 1);
        assert!(max_copy_offset(&input, QUICK_MAX_OFFSET) <= QUICK_MAX_OFFSET);

        let output = compress(&input, OffsetLimit::Quick, Direction::Forward);
        let decoded = decompress(&output, Direction::Forward, input.len()).unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn truncated_stream_reports_unexpected_end() {
        let input = b"truncate me, truncate me, truncate me";
        let output = compress(input, OffsetLimit::Full, Direction::Forward);
        let truncated = &output[..output.len() - 2];
        assert_eq!(
            decompress(truncated, Direction::Forward, 64),
            Err(DecompressError::UnexpectedEnd)
        );
    }
}
