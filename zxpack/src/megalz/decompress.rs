//! Decoder for MegaLZ streams
//!
//! Mirrors the reference depacker: output goes through a circular window
//! twice the displacement reach, flushed to the output buffer whenever a
//! copy could otherwise overwrite bytes that are still in flight.

use crate::{DecompressError, bitstream::BitReader};

use super::code::MAX_OFFSET;

/// Window size; a power of two comfortably above [`MAX_OFFSET`]
const WINDOW: usize = 8192;
const WINDOW_MASK: usize = WINDOW - 1;
/// Longest single copy plus its literal flag byte; the flush margin
const FLUSH_MARGIN: usize = 257;

pub(super) fn decompress_stream(
    input: &[u8],
    capacity: usize,
) -> Result<Vec<u8>, DecompressError> {
    let mut reader = BitReader::new(input);
    let mut output = Vec::with_capacity(capacity);
    let mut window = vec![0u8; WINDOW];
    // Total bytes produced and total bytes moved out of the window.
    let mut produced = 0usize;
    let mut flushed = 0usize;

    fn push(window: &mut [u8], produced: &mut usize, byte: u8) {
        window[*produced & WINDOW_MASK] = byte;
        *produced += 1;
    }

    push(&mut window, &mut produced, reader.read_byte()?);
    loop {
        if reader.read_bit()? {
            let byte = reader.read_byte()?;
            push(&mut window, &mut produced, byte);
        } else {
            let (disp, len) = match reader.read_bits(2)? {
                0 => (8 - reader.read_bits(3)? as usize, 1),
                1 => (256 - usize::from(reader.read_byte()?), 2),
                2 => (read_big_disp(&mut reader)?, 3),
                _ => {
                    // Variable length: unary count of extra bits, where an
                    // impossible count of nine is the end marker.
                    let mut extra = 0;
                    while !reader.read_bit()? {
                        extra += 1;
                    }
                    extra += 1;
                    if extra == 9 {
                        break;
                    }
                    if extra > 7 {
                        return Err(DecompressError::InvalidCode);
                    }
                    let low = reader.read_bits(extra)? as usize;
                    let disp = read_big_disp(&mut reader)?;
                    (disp, 2 + (1usize << extra) + low)
                }
            };
            if disp > produced {
                return Err(DecompressError::InvalidOffset {
                    offset: disp,
                    position: produced,
                });
            }
            for _ in 0..len {
                let byte = window[(produced - disp) & WINDOW_MASK];
                push(&mut window, &mut produced, byte);
            }
        }
        if produced - flushed > WINDOW - FLUSH_MARGIN {
            flush(&window, &mut flushed, produced, &mut output);
        }
    }
    flush(&window, &mut flushed, produced, &mut output);
    Ok(output)
}

fn read_big_disp(reader: &mut BitReader) -> Result<usize, DecompressError> {
    if reader.read_bit()? {
        let high = reader.read_bits(4)? as usize;
        let low = usize::from(reader.read_byte()?);
        Ok(MAX_OFFSET - (high << 8) - low)
    } else {
        Ok(256 - usize::from(reader.read_byte()?))
    }
}

fn flush(window: &[u8], flushed: &mut usize, produced: usize, output: &mut Vec<u8>) {
    for index in *flushed..produced {
        output.push(window[index & WINDOW_MASK]);
    }
    *flushed = produced;
}
