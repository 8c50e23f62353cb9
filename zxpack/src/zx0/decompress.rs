//! Decoder for ZX0 streams

use crate::{DecompressError, bitstream::BitReader};

use super::parse::INITIAL_OFFSET;

/// Decoder states; the stream always opens with a literal run
enum State {
    Literals,
    CopyFromLastOffset,
    CopyFromNewOffset,
}

/// Decode a ZX0 stream; `backwards` selects the flipped gamma polarity
/// used by streams meant for depackers that walk down through memory.
/// The caller byte-reverses such streams before and after.
pub(super) fn decompress_stream(
    input: &[u8],
    backwards: bool,
    capacity: usize,
) -> Result<Vec<u8>, DecompressError> {
    let mut reader = BitReader::new(input);
    let mut output = Vec::with_capacity(capacity);
    let mut last_offset = INITIAL_OFFSET;
    let mut state = State::Literals;
    loop {
        state = match state {
            State::Literals => {
                let length = read_interlaced_gamma(&mut reader, backwards)?;
                for _ in 0..length {
                    let byte = reader.read_byte()?;
                    output.push(byte);
                }
                if reader.read_bit()? {
                    State::CopyFromNewOffset
                } else {
                    State::CopyFromLastOffset
                }
            }
            State::CopyFromLastOffset => {
                let length = read_interlaced_gamma(&mut reader, backwards)? as usize;
                copy_back(&mut output, last_offset, length)?;
                if reader.read_bit()? {
                    State::CopyFromNewOffset
                } else {
                    State::Literals
                }
            }
            State::CopyFromNewOffset => {
                let high = read_interlaced_gamma(&mut reader, backwards)?;
                if high == 256 {
                    return Ok(output);
                }
                let low = usize::from(reader.read_byte()?);
                last_offset = if backwards {
                    ((high as usize - 1) << 7) + (low >> 1) + 1
                } else {
                    ((high as usize - 1) << 7) + 128 - (low >> 1)
                };
                reader.set_backtrack();
                let length = read_interlaced_gamma(&mut reader, backwards)? as usize + 1;
                copy_back(&mut output, last_offset, length)?;
                if reader.read_bit()? {
                    State::CopyFromNewOffset
                } else {
                    State::Literals
                }
            }
        };
    }
}

fn read_interlaced_gamma(
    reader: &mut BitReader,
    backwards: bool,
) -> Result<u32, DecompressError> {
    let mut value = 1u32;
    while reader.read_bit()? == backwards {
        if value >= 1 << 30 {
            return Err(DecompressError::InvalidCode);
        }
        value = value << 1 | reader.read_bit()? as u32;
    }
    Ok(value)
}

fn copy_back(output: &mut Vec<u8>, offset: usize, len: usize) -> Result<(), DecompressError> {
    if offset > output.len() {
        return Err(DecompressError::InvalidOffset {
            offset,
            position: output.len(),
        });
    }
    for _ in 0..len {
        let byte = output[output.len() - offset];
        output.push(byte);
    }
    Ok(())
}
