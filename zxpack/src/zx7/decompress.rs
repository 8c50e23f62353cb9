//! Decoder for ZX7 streams

use crate::{DecompressError, bitstream::BitReader};

/// Decode a forward ZX7 stream; backwards streams are reversed by the caller
pub(super) fn decompress_forward(
    input: &[u8],
    capacity: usize,
) -> Result<Vec<u8>, DecompressError> {
    let mut reader = BitReader::new(input);
    let mut output = Vec::with_capacity(capacity);
    output.push(reader.read_byte()?);
    loop {
        if !reader.read_bit()? {
            output.push(reader.read_byte()?);
            continue;
        }
        let Some(value) = read_elias_gamma(&mut reader)? else {
            return Ok(output);
        };
        let len = value as usize + 1;
        let offset = read_offset(&mut reader)? + 1;
        copy_back(&mut output, offset, len)?;
    }
}

/// Read an Elias gamma value; more than fifteen leading zeros is the end marker
fn read_elias_gamma(reader: &mut BitReader) -> Result<Option<u32>, DecompressError> {
    let mut zeros = 0;
    while !reader.read_bit()? {
        zeros += 1;
    }
    if zeros > 15 {
        return Ok(None);
    }
    let mut value = 1;
    for _ in 0..zeros {
        value = value << 1 | reader.read_bit()? as u32;
    }
    Ok(Some(value))
}

fn read_offset(reader: &mut BitReader) -> Result<usize, DecompressError> {
    let value = usize::from(reader.read_byte()?);
    if value < 128 {
        return Ok(value);
    }
    let high = reader.read_bits(4)? as usize;
    Ok(((value & 127) | high << 7) + 128)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_single_byte_stream() {
        let stream = [0x42, 0x80, 0x00, 0x40];
        assert_eq!(decompress_forward(&stream, 1).unwrap(), vec![0x42]);
    }

    #[test]
    fn decodes_literal_only_stream() {
        let stream = [0x61, 0x20, 0x62, 0x63, 0x00, 0x10];
        assert_eq!(decompress_forward(&stream, 3).unwrap(), b"abc");
    }

    #[test]
    fn overlapping_copy_repeats_last_byte() {
        // Verbatim 0x07, then a copy of length 4 at offset 1, then the end
        // marker. Length 4 is gamma "0 1 1"; offset byte 0 means offset 1.
        // Cell bits: 1 011 1 | 0...  second cell: 15 zeros + final 1.
        let stream = [0x07, 0b1011_1000, 0x00, 0x00, 0b0000_0100];
        assert_eq!(
            decompress_forward(&stream, 5).unwrap(),
            vec![0x07, 0x07, 0x07, 0x07, 0x07]
        );
    }

    #[test]
    fn gamma_end_marker_needs_more_than_fifteen_zeros() {
        // A length code with exactly 15 zeros is still a value, not the end.
        let mut reader = BitReader::new(&[0x00, 0b0000_0001, 0x00, 0x00]);
        let value = read_elias_gamma(&mut reader).unwrap();
        assert_eq!(value, Some(1 << 15));
    }

    #[test]
    fn offset_field_widths() {
        let mut reader = BitReader::new(&[0x7F]);
        assert_eq!(read_offset(&mut reader).unwrap(), 127);

        // 0xFF selects the wide field; four high bits 0b1111 follow.
        let mut reader = BitReader::new(&[0xFF, 0b1111_0000]);
        assert_eq!(read_offset(&mut reader).unwrap(), 2175);
    }
}
