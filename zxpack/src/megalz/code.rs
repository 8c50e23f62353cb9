//! MegaLZ code shapes and their bit costs
//!
//! Every code starts with a flag bit: `1` introduces a literal byte, `0` a
//! copy. Copies come in four families selected by the next two bits:
//!
//! * `00` + 3 bits: length 1, displacement -1..-8
//! * `01` + byte: length 2, displacement -1..-256
//! * `10` + "big displacement": length 3
//! * `11` + variable length field + big displacement: length 4..255
//!
//! A big displacement is either a `0` flag and one byte (-1..-256) or a `1`
//! flag, four high bits and one byte (-257..-4352).

use crate::bitstream::BitWriter;

/// Farthest displacement any copy can reach
pub const MAX_OFFSET: usize = 4352;
/// Farthest displacement of the one-byte encoding
pub(super) const SHORT_OFFSET: usize = 256;
/// Longest copy a single code may cover
pub const MAX_LEN: usize = 255;

/// One emission step: a literal (`disp == 0`) or a copy
///
/// Displacements are negative, pointing back from the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct LzCode {
    pub disp: i32,
    pub length: u32,
}

pub(super) const LITERAL: LzCode = LzCode { disp: 0, length: 1 };

/// Bits the variable length field spends beyond its prefix
fn length_extra_bits(length: u32) -> u32 {
    debug_assert!((4..=255).contains(&length));
    31 - (length - 2).leading_zeros()
}

/// Size of `code` in bits, or `None` if the format cannot express it
pub(super) fn code_bits(code: LzCode) -> Option<u32> {
    if code.disp == 0 {
        return Some(9);
    }
    let disp = -code.disp as usize;
    match code.length {
        1 => (1..=8).contains(&disp).then_some(6),
        2 => (1..=SHORT_OFFSET).contains(&disp).then_some(11),
        3 if disp <= SHORT_OFFSET => Some(12),
        3 if disp <= MAX_OFFSET => Some(16),
        4..=255 if disp <= MAX_OFFSET => {
            let extra = length_extra_bits(code.length);
            Some(if disp <= SHORT_OFFSET {
                2 * extra + 12
            } else {
                2 * extra + 16
            })
        }
        _ => None,
    }
}

/// Emit `code` to the stream; `literal` is the byte a literal code carries
pub(super) fn emit(code: LzCode, literal: u8, writer: &mut BitWriter) {
    if code.disp == 0 {
        writer.write_bit(true);
        writer.write_byte(literal);
        return;
    }
    let disp = -code.disp as usize;
    match code.length {
        1 => {
            // Flag, family 00, three displacement bits.
            writer.write_bits((8 - disp as u32) & 7, 6);
        }
        2 => {
            writer.write_bits(0b001, 3);
            writer.write_byte(code.disp as u8);
        }
        3 => {
            writer.write_bits(0b010, 3);
            write_big_disp(disp, writer);
        }
        _ => {
            writer.write_bits(0b011, 3);
            let extra = length_extra_bits(code.length);
            // Unary count of extra bits, then the extra bits themselves.
            writer.write_bits(1, extra);
            writer.write_bits(code.length - 2 - (1 << extra), extra);
            write_big_disp(disp, writer);
        }
    }
}

fn write_big_disp(disp: usize, writer: &mut BitWriter) {
    let neg = (disp as i32).wrapping_neg();
    if disp <= SHORT_OFFSET {
        writer.write_bit(false);
    } else {
        // Four high bits of the displacement rebased past the short range.
        writer.write_bit(true);
        writer.write_bits((neg + 0x100) as u32 >> 8 & 0xF, 4);
    }
    writer.write_byte(neg as u8);
}

/// The end marker: a variable length prefix with an impossible unary count
pub(super) fn emit_end_marker(writer: &mut BitWriter) {
    writer.write_bits(0b0110_0000_0001, 12);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn copy(disp: i32, length: u32) -> LzCode {
        LzCode { disp, length }
    }

    #[test]
    fn costs_per_family() {
        assert_eq!(code_bits(LITERAL), Some(9));
        assert_eq!(code_bits(copy(-8, 1)), Some(6));
        assert_eq!(code_bits(copy(-256, 2)), Some(11));
        assert_eq!(code_bits(copy(-256, 3)), Some(12));
        assert_eq!(code_bits(copy(-257, 3)), Some(16));
        assert_eq!(code_bits(copy(-1, 4)), Some(14));
        assert_eq!(code_bits(copy(-1, 255)), Some(26));
        assert_eq!(code_bits(copy(-4352, 255)), Some(30));
    }

    #[test]
    fn out_of_range_codes_have_no_cost() {
        assert_eq!(code_bits(copy(-9, 1)), None);
        assert_eq!(code_bits(copy(-257, 2)), None);
        assert_eq!(code_bits(copy(-4353, 3)), None);
        assert_eq!(code_bits(copy(-4353, 100)), None);
        assert_eq!(code_bits(copy(-1, 256)), None);
    }

    #[test]
    fn emitted_length_matches_cost() {
        // Every code family must emit exactly code_bits() bits.
        for code in [
            copy(-1, 1),
            copy(-200, 2),
            copy(-256, 3),
            copy(-4000, 3),
            copy(-10, 4),
            copy(-10, 7),
            copy(-1000, 100),
            copy(-4352, 255),
            LITERAL,
        ] {
            let mut writer = BitWriter::with_capacity(16);
            emit(code, 0xAA, &mut writer);
            // Pad the cell to make the total byte-exact.
            let bits = code_bits(code).unwrap();
            for _ in 0..(8 - bits % 8) % 8 {
                writer.write_bit(false);
            }
            assert_eq!(writer.finish().len(), (bits as usize + 7) / 8, "{code:?}");
        }
    }

    #[test]
    fn short_copy_bit_patterns() {
        // disp -1, length 1: flag 0, family 00, bits 111.
        let mut writer = BitWriter::with_capacity(4);
        emit(copy(-1, 1), 0, &mut writer);
        writer.write_bits(0, 2);
        assert_eq!(writer.finish(), vec![0b0001_1100]);

        // disp -1, length 2: flag 0, family 01, byte 0xFF.
        let mut writer = BitWriter::with_capacity(4);
        emit(copy(-1, 2), 0, &mut writer);
        writer.write_bits(0, 5);
        assert_eq!(writer.finish(), vec![0b0010_0000, 0xFF]);
    }
}
