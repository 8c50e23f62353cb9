//! Optimal parse for the ZX7 format
//!
//! Cost-based dynamic programming over the input: `optimal[i]` holds the
//! cheapest encoding (in bits) of the prefix ending at byte `i`, together
//! with the copy that achieves it. Match candidates come from hash chains
//! keyed on the two-byte pair ending at each position, and are extended
//! backwards so that already-proven lengths are never re-compared.

/// Largest offset the 12-bit offset encoding can express
pub const MAX_OFFSET: usize = 2176;
/// Largest copy length a single code may cover
pub const MAX_LEN: usize = 65536;

/// Cheapest parse of one input prefix; `len == 0` marks a literal
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Parse {
    pub bits: u32,
    pub offset: u32,
    pub len: u32,
}

/// Bits taken by the Elias gamma code of `value`
pub(crate) fn elias_gamma_bits(value: u32) -> u32 {
    let mut bits = 1;
    let mut ceiling = 2;
    while ceiling <= value {
        bits += 2;
        ceiling <<= 1;
    }
    bits
}

/// Bits taken by a copy code: flag, offset field and gamma-coded length
fn copy_bits(offset: usize, len: usize) -> u32 {
    1 + if offset > 128 { 12 } else { 8 } + elias_gamma_bits(len as u32 - 1)
}

/// Compute the cheapest parse for every prefix of `input`
///
/// The first byte is always stored verbatim, so `optimal[0]` costs a flat
/// eight bits and carries no copy.
pub(crate) fn optimize(input: &[u8]) -> Vec<Parse> {
    let size = input.len();

    // Chain heads are keyed on the byte pair ending at a position; zero is
    // the null link, which is safe because position zero never holds a match.
    let mut heads = vec![0usize; 65536];
    let mut slots = vec![0usize; size];
    let mut min = vec![0usize; MAX_OFFSET + 1];
    let mut max = vec![0usize; MAX_OFFSET + 1];

    let mut optimal = vec![Parse::default(); size];
    optimal[0].bits = 8;

    for i in 1..size {
        optimal[i] = Parse {
            bits: optimal[i - 1].bits + 9,
            offset: 0,
            len: 0,
        };

        let index = usize::from(input[i - 1]) << 8 | usize::from(input[i]);
        let mut best_len = 1;
        let mut cursor = heads[index];
        let mut previous: Option<usize> = None;
        while cursor != 0 && best_len < MAX_LEN {
            let offset = i - cursor;
            if offset > MAX_OFFSET {
                // Everything further down the chain is even older; cut it.
                match previous {
                    Some(pos) => slots[pos] = 0,
                    None => heads[index] = 0,
                }
                break;
            }

            let mut len = 2;
            while len <= MAX_LEN && i >= len {
                if len > best_len {
                    best_len = len;
                    let bits = optimal[i - len].bits + copy_bits(offset, len);
                    if optimal[i].bits > bits {
                        optimal[i] = Parse {
                            bits,
                            offset: offset as u32,
                            len: len as u32,
                        };
                    }
                } else if max[offset] != 0 && i + 1 == max[offset] + len {
                    // This offset already proved a run here; skip ahead to
                    // the part that still needs byte comparisons.
                    len = i - min[offset];
                    if len > best_len {
                        len = best_len;
                    }
                }
                if i < offset + len || input[i - len] != input[i - len - offset] {
                    break;
                }
                len += 1;
            }
            min[offset] = i + 1 - len;
            max[offset] = i;

            previous = Some(cursor);
            cursor = slots[cursor];
        }

        slots[i] = heads[index];
        heads[index] = i;
    }

    optimal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elias_gamma_bit_widths() {
        assert_eq!(elias_gamma_bits(1), 1);
        assert_eq!(elias_gamma_bits(2), 3);
        assert_eq!(elias_gamma_bits(3), 3);
        assert_eq!(elias_gamma_bits(4), 5);
        assert_eq!(elias_gamma_bits(255), 15);
        assert_eq!(elias_gamma_bits(65535), 31);
    }

    #[test]
    fn literal_only_input_costs_nine_bits_per_byte() {
        let optimal = optimize(&[1, 2, 3, 4]);
        assert_eq!(optimal[0].bits, 8);
        assert_eq!(optimal[1].bits, 17);
        assert_eq!(optimal[3].bits, 35);
        assert!(optimal.iter().all(|parse| parse.len == 0));
    }

    #[test]
    fn repeated_run_is_covered_by_one_copy() {
        let input = [7u8; 64];
        let optimal = optimize(&input);
        let last = optimal[input.len() - 1];
        assert_eq!(last.offset, 1);
        assert_eq!(last.len, 63);
        // 8 (first byte) + 1 + 8 + gamma(62) for one self-overlapping copy
        assert_eq!(last.bits, 8 + 1 + 8 + elias_gamma_bits(62));
    }

    #[test]
    fn prefix_costs_never_decrease() {
        let input: Vec<u8> = (0u32..512)
            .map(|i| (i * 17 % 7) as u8)
            .collect();
        let optimal = optimize(&input);
        for pair in optimal.windows(2) {
            assert!(pair[0].bits <= pair[1].bits);
        }
    }

    #[test]
    fn copy_cost_matches_offset_width() {
        // Offsets up to 128 take an 8-bit field, larger ones a 12-bit field.
        assert_eq!(copy_bits(128, 2), 1 + 8 + 3);
        assert_eq!(copy_bits(129, 2), 1 + 12 + 3);
    }
}
