//! Match candidate search for MegaLZ
//!
//! Candidates are generated per position, one per length: the nearest
//! single-byte repeat within reach of the short code, then the chain of
//! two-byte pairs extended as far as the bytes keep matching. When an
//! extension fails the search falls back to older chain entries, using a
//! rolling hash over the last three bytes to skip full comparisons that
//! cannot succeed.

use super::code::{LzCode, MAX_LEN, MAX_OFFSET, SHORT_OFFSET};

const NO_POS: u32 = u32::MAX;

pub(super) struct Finder {
    /// Chain heads per two-byte pair, most recent position first
    heads: Vec<u32>,
    /// Next older chain position, indexed by position
    slots: Vec<u32>,
    /// Rolling hash of the three bytes ending at each position
    hash: Vec<u8>,
}

impl Finder {
    pub(super) fn new(input: &[u8]) -> Self {
        let mut hash = vec![0u8; input.len()];
        let mut previous = 0u8;
        let mut current = 0u8;
        for (i, &byte) in input.iter().enumerate() {
            let previous2 = previous.rotate_right(1);
            previous = current.rotate_right(1);
            current = byte;
            hash[i] = previous2 ^ previous ^ current;
        }
        Self {
            heads: vec![NO_POS; 65536],
            slots: vec![NO_POS; input.len()],
            hash,
        }
    }

    /// Record the pair starting at `pos - 1` once `pos` is reached
    pub(super) fn insert(&mut self, input: &[u8], pos: usize) {
        let pair = usize::from(input[pos - 1]) << 8 | usize::from(input[pos]);
        self.slots[pos - 1] = self.heads[pair];
        self.heads[pair] = (pos - 1) as u32;
    }

    /// Collect one candidate per achievable length at `pos`, shortest first
    pub(super) fn candidates(&mut self, input: &[u8], pos: usize, codes: &mut Vec<LzCode>) {
        codes.clear();

        // Nearest single byte within the three-bit displacement range.
        let start = pos.saturating_sub(8);
        for i in start..pos {
            if input[i] == input[pos] {
                codes.push(LzCode {
                    disp: i as i32 - pos as i32,
                    length: 1,
                });
                break;
            }
        }

        if pos + 1 >= input.len() {
            return;
        }
        let pair = usize::from(input[pos]) << 8 | usize::from(input[pos + 1]);
        let head = self.heads[pair];
        if head == NO_POS {
            return;
        }
        let head_pos = head as usize;
        if pos - head_pos > MAX_OFFSET {
            // The whole chain is out of reach; drop it.
            self.heads[pair] = NO_POS;
            return;
        }
        if pos - head_pos <= SHORT_OFFSET {
            codes.push(LzCode {
                disp: head_pos as i32 - pos as i32,
                length: 2,
            });
        }

        // Extend along the chain, one length at a time.
        let mut cursor = head_pos;
        let mut extending = true;
        let mut len = 3;
        while len <= MAX_LEN && pos + len <= input.len() {
            let matched = if extending {
                input[pos + len - 1] == input[cursor + len - 1]
            } else {
                self.hash[pos + len - 1] == self.hash[cursor + len - 1]
                    && input[pos..pos + len] == input[cursor..cursor + len]
            };
            if matched {
                codes.push(LzCode {
                    disp: cursor as i32 - pos as i32,
                    length: len as u32,
                });
                extending = true;
                len += 1;
            } else {
                let next = self.slots[cursor];
                if next == NO_POS {
                    break;
                }
                if pos - next as usize > MAX_OFFSET {
                    self.slots[cursor] = NO_POS;
                    break;
                }
                cursor = next as usize;
                extending = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_candidates(input: &[u8], pos: usize) -> Vec<LzCode> {
        let mut finder = Finder::new(input);
        for p in 1..=pos {
            finder.insert(input, p);
        }
        let mut codes = Vec::new();
        finder.candidates(input, pos, &mut codes);
        codes
    }

    #[test]
    fn finds_single_byte_repeat() {
        let codes = all_candidates(b"abcdefgha", 8);
        assert_eq!(codes, vec![LzCode { disp: -8, length: 1 }]);
    }

    #[test]
    fn single_byte_repeat_out_of_reach() {
        let codes = all_candidates(b"abcdefghia", 9);
        assert!(codes.is_empty());
    }

    #[test]
    fn extends_along_pair_chain() {
        let codes = all_candidates(b"abcabcab", 3);
        // "ab" one byte back is the byte repeat; the pair three back
        // extends to every remaining length.
        assert!(codes.contains(&LzCode { disp: -3, length: 2 }));
        assert!(codes.contains(&LzCode { disp: -3, length: 5 }));
        assert_eq!(codes.iter().map(|c| c.length).max(), Some(5));
    }

    #[test]
    fn one_candidate_per_length() {
        let input = b"xyxyxy-abab-xyxyxyxy";
        let codes = all_candidates(input, 12);
        let mut lengths: Vec<u32> = codes.iter().map(|c| c.length).collect();
        let before = lengths.len();
        lengths.dedup();
        assert_eq!(lengths.len(), before);
    }

    #[test]
    fn falls_back_to_older_chain_entry() {
        // The most recent "ab" is followed by 'x', the older one by 'c';
        // length 3 is only reachable through the older entry.
        let input = b"abc..abx..abc";
        let codes = all_candidates(input, 10);
        assert!(codes.contains(&LzCode { disp: -5, length: 2 }));
        assert!(codes.contains(&LzCode {
            disp: -10,
            length: 3
        }));
    }

    #[test]
    fn rolling_hash_tracks_last_three_bytes() {
        let finder = Finder::new(b"abcabc");
        assert_eq!(finder.hash[2], finder.hash[5]);
        assert_ne!(finder.hash[2], finder.hash[3]);
    }
}
