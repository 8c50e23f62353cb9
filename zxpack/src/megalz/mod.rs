//! The MegaLZ stream format (fyrex/lvd)
//!
//! MegaLZ packs into seven code shapes: a literal, fixed-length copies of
//! one to three bytes with progressively wider displacement fields, and a
//! variable length copy of up to [`MAX_LEN`] bytes. Displacements reach
//! back at most [`MAX_OFFSET`] bytes, which lets the depacker run inside a
//! small circular window instead of the whole output.
//!
//! Two parse strategies are available: an optimal parse that minimises the
//! exact bit cost over the whole input, and a classic greedy parse that
//! takes the best immediate gain at each position.

mod code;
mod decompress;
mod finder;

pub use code::{MAX_LEN, MAX_OFFSET};

use crate::{
    DecompressError,
    bitstream::BitWriter,
    megalz::{
        code::{LITERAL, LzCode, code_bits, emit, emit_end_marker},
        finder::Finder,
    },
};

/// Parse strategy for the MegaLZ packer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Minimise total bit cost with dynamic programming
    Optimal,
    /// Take the largest immediate gain at each position
    Greedy,
}

/// Compress `input` into a MegaLZ stream
pub fn compress(input: &[u8], parse: ParseMode) -> Vec<u8> {
    if input.is_empty() {
        return Vec::new();
    }

    let best = match parse {
        ParseMode::Optimal => optimal_parse(input),
        ParseMode::Greedy => greedy_parse(input),
    };

    let mut writer = BitWriter::with_capacity(input.len());
    writer.write_byte(input[0]);
    let mut pos = 1;
    while pos < input.len() {
        let code = best[pos];
        emit(code, input[pos], &mut writer);
        pos += code.length as usize;
    }
    emit_end_marker(&mut writer);
    writer.finish()
}

/// Choose, per position, the code that minimises total stream bits
///
/// `best[pos]` holds the code to emit at `pos` once the chain has been
/// re-threaded forwards.
fn optimal_parse(input: &[u8]) -> Vec<LzCode> {
    let size = input.len();
    let mut best = vec![LITERAL; size + 1];
    let mut price = vec![u32::MAX; size + 1];
    price[0] = 0;
    price[1] = 8;

    let mut finder = Finder::new(input);
    let mut codes = Vec::with_capacity(MAX_LEN);
    for pos in 1..size {
        finder.insert(input, pos);
        finder.candidates(input, pos, &mut codes);
        for &code in codes.iter().chain([&LITERAL]) {
            let Some(bits) = code_bits(code) else {
                continue;
            };
            let next = pos + code.length as usize;
            if price[next] > bits + price[pos] {
                price[next] = bits + price[pos];
                best[next] = code;
            }
        }
    }

    // best[] is keyed on where each code ends; re-thread the chain so it is
    // keyed on where each code starts.
    let mut end = size;
    let mut code = best[end];
    while end > 1 {
        let current = code;
        end -= current.length as usize;
        code = best[end];
        best[end] = current;
    }
    best
}

/// Classic MegaLZ parse: best gain now, ties to the shortest candidate
fn greedy_parse(input: &[u8]) -> Vec<LzCode> {
    let size = input.len();
    let mut best = vec![LITERAL; size];

    let mut finder = Finder::new(input);
    let mut codes = Vec::with_capacity(MAX_LEN);
    let mut skip = 0;
    for pos in 1..size {
        // The finder must see every position, including skipped ones.
        finder.insert(input, pos);
        if skip > 0 {
            skip -= 1;
            continue;
        }
        finder.candidates(input, pos, &mut codes);

        let mut best_gain = -2i32;
        let mut best_code = LITERAL;
        for &code in codes.iter().chain([&LITERAL]) {
            let Some(bits) = code_bits(code) else {
                continue;
            };
            let gain = 8 * code.length as i32 - bits as i32;
            if gain > best_gain {
                best_gain = gain;
                best_code = code;
            }
        }
        best[pos] = best_code;
        skip = best_code.length as usize - 1;
    }
    best
}

/// Decompress a MegaLZ stream
pub fn decompress(input: &[u8], capacity_hint: usize) -> Result<Vec<u8>, DecompressError> {
    if input.is_empty() {
        return Ok(Vec::new());
    }
    decompress::decompress_stream(input, capacity_hint)
}
