//! Compression for ZX Spectrum Next asset pipelines
//!
//! This crate packs raw asset data (screens, tiles, sprites, palettes) into
//! the three stream formats commonly depacked on the Z80: **ZX7**, **ZX0**
//! and **MegaLZ**. Each compressor produces the exact stream its reference
//! depacker expects, and each has a matching [`decompress`] for previewing
//! or verifying assets on the build machine.
//!
//! ZX7 and ZX0 also come in *backwards* variants for depackers that walk
//! down through memory, which lets data unpack in place at the end of a
//! memory bank.
//!
//! ```
//! use zxpack::{CodecMode, Direction, compress, decompress};
//!
//! let attributes = vec![0x47; 768];
//! let mode = CodecMode::Zx0(zxpack::zx0::OffsetLimit::Full, Direction::Forward);
//! let packed = compress(&attributes, mode);
//! assert!(packed.len() < attributes.len());
//! assert_eq!(decompress(&packed, mode, attributes.len())?, attributes);
//! # Ok::<(), zxpack::DecompressError>(())
//! ```

pub mod bitstream;
pub mod megalz;
pub mod zx0;
pub mod zx7;

use thiserror::Error;

/// Stream orientation for the ZX7 and ZX0 formats
///
/// A backwards stream is stored byte-reversed and meant to be depacked from
/// its last byte down through memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backwards,
}

/// Selects a stream format and its variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecMode {
    /// ZX7 in the given direction
    Zx7(Direction),
    /// ZX0 with the given offset window and direction
    Zx0(zx0::OffsetLimit, Direction),
    /// MegaLZ with the given parse strategy
    MegaLz(megalz::ParseMode),
}

/// An error decoding a compressed stream
///
/// Decoding fails fast: a stream that runs out mid-field or asks for bytes
/// before the start of the output is rejected rather than papered over.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecompressError {
    /// The stream ended in the middle of a code
    #[error("unexpected end of compressed stream")]
    UnexpectedEnd,
    /// A copy reached back before the start of the output
    #[error("copy offset {offset} exceeds output position {position}")]
    InvalidOffset { offset: usize, position: usize },
    /// A field held a value no encoder produces
    #[error("undecodable code in compressed stream")]
    InvalidCode,
}

/// Compress `input` with the chosen codec
///
/// Empty input compresses to an empty stream for every codec.
pub fn compress(input: &[u8], mode: CodecMode) -> Vec<u8> {
    match mode {
        CodecMode::Zx7(direction) => zx7::compress(input, direction),
        CodecMode::Zx0(limit, direction) => zx0::compress(input, limit, direction),
        CodecMode::MegaLz(parse) => megalz::compress(input, parse),
    }
}

/// Decompress a stream produced by [`compress`] with the same mode
///
/// `capacity_hint` pre-sizes the output buffer, typically to the known
/// unpacked size of the asset; it does not limit the decoded size.
pub fn decompress(
    input: &[u8],
    mode: CodecMode,
    capacity_hint: usize,
) -> Result<Vec<u8>, DecompressError> {
    match mode {
        CodecMode::Zx7(direction) => zx7::decompress(input, direction, capacity_hint),
        CodecMode::Zx0(_, direction) => zx0::decompress(input, direction, capacity_hint),
        CodecMode::MegaLz(_) => megalz::decompress(input, capacity_hint),
    }
}
