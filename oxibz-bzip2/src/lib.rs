//! bzip2-compatible block-sorting compression for OxiBz.
//!
//! This crate provides a pure Rust encoder whose output is bit-exact with the
//! reference bzip2 format and decodes with any standard `bunzip2`.
//!
//! The pipeline for each block:
//! 1. Run-Length Encoding (RLE1) - runs of 4..=255 equal bytes become 4
//!    literals plus a count byte
//! 2. Burrows-Wheeler Transform - radix + ternary quicksort of all rotations,
//!    falling back to a randomised block on pathological input
//! 3. Move-to-Front Transform with zero-run coding (RUNA/RUNB)
//! 4. Huffman Coding - up to 6 tables, chosen per 50-symbol group
//!
//! ## Example
//!
//! ```rust
//! use oxibz_bzip2::{BzEncoder, CompressionLevel};
//! use std::io::Write;
//!
//! let mut encoder = BzEncoder::new(Vec::new(), CompressionLevel::FAST);
//! encoder.write_all(b"hello world").unwrap();
//! let compressed = encoder.close().unwrap();
//! assert_eq!(&compressed[..4], b"BZh1");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod block;
mod compressor;
mod encode;
mod huffman;
mod mtf;
mod rle;
mod sort;
mod tables;
mod workspace;

pub use compressor::Bzip2Compressor;
pub use encode::{BzEncoder, EncoderStats, compress};

use oxibz_core::error::{OxiBzError, Result};

/// BZip2 magic bytes ("BZ").
pub const BZIP2_MAGIC: [u8; 2] = [0x42, 0x5A];

/// Format marker following the magic ('h' for Huffman coding).
pub const HUFFMAN_MARKER: u8 = b'h';

/// Block header magic bytes (0x314159265359).
pub const BLOCK_MAGIC: [u8; 6] = [0x31, 0x41, 0x59, 0x26, 0x53, 0x59];

/// End of stream magic bytes (0x177245385090).
pub const EOS_MAGIC: [u8; 6] = [0x17, 0x72, 0x45, 0x38, 0x50, 0x90];

/// Maximum block size (900k).
pub const MAX_BLOCK_SIZE: usize = 900_000;

/// Block-size level (1-9, where 9 = 900k block size).
///
/// The level is the only tuning knob of the format: it sets the block
/// capacity, and with it memory use and the context available to the sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    /// Smallest blocks (100k), least memory.
    pub const FAST: Self = Self(1);

    /// Largest blocks (900k), best compression.
    pub const BEST: Self = Self(9);

    /// Create a compression level, rejecting values outside 1-9.
    pub fn new(level: u8) -> Result<Self> {
        if !(1..=9).contains(&level) {
            return Err(OxiBzError::invalid_config(
                "compression level",
                format!("must be between 1 and 9, got {}", level),
            ));
        }
        Ok(Self(level))
    }

    /// Get the block size for this level.
    pub fn block_size(&self) -> usize {
        self.0 as usize * 100_000
    }

    /// Get the level value.
    pub fn level(&self) -> u8 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::BEST
    }
}

impl TryFrom<u8> for CompressionLevel {
    type Error = OxiBzError;

    fn try_from(level: u8) -> Result<Self> {
        Self::new(level)
    }
}
