//! MSB-first bit output.
//!
//! bzip2 packs every field most-significant bit first: the first bit written
//! lands in bit 7 of the first output byte. [`BitWriter`] accumulates bits in
//! a 32-bit register, moves completed bytes into a staging buffer and hands
//! the staging buffer to the underlying writer in large chunks.
//!
//! ## Example
//!
//! ```rust
//! use oxibz_core::bitstream::BitWriter;
//!
//! let mut writer = BitWriter::new(Vec::new());
//! writer.write_bits(0b101, 3).unwrap();
//! writer.write_bits(0b11111, 5).unwrap();
//! writer.write_bit(true).unwrap();
//! let out = writer.into_inner().unwrap();
//! assert_eq!(out, vec![0b1011_1111, 0b1000_0000]);
//! ```

use crate::error::{OxiBzError, Result};
use std::io::Write;

/// Largest number of bits accepted by a single [`BitWriter::write_bits`] call.
pub const MAX_BITS_PER_CALL: u8 = 24;

/// Staged bytes are handed to the sink once this many have accumulated.
const STAGE_CAPACITY: usize = 4096;

/// A bit-level writer that emits bits MSB-first into any `Write`.
///
/// Completed bytes are staged internally; call [`flush_remaining`] at the end
/// of a stream to pad the final byte with zero bits and push everything to
/// the sink.
///
/// [`flush_remaining`]: BitWriter::flush_remaining
#[derive(Debug)]
pub struct BitWriter<W: Write> {
    /// Underlying writer.
    writer: W,
    /// Bit register, filled from bit 31 downwards.
    buffer: u32,
    /// Number of valid bits at the top of `buffer`.
    live: u8,
    /// Completed bytes not yet handed to `writer`.
    staged: Vec<u8>,
    /// Total bytes completed (staged or written).
    total_bytes: u64,
}

impl<W: Write> BitWriter<W> {
    /// Create a new `BitWriter` wrapping the given writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer: 0,
            live: 0,
            staged: Vec::with_capacity(STAGE_CAPACITY),
            total_bytes: 0,
        }
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Get a mutable reference to the underlying writer.
    ///
    /// Bytes still staged inside the `BitWriter` are not visible through it
    /// until the next drain.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consume this `BitWriter`, flushing any partial byte, and return the
    /// underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush_remaining()?;
        Ok(self.writer)
    }

    /// Total number of complete bytes produced so far.
    pub fn bytes_written(&self) -> u64 {
        self.total_bytes
    }

    /// Number of bits waiting for a byte boundary.
    pub fn pending_bits(&self) -> u8 {
        self.live
    }

    #[inline]
    fn emit_bytes(&mut self) -> Result<()> {
        while self.live >= 8 {
            self.staged.push((self.buffer >> 24) as u8);
            self.buffer <<= 8;
            self.live -= 8;
            self.total_bytes += 1;
        }
        if self.staged.len() >= STAGE_CAPACITY {
            self.drain()?;
        }
        Ok(())
    }

    fn drain(&mut self) -> Result<()> {
        if !self.staged.is_empty() {
            self.writer.write_all(&self.staged)?;
            self.staged.clear();
        }
        Ok(())
    }

    /// Write the low `count` bits of `value`, most significant first.
    ///
    /// `count` may be 0 (a no-op) up to [`MAX_BITS_PER_CALL`].
    #[inline]
    pub fn write_bits(&mut self, value: u32, count: u8) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        if count > MAX_BITS_PER_CALL {
            return Err(OxiBzError::invalid_bit_count(count, MAX_BITS_PER_CALL));
        }

        let value = value & ((1u32 << count) - 1);
        self.buffer |= value << (32 - self.live - count);
        self.live += count;

        self.emit_bytes()
    }

    /// Write a single bit.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.write_bits(bit as u32, 1)
    }

    /// Write a full byte.
    #[inline]
    pub fn write_u8(&mut self, byte: u8) -> Result<()> {
        self.write_bits(byte as u32, 8)
    }

    /// Write a 32-bit value big-endian, as four 8-bit writes.
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        for byte in value.to_be_bytes() {
            self.write_u8(byte)?;
        }
        Ok(())
    }

    /// Write a byte slice at the current bit position.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            self.write_u8(byte)?;
        }
        Ok(())
    }

    /// Pad the final partial byte with zero bits and hand every staged byte
    /// to the underlying writer.
    pub fn flush_remaining(&mut self) -> Result<()> {
        if self.live > 0 {
            self.live = 8;
            self.emit_bytes()?;
            self.buffer = 0;
        }
        self.drain()
    }

    /// Hand staged bytes to the underlying writer and flush it.
    ///
    /// A partial byte stays in the register.
    pub fn flush(&mut self) -> Result<()> {
        self.drain()?;
        self.writer.flush()?;
        Ok(())
    }
}
