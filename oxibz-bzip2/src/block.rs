//! Block assembly and framing.
//!
//! A [`Block`] collects RLE1-coded runs until it reaches its allowable size.
//! The [`BlockFramer`] owns the block and the scratch workspace, and turns a
//! full block into its on-the-wire form: block header, symbol map, Huffman
//! tables, selectors and coded body. It also writes the per-member header
//! byte pair and the end-of-stream trailer.

use crate::rle::Run;
use crate::workspace::Workspace;
use crate::{BLOCK_MAGIC, CompressionLevel, EOS_MAGIC, HUFFMAN_MARKER, mtf, sort, tables};
use oxibz_core::bitstream::BitWriter;
use oxibz_core::crc::BzCrc32;
use oxibz_core::error::Result;
use std::io::Write;

/// Bytes mirrored past the end of the block for cyclic comparisons.
pub const OVERSHOOT: usize = 20;

/// One block of RLE1 output awaiting the sort.
#[derive(Debug)]
pub struct Block {
    /// 1-based storage; `data[i + 1]` is byte `i`. Slot 0 and the
    /// overshoot tail are filled in by the sorter.
    pub data: Vec<u8>,
    len: usize,
    /// Which byte values occur in the block.
    pub in_use: [bool; 256],
    crc: BzCrc32,
    allowable: usize,
    /// Whether the sort had to perturb the block.
    pub randomised: bool,
}

impl Block {
    /// Create an empty block for the given capacity.
    pub fn new(block_size: usize) -> Self {
        Self {
            data: vec![0; block_size + 1 + OVERSHOOT],
            len: 0,
            in_use: [false; 256],
            crc: BzCrc32::new(),
            allowable: block_size - OVERSHOOT,
            randomised: false,
        }
    }

    /// Clear the block for reuse.
    pub fn reset(&mut self) {
        self.len = 0;
        self.in_use = [false; 256];
        self.crc.reset();
        self.randomised = false;
    }

    /// Number of RLE1 bytes held.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the block holds no data.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// CRC of the raw bytes represented by the block.
    pub fn crc(&self) -> u32 {
        self.crc.value()
    }

    /// Append a run unless the block has reached its allowable size.
    pub fn try_append(&mut self, run: Run) -> bool {
        if self.len > self.allowable {
            return false;
        }

        self.crc.update_run(run.byte, run.len as usize);
        self.in_use[run.byte as usize] = true;
        if run.len >= 4 {
            self.in_use[(run.len - 4) as usize] = true;
        }

        let start = self.len + 1;
        let encoded = run.encoded_len();
        run.encode_into(&mut self.data[start..start + encoded]);
        self.len += encoded;
        true
    }
}

/// Drives blocks through sort, MTF and Huffman coding into a [`BitWriter`].
#[derive(Debug)]
pub struct BlockFramer {
    level: CompressionLevel,
    block: Block,
    workspace: Workspace,
    combined_crc: u32,
    blocks_written: u64,
    blocks_randomised: u64,
}

impl BlockFramer {
    /// Allocate a block and workspace sized for `level`.
    pub fn new(level: CompressionLevel) -> Self {
        let block_size = level.block_size();
        Self {
            level,
            block: Block::new(block_size),
            workspace: Workspace::new(block_size),
            combined_crc: 0,
            blocks_written: 0,
            blocks_randomised: 0,
        }
    }

    /// Blocks framed so far.
    pub fn blocks_written(&self) -> u64 {
        self.blocks_written
    }

    /// Blocks that needed the randomised sort.
    pub fn blocks_randomised(&self) -> u64 {
        self.blocks_randomised
    }

    /// Begin a member: format marker and level digit, fresh CRC state.
    pub fn start<W: Write>(&mut self, writer: &mut BitWriter<W>) -> Result<()> {
        self.combined_crc = 0;
        self.block.reset();
        writer.write_u8(HUFFMAN_MARKER)?;
        writer.write_u8(b'0' + self.level.level())
    }

    /// Append a run, framing the current block first if it is full.
    pub fn push_run<W: Write>(&mut self, run: Run, writer: &mut BitWriter<W>) -> Result<()> {
        while !self.block.try_append(run) {
            self.end_block(writer)?;
        }
        Ok(())
    }

    /// Frame the current block, if it holds anything, and start a new one.
    pub fn end_block<W: Write>(&mut self, writer: &mut BitWriter<W>) -> Result<()> {
        if self.block.is_empty() {
            return Ok(());
        }

        let block_crc = self.block.crc();
        self.combined_crc = BzCrc32::combine(self.combined_crc, block_crc);

        let orig_ptr = sort::sort_block(&mut self.block, &mut self.workspace.sort);

        writer.write_bytes(&BLOCK_MAGIC)?;
        writer.write_u32(block_crc)?;
        writer.write_bit(self.block.randomised)?;
        writer.write_bits(orig_ptr, 24)?;

        self.workspace.begin_coding();
        let coded = self.write_coded(writer);
        self.workspace.end_coding();
        let coded = coded?;

        self.blocks_written += 1;
        if self.block.randomised {
            self.blocks_randomised += 1;
        }

        log::debug!(
            "block {}: {} bytes, crc {:08x}, orig_ptr {}, randomised {}, {} symbols, {} tables, {} selectors",
            self.blocks_written,
            self.block.len(),
            block_crc,
            orig_ptr,
            self.block.randomised,
            coded.n_mtf,
            coded.n_groups,
            coded.n_selectors
        );

        self.block.reset();
        Ok(())
    }

    fn write_coded<W: Write>(&mut self, writer: &mut BitWriter<W>) -> Result<tables::CodedBlock> {
        let alpha_size = mtf::generate(
            &self.block,
            &self.workspace.sort.fmap,
            &mut self.workspace.coding,
        );
        write_symbol_map(writer, &self.block.in_use)?;
        tables::send_mtf_values(writer, &mut self.workspace.coding, alpha_size)
    }

    /// Write the end-of-stream magic and combined CRC, then pad to a byte.
    pub fn end_stream<W: Write>(&mut self, writer: &mut BitWriter<W>) -> Result<()> {
        writer.write_bytes(&EOS_MAGIC)?;
        writer.write_u32(self.combined_crc)?;
        log::trace!("stream trailer, combined crc {:08x}", self.combined_crc);
        writer.flush_remaining()
    }
}

/// Two-level bitmap of used byte values: 16 range bits, then 16 bits for
/// each range that has any byte in use.
fn write_symbol_map<W: Write>(writer: &mut BitWriter<W>, in_use: &[bool; 256]) -> Result<()> {
    let ranges: Vec<&[bool]> = in_use.chunks(16).collect();

    let mut summary = 0u32;
    for range in &ranges {
        summary = (summary << 1) | range.contains(&true) as u32;
    }
    writer.write_bits(summary, 16)?;

    for range in ranges.iter().filter(|r| r.contains(&true)) {
        let bits = range.iter().fold(0u32, |acc, &used| (acc << 1) | used as u32);
        writer.write_bits(bits, 16)?;
    }
    Ok(())
}
