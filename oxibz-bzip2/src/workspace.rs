//! Scratch memory owned by an encoder for its whole lifetime.
//!
//! Buffers are grouped by the pipeline stage that uses them. The quadrant
//! array of the sort stage and the symbol buffer of the coding stage are
//! never live at the same time, so one allocation is handed back and forth
//! between them with [`Workspace::begin_coding`] / [`Workspace::end_coding`].

use crate::block::OVERSHOOT;
use crate::huffman::MAX_ALPHA_SIZE;
use crate::tables::{MAX_SELECTORS, N_GROUPS};

/// Number of two-byte radix buckets, plus one terminating slot.
pub const FTAB_LEN: usize = 65537;

/// One pending range of the ternary quicksort.
#[derive(Debug, Clone, Copy)]
pub struct SortFrame {
    pub lo: isize,
    pub hi: isize,
    pub depth: usize,
}

/// Buffers used by the Burrows-Wheeler sort.
#[derive(Debug)]
pub struct SortScratch {
    /// Sorted rotation start positions.
    pub fmap: Vec<u32>,
    /// Radix bucket boundaries, with the "sorted" flag in bit 21.
    pub ftab: Vec<u32>,
    /// Tie-break ranks per position, overshoot mirrored.
    pub quadrant: Vec<u16>,
    /// Explicit quicksort stack.
    pub stack: Vec<SortFrame>,
}

/// Buffers used by MTF/RLE2 and the Huffman stage.
#[derive(Debug)]
pub struct CodingScratch {
    /// MTF/RLE2 symbol stream. Empty while the sort owns the allocation.
    pub symbols: Vec<u16>,
    /// Symbol frequencies of the current block.
    pub mtf_freq: [u32; MAX_ALPHA_SIZE],
    /// Code lengths per table.
    pub lengths: [[u8; MAX_ALPHA_SIZE]; N_GROUPS],
    /// Canonical codes per table.
    pub codes: [[u32; MAX_ALPHA_SIZE]; N_GROUPS],
    /// Table chosen for each 50-symbol group.
    pub selectors: Vec<u8>,
    /// Selectors after move-to-front.
    pub selector_mtf: Vec<u8>,
}

/// Encoder-owned scratch memory.
#[derive(Debug)]
pub struct Workspace {
    pub sort: SortScratch,
    pub coding: CodingScratch,
}

/// Quicksort stack capacity reserved up front.
pub const QSORT_STACK_SIZE: usize = 1000;

impl Workspace {
    /// Allocate scratch memory for blocks of up to `block_size` bytes.
    pub fn new(block_size: usize) -> Self {
        Self {
            sort: SortScratch {
                fmap: vec![0; block_size],
                ftab: vec![0; FTAB_LEN],
                quadrant: vec![0; block_size + OVERSHOOT + 1],
                stack: Vec::with_capacity(QSORT_STACK_SIZE),
            },
            coding: CodingScratch {
                symbols: Vec::new(),
                mtf_freq: [0; MAX_ALPHA_SIZE],
                lengths: [[0; MAX_ALPHA_SIZE]; N_GROUPS],
                codes: [[0; MAX_ALPHA_SIZE]; N_GROUPS],
                selectors: Vec::with_capacity(MAX_SELECTORS),
                selector_mtf: Vec::with_capacity(MAX_SELECTORS),
            },
        }
    }

    /// Move the quadrant allocation over to the symbol buffer.
    pub fn begin_coding(&mut self) {
        std::mem::swap(&mut self.sort.quadrant, &mut self.coding.symbols);
        self.coding.symbols.clear();
    }

    /// Return the symbol allocation to the sort stage.
    ///
    /// The quadrant is re-zeroed by the sorter before every use, so only its
    /// length needs restoring.
    pub fn end_coding(&mut self) {
        std::mem::swap(&mut self.sort.quadrant, &mut self.coding.symbols);
        let len = self.sort.fmap.len() + OVERSHOOT + 1;
        self.sort.quadrant.resize(len, 0);
    }
}
