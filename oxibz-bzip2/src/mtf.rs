//! Move-to-Front transform with zero-run coding (RLE2).
//!
//! The last column of the sorted rotations is read in sorted order, each
//! byte is replaced by its position in a recency list of the byte values in
//! use, and that byte moves to the front. Runs of position 0 are written in
//! bijective base 2 with the two symbols RUNA and RUNB. Any other position
//! `p` becomes symbol `p + 1`, and the stream ends with the end-of-block
//! symbol `n_in_use + 1`.

use crate::block::Block;
use crate::workspace::CodingScratch;

/// Zero-run digit worth 1 at its position.
pub const RUNA: u16 = 0;

/// Zero-run digit worth 2 at its position.
pub const RUNB: u16 = 1;

/// Append the RUNA/RUNB digits for a run of `count` zeros, least
/// significant digit first.
fn push_zero_run(symbols: &mut Vec<u16>, freq: &mut [u32], count: u32) {
    let mut n = count;
    while n > 0 {
        let digit = if n & 1 == 1 { RUNA } else { RUNB };
        symbols.push(digit);
        freq[digit as usize] += 1;
        n = (n - 1) >> 1;
    }
}

/// Fill `coding.symbols` and `coding.mtf_freq` from the sorted block.
///
/// Returns the alphabet size, `n_in_use + 2`.
pub fn generate(block: &Block, fmap: &[u32], coding: &mut CodingScratch) -> usize {
    let mut unseq_to_seq = [0u8; 256];
    let mut n_in_use = 0usize;
    for (byte, _) in block.in_use.iter().enumerate().filter(|(_, used)| **used) {
        unseq_to_seq[byte] = n_in_use as u8;
        n_in_use += 1;
    }
    let eob = (n_in_use + 1) as u16;

    let symbols = &mut coding.symbols;
    let freq = &mut coding.mtf_freq;
    symbols.clear();
    freq.fill(0);

    let mut yy: [u8; 256] = std::array::from_fn(|i| i as u8);
    let mut zero_run = 0u32;

    for &pos in &fmap[..block.len()] {
        // Slot `pos` holds the byte preceding the rotation at `pos`.
        let ll = unseq_to_seq[block.data[pos as usize] as usize];

        let j = yy[..n_in_use]
            .iter()
            .position(|&s| s == ll)
            .expect("MTF: symbol must be in the in-use list");
        yy[..=j].rotate_right(1);

        if j == 0 {
            zero_run += 1;
        } else {
            push_zero_run(symbols, freq, zero_run);
            zero_run = 0;
            symbols.push(j as u16 + 1);
            freq[j + 1] += 1;
        }
    }

    push_zero_run(symbols, freq, zero_run);
    symbols.push(eob);
    freq[eob as usize] += 1;

    n_in_use + 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rle::Run;
    use crate::workspace::Workspace;

    fn zero_run(count: u32) -> Vec<u16> {
        let mut symbols = Vec::new();
        let mut freq = [0u32; 2];
        push_zero_run(&mut symbols, &mut freq, count);
        assert_eq!(freq[0] + freq[1], symbols.len() as u32);
        symbols
    }

    /// Run length recovered from RUNA/RUNB digits.
    fn run_value(digits: &[u16]) -> u32 {
        digits
            .iter()
            .enumerate()
            .map(|(i, &d)| (d as u32 + 1) << i)
            .sum()
    }

    #[test]
    fn test_zero_run_digits() {
        assert!(zero_run(0).is_empty());
        assert_eq!(zero_run(1), vec![RUNA]);
        assert_eq!(zero_run(2), vec![RUNB]);
        assert_eq!(zero_run(3), vec![RUNA, RUNA]);
        assert_eq!(zero_run(4), vec![RUNB, RUNA]);
        assert_eq!(zero_run(5), vec![RUNA, RUNB]);
        for count in 1..2000 {
            assert_eq!(run_value(&zero_run(count)), count);
        }
    }

    #[test]
    fn test_generate_from_sorted_block() {
        // "banana" sorted: abanan, anaban, ananab, banana, nabana, nanaba
        let mut block = Block::new(100_000);
        for &b in b"banana" {
            assert!(block.try_append(Run { byte: b, len: 1 }));
        }
        block.data[0] = b'a';
        let fmap = [5u32, 3, 1, 0, 4, 2];
        let mut ws = Workspace::new(100_000);

        let alpha_size = generate(&block, &fmap, &mut ws.coding);
        assert_eq!(alpha_size, 5);

        // Last column "nnbaaa" over in-use {a:0, b:1, n:2}:
        //   n -> 2, n -> 0, b -> 2, a -> 2, a -> 0, a -> 0
        assert_eq!(ws.coding.symbols, vec![3, RUNA, 3, 3, RUNB, 4]);
        assert_eq!(ws.coding.mtf_freq[..5], [1, 1, 0, 3, 1]);
    }

    #[test]
    fn test_generate_trailing_run_before_eob() {
        let mut block = Block::new(100_000);
        assert!(block.try_append(Run { byte: b'q', len: 3 }));
        block.data[0] = b'q';
        let fmap = [0u32, 1, 2];
        let mut ws = Workspace::new(100_000);

        let alpha_size = generate(&block, &fmap, &mut ws.coding);
        assert_eq!(alpha_size, 3);
        // Three zeros then end-of-block.
        assert_eq!(ws.coding.symbols, vec![RUNA, RUNA, 2]);
    }
}
