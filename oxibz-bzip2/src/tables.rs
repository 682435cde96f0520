//! Multi-table Huffman coding of the MTF/RLE2 stream.
//!
//! The symbol stream is cut into groups of [`G_SIZE`] symbols. Between two
//! and six code tables are seeded from contiguous slices of the alphabet and
//! then refined for [`N_ITERS`] passes: each group picks the table that codes
//! it cheapest, and each table is rebuilt from the groups that picked it.
//! The final choice per group (its selector) is sent move-to-front coded,
//! followed by the code lengths of every table and the coded symbols.

use crate::huffman::{MAX_ALPHA_SIZE, MAX_CODE_LEN, assign_codes, make_code_lengths};
use crate::workspace::CodingScratch;
use oxibz_core::bitstream::BitWriter;
use oxibz_core::error::Result;
use std::io::Write;

/// Maximum number of Huffman tables.
pub const N_GROUPS: usize = 6;

/// Symbols per selector group.
pub const G_SIZE: usize = 50;

/// Refinement passes over the table choice.
pub const N_ITERS: usize = 4;

/// Upper bound on selectors per block.
pub const MAX_SELECTORS: usize = 2 + 900_000 / G_SIZE;

/// Seed length for symbols inside a table's slice of the alphabet.
const LESSER_ICOST: u8 = 0;

/// Seed length for symbols outside a table's slice of the alphabet.
const GREATER_ICOST: u8 = 15;

/// Summary of one coded block, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodedBlock {
    /// Symbols in the MTF/RLE2 stream, end-of-block included.
    pub n_mtf: usize,
    /// Huffman tables sent.
    pub n_groups: usize,
    /// Selectors sent.
    pub n_selectors: usize,
}

/// Number of tables worth sending for a stream of `n_mtf` symbols.
pub fn group_count(n_mtf: usize) -> usize {
    match n_mtf {
        0..200 => 2,
        200..600 => 3,
        600..1200 => 4,
        1200..2400 => 5,
        _ => 6,
    }
}

/// Seed each table with cheap codes for one contiguous slice of the
/// alphabet, the slices holding roughly equal shares of the symbols.
fn seed_tables(coding: &mut CodingScratch, n_groups: usize, alpha_size: usize) {
    let freq = &coding.mtf_freq;
    let mut n_part = n_groups;
    let mut rem_f = coding.symbols.len() as u32;
    let mut gs = 0isize;

    while n_part > 0 {
        let t_freq = rem_f / n_part as u32;
        let mut ge = gs - 1;
        let mut a_freq = 0u32;
        while a_freq < t_freq && ge < alpha_size as isize - 1 {
            ge += 1;
            a_freq += freq[ge as usize];
        }

        if ge > gs && n_part != n_groups && n_part != 1 && (n_groups - n_part) % 2 == 1 {
            a_freq -= freq[ge as usize];
            ge -= 1;
        }

        let table = &mut coding.lengths[n_part - 1];
        for (v, len) in table[..alpha_size].iter_mut().enumerate() {
            let v = v as isize;
            *len = if v >= gs && v <= ge {
                LESSER_ICOST
            } else {
                GREATER_ICOST
            };
        }

        n_part -= 1;
        gs = ge + 1;
        rem_f -= a_freq;
    }
}

/// One refinement pass: choose a table per group, then rebuild the tables.
/// Returns the total cost of the stream under the tables it started with.
fn refine(coding: &mut CodingScratch, n_groups: usize, alpha_size: usize) -> u64 {
    let mut rfreq = [[0u32; MAX_ALPHA_SIZE]; N_GROUPS];
    let mut total = 0u64;
    coding.selectors.clear();

    for group in coding.symbols.chunks(G_SIZE) {
        let mut cost = [0u32; N_GROUPS];
        for &sym in group {
            for (t, c) in cost[..n_groups].iter_mut().enumerate() {
                *c += coding.lengths[t][sym as usize] as u32;
            }
        }

        // Lowest cost wins; the lower index wins ties.
        let mut best = 0;
        for t in 1..n_groups {
            if cost[t] < cost[best] {
                best = t;
            }
        }
        total += cost[best] as u64;

        coding.selectors.push(best as u8);
        for &sym in group {
            rfreq[best][sym as usize] += 1;
        }
    }

    for t in 0..n_groups {
        make_code_lengths(&mut coding.lengths[t], &rfreq[t], alpha_size, MAX_CODE_LEN);
    }
    total
}

/// Move-to-front code the selectors against the list `0..n_groups`.
fn encode_selectors(coding: &mut CodingScratch, n_groups: usize) {
    let mut order: [u8; N_GROUPS] = std::array::from_fn(|i| i as u8);
    coding.selector_mtf.clear();
    for &sel in &coding.selectors {
        let j = order[..n_groups]
            .iter()
            .position(|&s| s == sel)
            .expect("selector must name a table in use");
        order[..=j].rotate_right(1);
        coding.selector_mtf.push(j as u8);
    }
}

/// Choose tables for `coding.symbols`, then write table count, selectors,
/// code lengths and the coded symbols.
pub fn send_mtf_values<W: Write>(
    writer: &mut BitWriter<W>,
    coding: &mut CodingScratch,
    alpha_size: usize,
) -> Result<CodedBlock> {
    let n_mtf = coding.symbols.len();
    let n_groups = group_count(n_mtf);

    seed_tables(coding, n_groups, alpha_size);
    for pass in 0..N_ITERS {
        let cost = refine(coding, n_groups, alpha_size);
        log::trace!("table pass {}: {} groups, cost {} bits", pass, coding.selectors.len(), cost);
    }

    let n_selectors = coding.selectors.len();
    assert!(n_selectors <= MAX_SELECTORS, "selector count {} over limit", n_selectors);
    encode_selectors(coding, n_groups);

    for t in 0..n_groups {
        let lengths = &coding.lengths[t][..alpha_size];
        assert!(
            lengths.iter().all(|&l| (1..=MAX_CODE_LEN).contains(&l)),
            "code length out of range in table {}",
            t
        );
        assign_codes(lengths, &mut coding.codes[t][..alpha_size]);
    }

    writer.write_bits(n_groups as u32, 3)?;
    writer.write_bits(n_selectors as u32, 15)?;
    for &j in &coding.selector_mtf {
        // j ones, then a zero
        writer.write_bits(((1u32 << j) - 1) << 1, j + 1)?;
    }

    for lengths in &coding.lengths[..n_groups] {
        let mut curr = lengths[0];
        writer.write_bits(curr as u32, 5)?;
        for &len in &lengths[..alpha_size] {
            while curr < len {
                writer.write_bits(0b10, 2)?;
                curr += 1;
            }
            while curr > len {
                writer.write_bits(0b11, 2)?;
                curr -= 1;
            }
            writer.write_bit(false)?;
        }
    }

    for (group, &sel) in coding.symbols.chunks(G_SIZE).zip(&coding.selectors) {
        let t = sel as usize;
        for &sym in group {
            let sym = sym as usize;
            writer.write_bits(coding.codes[t][sym], coding.lengths[t][sym])?;
        }
    }

    Ok(CodedBlock {
        n_mtf,
        n_groups,
        n_selectors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::Workspace;

    /// Minimal MSB-first reader for checking emitted tables.
    struct Bits<'a> {
        data: &'a [u8],
        pos: usize,
    }

    impl Bits<'_> {
        fn bit(&mut self) -> u32 {
            let b = (self.data[self.pos / 8] >> (7 - self.pos % 8)) & 1;
            self.pos += 1;
            b as u32
        }

        fn bits(&mut self, n: u32) -> u32 {
            (0..n).fold(0, |acc, _| (acc << 1) | self.bit())
        }
    }

    fn load(symbols: &[u16], alpha_size: usize) -> Workspace {
        let mut ws = Workspace::new(100_000);
        ws.coding.symbols = symbols.to_vec();
        ws.coding.mtf_freq = [0; MAX_ALPHA_SIZE];
        for &s in symbols {
            ws.coding.mtf_freq[s as usize] += 1;
        }
        assert!(symbols.iter().all(|&s| (s as usize) < alpha_size));
        ws
    }

    fn sample_stream(len: usize, alpha_size: usize) -> Vec<u16> {
        let mut seed: u32 = 12345;
        let mut out: Vec<u16> = (0..len - 1)
            .map(|i| {
                seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
                // Skewed towards low symbols, with a shift halfway through.
                let r = (seed >> 16) % 100;
                let base = if i < len / 2 { 0 } else { 3 };
                ((base + r * r / 1500) as usize % (alpha_size - 1)) as u16
            })
            .collect();
        out.push(alpha_size as u16 - 1);
        out
    }

    #[test]
    fn test_group_count_thresholds() {
        assert_eq!(group_count(1), 2);
        assert_eq!(group_count(199), 2);
        assert_eq!(group_count(200), 3);
        assert_eq!(group_count(599), 3);
        assert_eq!(group_count(600), 4);
        assert_eq!(group_count(1199), 4);
        assert_eq!(group_count(1200), 5);
        assert_eq!(group_count(2399), 5);
        assert_eq!(group_count(2400), 6);
        assert_eq!(group_count(900_000), 6);
    }

    #[test]
    fn test_seed_partitions_alphabet() {
        let symbols: Vec<u16> = (0..10u16).flat_map(|s| std::iter::repeat_n(s, 100)).collect();
        let mut ws = load(&symbols, 10);
        seed_tables(&mut ws.coding, 6, 10);

        // Every symbol is cheap in exactly one table.
        for v in 0..10 {
            let cheap = (0..6)
                .filter(|&t| ws.coding.lengths[t][v] == LESSER_ICOST)
                .count();
            assert_eq!(cheap, 1, "symbol {}", v);
        }
        // The last table takes the lowest symbols.
        assert_eq!(ws.coding.lengths[5][0], LESSER_ICOST);
        assert_eq!(ws.coding.lengths[0][9], LESSER_ICOST);
    }

    #[test]
    fn test_refine_prefers_lowest_index_on_tie() {
        let symbols = vec![0u16; 120];
        let mut ws = load(&symbols, 3);
        ws.coding.lengths[0][..3].fill(4);
        ws.coding.lengths[1][..3].fill(4);
        refine(&mut ws.coding, 2, 3);
        assert_eq!(ws.coding.selectors, vec![0, 0, 0]);
    }

    #[test]
    fn test_emitted_layout_decodes() {
        let alpha_size = 12;
        let symbols = sample_stream(3000, alpha_size);
        let mut ws = load(&symbols, alpha_size);

        let mut writer = BitWriter::new(Vec::new());
        let coded = send_mtf_values(&mut writer, &mut ws.coding, alpha_size).unwrap();
        let out = writer.into_inner().unwrap();

        assert_eq!(coded.n_mtf, 3000);
        assert_eq!(coded.n_groups, 6);
        assert_eq!(coded.n_selectors, 60);

        let mut r = Bits { data: &out, pos: 0 };
        let n_groups = r.bits(3) as usize;
        let n_selectors = r.bits(15) as usize;
        assert_eq!((n_groups, n_selectors), (6, 60));

        let mut order: Vec<u8> = (0..n_groups as u8).collect();
        let mut selectors = Vec::new();
        for _ in 0..n_selectors {
            let mut j = 0;
            while r.bit() == 1 {
                j += 1;
            }
            let t = order.remove(j);
            order.insert(0, t);
            selectors.push(t);
        }
        assert_eq!(selectors, ws.coding.selectors);

        let mut tables = Vec::new();
        for _ in 0..n_groups {
            let mut curr = r.bits(5) as i32;
            let mut lengths = Vec::new();
            for _ in 0..alpha_size {
                while r.bit() == 1 {
                    curr += if r.bit() == 0 { 1 } else { -1 };
                }
                assert!((1..=20).contains(&curr));
                lengths.push(curr as u8);
            }
            tables.push(lengths);
        }
        for (t, lengths) in tables.iter().enumerate() {
            assert_eq!(lengths.as_slice(), &ws.coding.lengths[t][..alpha_size]);
        }

        let mut decoded = Vec::new();
        for &sel in &selectors {
            let lengths = &tables[sel as usize];
            let mut codes = vec![0u32; alpha_size];
            assign_codes(lengths, &mut codes);
            for _ in 0..G_SIZE {
                if decoded.len() == symbols.len() {
                    break;
                }
                let (mut code, mut len) = (0u32, 0u8);
                let sym = loop {
                    code = (code << 1) | r.bit();
                    len += 1;
                    if let Some(s) = (0..alpha_size).find(|&s| lengths[s] == len && codes[s] == code)
                    {
                        break s;
                    }
                };
                decoded.push(sym as u16);
            }
        }
        assert_eq!(decoded, symbols);
    }

    #[test]
    fn test_short_stream_uses_two_tables() {
        let symbols = vec![2u16, 0, 3, 1, 4];
        let mut ws = load(&symbols, 5);
        let mut writer = BitWriter::new(Vec::new());
        let coded = send_mtf_values(&mut writer, &mut ws.coding, 5).unwrap();
        assert_eq!(coded.n_groups, 2);
        assert_eq!(coded.n_selectors, 1);
        assert_eq!(ws.coding.selector_mtf, vec![ws.coding.selectors[0]]);
    }
}
