//! Huffman code construction for BZip2.
//!
//! Code lengths come from a heap-driven Huffman merge. Each node weight
//! packs the frequency in its upper 24 bits and the subtree depth in the low
//! byte, so that ties between equal frequencies favour the shallower
//! subtree. If the resulting tree is deeper than allowed, all frequencies
//! are halved and the tree is rebuilt.

/// Largest alphabet: 256 MTF positions + RUNA/RUNB - 1 + end-of-block.
pub const MAX_ALPHA_SIZE: usize = 258;

/// Maximum code length the encoder emits.
pub const MAX_CODE_LEN: u8 = 20;

#[inline]
fn add_weights(a: u32, b: u32) -> u32 {
    let freq = (a & 0xFFFF_FF00) + (b & 0xFFFF_FF00);
    let depth = 1 + (a & 0xFF).max(b & 0xFF);
    freq | depth
}

#[inline]
fn upheap(heap: &mut [usize], weight: &[u32], mut z: usize) {
    let tmp = heap[z];
    while weight[tmp] < weight[heap[z >> 1]] {
        heap[z] = heap[z >> 1];
        z >>= 1;
    }
    heap[z] = tmp;
}

#[inline]
fn downheap(heap: &mut [usize], weight: &[u32], n_heap: usize, mut z: usize) {
    let tmp = heap[z];
    loop {
        let mut y = z << 1;
        if y > n_heap {
            break;
        }
        if y < n_heap && weight[heap[y + 1]] < weight[heap[y]] {
            y += 1;
        }
        if weight[tmp] < weight[heap[y]] {
            break;
        }
        heap[z] = heap[y];
        z = y;
    }
    heap[z] = tmp;
}

/// Compute code lengths for `freq[..alpha_size]` into `lengths`, none longer
/// than `max_len`. Zero frequencies are treated as one.
pub fn make_code_lengths(lengths: &mut [u8], freq: &[u32], alpha_size: usize, max_len: u8) {
    debug_assert!((2..=MAX_ALPHA_SIZE).contains(&alpha_size));

    // Node 0 is a sentinel at the top of the heap.
    let mut heap = [0usize; MAX_ALPHA_SIZE + 2];
    let mut weight = [0u32; MAX_ALPHA_SIZE * 2];
    let mut parent = [0i32; MAX_ALPHA_SIZE * 2];

    for i in 0..alpha_size {
        weight[i + 1] = freq[i].max(1) << 8;
    }

    loop {
        let mut n_nodes = alpha_size;
        let mut n_heap = 0;

        heap[0] = 0;
        weight[0] = 0;
        parent[0] = -2;

        for i in 1..=alpha_size {
            parent[i] = -1;
            n_heap += 1;
            heap[n_heap] = i;
            upheap(&mut heap, &weight, n_heap);
        }

        while n_heap > 1 {
            let n1 = heap[1];
            heap[1] = heap[n_heap];
            n_heap -= 1;
            downheap(&mut heap, &weight, n_heap, 1);

            let n2 = heap[1];
            heap[1] = heap[n_heap];
            n_heap -= 1;
            downheap(&mut heap, &weight, n_heap, 1);

            n_nodes += 1;
            parent[n1] = n_nodes as i32;
            parent[n2] = n_nodes as i32;
            weight[n_nodes] = add_weights(weight[n1], weight[n2]);
            parent[n_nodes] = -1;

            n_heap += 1;
            heap[n_heap] = n_nodes;
            upheap(&mut heap, &weight, n_heap);
        }

        let mut too_long = false;
        for i in 1..=alpha_size {
            let mut depth = 0usize;
            let mut k = i;
            while parent[k] >= 0 {
                k = parent[k] as usize;
                depth += 1;
            }
            lengths[i - 1] = depth.min(u8::MAX as usize) as u8;
            if depth > max_len as usize {
                too_long = true;
            }
        }

        if !too_long {
            break;
        }

        for w in &mut weight[1..=alpha_size] {
            let j = *w >> 8;
            *w = (1 + j / 2) << 8;
        }
    }
}

/// Assign canonical codes: shorter codes first, and within one length in
/// ascending symbol order.
pub fn assign_codes(lengths: &[u8], codes: &mut [u32]) {
    let max_len = lengths.iter().copied().max().unwrap_or(0) as usize;

    let mut counts = [0u32; 256];
    for &len in lengths {
        counts[len as usize] += 1;
    }

    let mut next_code = [0u32; 256];
    let mut code = 0u32;
    for len in 1..=max_len {
        next_code[len] = code;
        code = (code + counts[len]) << 1;
    }

    for (sym, &len) in lengths.iter().enumerate() {
        codes[sym] = next_code[len as usize];
        next_code[len as usize] += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lengths_for(freq: &[u32], max_len: u8) -> Vec<u8> {
        let mut lengths = vec![0u8; freq.len()];
        make_code_lengths(&mut lengths, freq, freq.len(), max_len);
        lengths
    }

    /// Kraft sum scaled by 2^max.
    fn kraft(lengths: &[u8]) -> u64 {
        let max = *lengths.iter().max().unwrap() as u32;
        lengths.iter().map(|&l| 1u64 << (max - l as u32)).sum()
    }

    #[test]
    fn test_two_symbols() {
        assert_eq!(lengths_for(&[5, 9], 20), vec![1, 1]);
    }

    #[test]
    fn test_skewed_lengths() {
        let lengths = lengths_for(&[100, 50, 25, 12, 6, 3], 20);
        assert_eq!(lengths, vec![1, 2, 3, 4, 5, 5]);
    }

    #[test]
    fn test_zero_frequencies_get_codes() {
        let lengths = lengths_for(&[0, 0, 1000, 0], 20);
        assert!(lengths.iter().all(|&l| l >= 1));
        let max = *lengths.iter().max().unwrap();
        assert_eq!(kraft(&lengths), 1u64 << max);
    }

    #[test]
    fn test_length_limit_enforced() {
        // Fibonacci frequencies build the deepest possible tree.
        let mut freq = vec![1u32, 1];
        while freq.len() < 30 {
            let n = freq.len();
            freq.push(freq[n - 1] + freq[n - 2]);
        }
        let unlimited = lengths_for(&freq, 255);
        assert!(*unlimited.iter().max().unwrap() > 20);

        let limited = lengths_for(&freq, 20);
        assert!(limited.iter().all(|&l| (1..=20).contains(&l)));
        let max = *limited.iter().max().unwrap();
        assert_eq!(kraft(&limited), 1u64 << max);

        let tight = lengths_for(&freq, 17);
        assert!(tight.iter().all(|&l| (1..=17).contains(&l)));
    }

    #[test]
    fn test_full_alphabet() {
        let freq: Vec<u32> = (0..MAX_ALPHA_SIZE as u32).map(|i| (i * 7919) % 1000).collect();
        let lengths = lengths_for(&freq, MAX_CODE_LEN);
        assert!(lengths.iter().all(|&l| (1..=MAX_CODE_LEN).contains(&l)));
        let max = *lengths.iter().max().unwrap();
        assert_eq!(kraft(&lengths), 1u64 << max);
    }

    #[test]
    fn test_canonical_codes() {
        let lengths = [2u8, 1, 3, 3];
        let mut codes = [0u32; 4];
        assert_codes(&lengths, &mut codes);
        assert_eq!(codes, [0b10, 0b0, 0b110, 0b111]);
    }

    #[test]
    fn test_codes_are_prefix_free() {
        let freq: Vec<u32> = (1..=30).map(|i| i * i).collect();
        let lengths = lengths_for(&freq, 20);
        let mut codes = vec![0u32; lengths.len()];
        assign_codes(&lengths, &mut codes);
        for a in 0..lengths.len() {
            for b in 0..lengths.len() {
                if a == b || lengths[a] > lengths[b] {
                    continue;
                }
                let prefix = codes[b] >> (lengths[b] - lengths[a]);
                assert!(prefix != codes[a], "code {} prefixes code {}", a, b);
            }
        }
    }

    fn assert_codes(lengths: &[u8], codes: &mut [u32]) {
        assign_codes(lengths, codes);
        for (&code, &len) in codes.iter().zip(lengths) {
            assert!(code < (1 << len));
        }
    }
}
