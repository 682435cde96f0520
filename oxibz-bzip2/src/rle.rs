//! Initial run-length encoding (RLE1).
//!
//! Input bytes are grouped into runs of at most 255 equal bytes. A run of
//! 1..=3 is stored as literals; a run of 4..=255 is stored as 4 literals
//! followed by a count byte holding the remaining repeats (0..=251).
//!
//! Runs are collected incrementally so that input can arrive one byte or one
//! slice at a time and block boundaries never split a run.

/// Longest run collapsed into a single RLE1 record.
pub const MAX_RUN: u8 = 255;

/// A completed run of identical bytes, 1..=255 long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    /// The repeated byte.
    pub byte: u8,
    /// Number of repeats.
    pub len: u8,
}

impl Run {
    /// Number of bytes this run occupies in the block buffer.
    #[inline]
    pub fn encoded_len(&self) -> usize {
        if self.len < 4 { self.len as usize } else { 5 }
    }

    /// Write the RLE1 form of this run into `out`, which must hold at least
    /// [`encoded_len`](Self::encoded_len) bytes.
    #[inline]
    pub fn encode_into(&self, out: &mut [u8]) {
        if self.len < 4 {
            out[..self.len as usize].fill(self.byte);
        } else {
            out[..4].fill(self.byte);
            out[4] = self.len - 4;
        }
    }
}

/// Streaming collector that turns input bytes into [`Run`]s.
#[derive(Debug, Default)]
pub struct RunCollector {
    current: Option<u8>,
    len: u8,
}

impl RunCollector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns a run when the byte completes one.
    #[inline]
    pub fn push(&mut self, byte: u8) -> Option<Run> {
        match self.current {
            Some(current) if current == byte => {
                self.len += 1;
                if self.len == MAX_RUN {
                    self.current = None;
                    self.len = 0;
                    Some(Run {
                        byte,
                        len: MAX_RUN,
                    })
                } else {
                    None
                }
            }
            Some(current) => {
                let run = Run {
                    byte: current,
                    len: self.len,
                };
                self.current = Some(byte);
                self.len = 1;
                Some(run)
            }
            None => {
                self.current = Some(byte);
                self.len = 1;
                None
            }
        }
    }

    /// Take the pending partial run, if any.
    pub fn take(&mut self) -> Option<Run> {
        let byte = self.current.take()?;
        let len = std::mem::take(&mut self.len);
        Some(Run { byte, len })
    }
}

/// Decode RLE1 data back to raw bytes.
#[cfg(test)]
pub fn rle1_decode(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len() * 2);
    let mut i = 0;
    let mut last: Option<u8> = None;
    let mut repeats = 0;

    while i < data.len() {
        let byte = data[i];
        i += 1;
        result.push(byte);

        if last == Some(byte) {
            repeats += 1;
        } else {
            last = Some(byte);
            repeats = 1;
        }

        if repeats == 4 {
            let count = data[i] as usize;
            i += 1;
            result.extend(std::iter::repeat_n(byte, count));
            last = None;
            repeats = 0;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(data: &[u8]) -> Vec<Run> {
        let mut collector = RunCollector::new();
        let mut runs: Vec<Run> = data.iter().filter_map(|&b| collector.push(b)).collect();
        runs.extend(collector.take());
        runs
    }

    fn encode(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for run in collect(data) {
            let start = out.len();
            out.resize(start + run.encoded_len(), 0);
            run.encode_into(&mut out[start..]);
        }
        out
    }

    #[test]
    fn test_rle1_no_runs() {
        let data = b"abcdef";
        assert_eq!(encode(data), data.as_slice());
        assert_eq!(rle1_decode(data), data.as_slice());
    }

    #[test]
    fn test_rle1_short_runs() {
        let encoded = encode(b"aabbbcccc");
        // "aa" and "bbb" stay literal, "cccc" gains a zero count byte
        assert_eq!(&encoded[..5], b"aabbb");
        assert_eq!(&encoded[5..], &[b'c', b'c', b'c', b'c', 0]);
    }

    #[test]
    fn test_run_boundaries() {
        for len in [1usize, 3, 4, 5, 254, 255, 256, 259, 510, 511, 1000] {
            let data = vec![0x41u8; len];
            let runs = collect(&data);
            assert!(runs.iter().all(|r| r.len >= 1));
            assert_eq!(runs.iter().map(|r| r.len as usize).sum::<usize>(), len);
            assert_eq!(rle1_decode(&encode(&data)), data, "run of {}", len);
        }
    }

    #[test]
    fn test_max_run_flushes_immediately() {
        let mut collector = RunCollector::new();
        for _ in 0..254 {
            assert!(collector.push(7).is_none());
        }
        assert_eq!(collector.push(7), Some(Run { byte: 7, len: 255 }));
        assert!(collector.push(7).is_none());
        assert_eq!(collector.take(), Some(Run { byte: 7, len: 1 }));
        assert_eq!(collector.take(), None);
    }

    #[test]
    fn test_count_byte_range() {
        let runs = collect(&[9u8; 255]);
        assert_eq!(runs.len(), 1);
        let mut buf = [0u8; 5];
        runs[0].encode_into(&mut buf);
        assert_eq!(buf, [9, 9, 9, 9, 251]);
    }

    #[test]
    fn test_rle1_roundtrip_mixed() {
        let mut data = b"aaaaaabbbbbbbbccccccccccc".to_vec();
        data.extend(std::iter::repeat_n(0u8, 700));
        data.extend(b"xyzzy");
        assert_eq!(rle1_decode(&encode(&data)), data);
    }
}
