//! Burrows-Wheeler block sorting.
//!
//! Rotations are bucketed by their first two bytes with a radix pass, then
//! each two-byte bucket is sorted with a ternary quicksort on the byte at a
//! growing depth. Short or deep ranges fall back to a shell sort that
//! compares whole rotations, using the quadrant array to stop long equal
//! comparisons early. Once a big bucket (one leading byte) is sorted, its
//! order is used to place rotations that start one byte earlier without
//! comparing them at all.
//!
//! Comparison effort is bounded to `WORK_FACTOR * last`. A block that blows
//! the budget is highly repetitive; it is perturbed with a fixed
//! pseudo-random sequence (the decoder undoes this) and sorted again without
//! a bound.
//!
//! The block uses 1-based storage: `data[i + 1]` is byte `i`, `data[0]` holds
//! the final byte and the `OVERSHOOT` bytes after the end repeat the start,
//! so that short cyclic comparisons never need a modulo.

use crate::block::{Block, OVERSHOOT};
use crate::workspace::{SortFrame, SortScratch};

/// Comparison budget per block byte before the block is randomised.
pub const WORK_FACTOR: u64 = 30;

/// Ranges shorter than this are shell sorted.
const SMALL_THRESH: isize = 20;

/// Quicksort depth beyond which ranges are shell sorted.
const DEPTH_THRESH: usize = 10;

/// Marks an `ftab` bucket as fully sorted.
const SETMASK: u32 = 1 << 21;
const CLEARMASK: u32 = !SETMASK;

/// Knuth's increments, `h = 3h + 1`.
const INCS: [usize; 14] = [
    1, 4, 13, 40, 121, 364, 1093, 3280, 9841, 29524, 88573, 265720, 797161, 2391484,
];

/// Sort the rotations of `block` into `scratch.fmap[..=last]` and return the
/// origin pointer. Sets `block.randomised` when the fallback was taken.
pub fn sort_block(block: &mut Block, scratch: &mut SortScratch) -> u32 {
    let last = block.len() - 1;
    let work_limit = WORK_FACTOR * last as u64;

    prepare(block, &mut scratch.quadrant, last);
    let work_done = Sorter::new(&block.data, scratch, last, Some(work_limit)).run();

    if work_done > work_limit {
        log::debug!(
            "sort budget exceeded ({} > {}), randomising block of {} bytes",
            work_done,
            work_limit,
            last + 1
        );
        randomise(block);
        prepare(block, &mut scratch.quadrant, last);
        Sorter::new(&block.data, scratch, last, None).run();
        block.randomised = true;
    }

    let orig_ptr = scratch.fmap[..=last]
        .iter()
        .position(|&p| p == 0)
        .expect("sorted rotations must include rotation zero");
    orig_ptr as u32
}

/// Mirror the block head into the overshoot area and clear the quadrant.
fn prepare(block: &mut Block, quadrant: &mut [u16], last: usize) {
    let data = &mut block.data;
    for i in 0..OVERSHOOT {
        data[last + i + 2] = data[(i % (last + 1)) + 1];
    }
    data[0] = data[last + 1];
    quadrant[..=last + OVERSHOOT].fill(0);
}

/// Flip the low bit of bytes picked by the randomisation table and
/// recompute the byte-presence flags.
fn randomise(block: &mut Block) {
    let mut countdown = 0u32;
    let mut table_pos = 0usize;
    block.in_use = [false; 256];

    for i in 0..block.len() {
        if countdown == 0 {
            countdown = RNUMS[table_pos] as u32;
            table_pos = (table_pos + 1) % RNUMS.len();
        }
        countdown -= 1;
        if countdown == 1 {
            block.data[i + 1] ^= 1;
        }
        block.in_use[block.data[i + 1] as usize] = true;
    }
}

struct Sorter<'a> {
    block: &'a [u8],
    fmap: &'a mut [u32],
    ftab: &'a mut [u32],
    quadrant: &'a mut [u16],
    stack: &'a mut Vec<SortFrame>,
    last: usize,
    work_done: u64,
    work_limit: Option<u64>,
}

impl<'a> Sorter<'a> {
    fn new(
        block: &'a [u8],
        scratch: &'a mut SortScratch,
        last: usize,
        work_limit: Option<u64>,
    ) -> Self {
        Self {
            block,
            fmap: &mut scratch.fmap,
            ftab: &mut scratch.ftab,
            quadrant: &mut scratch.quadrant,
            stack: &mut scratch.stack,
            last,
            work_done: 0,
            work_limit,
        }
    }

    /// Sort, returning the work spent. Stops early once over budget.
    fn run(mut self) -> u64 {
        self.main_sort();
        self.work_done
    }

    #[inline]
    fn over_budget(&self) -> bool {
        self.work_limit.is_some_and(|limit| self.work_done > limit)
    }

    /// Byte at offset `depth` of the rotation stored at `fmap[pos]`.
    #[inline]
    fn key(&self, pos: isize, depth: usize) -> i32 {
        self.block[self.fmap[pos as usize] as usize + depth + 1] as i32
    }

    /// Whether the rotation starting at `i1` sorts after the one at `i2`.
    fn full_gt_u(&mut self, mut i1: usize, mut i2: usize) -> bool {
        let block = self.block;

        for _ in 0..6 {
            let (c1, c2) = (block[i1 + 1], block[i2 + 1]);
            if c1 != c2 {
                return c1 > c2;
            }
            i1 += 1;
            i2 += 1;
        }

        let wrap = self.last + 1;
        let mut remaining = self.last as isize;
        while remaining > 0 {
            for _ in 0..4 {
                let (c1, c2) = (block[i1 + 1], block[i2 + 1]);
                if c1 != c2 {
                    return c1 > c2;
                }
                let (s1, s2) = (self.quadrant[i1], self.quadrant[i2]);
                if s1 != s2 {
                    return s1 > s2;
                }
                i1 += 1;
                i2 += 1;
            }

            if i1 > self.last {
                i1 -= wrap;
            }
            if i2 > self.last {
                i2 -= wrap;
            }

            remaining -= 4;
            self.work_done += 1;
        }
        false
    }

    /// Shell sort `fmap[lo..=hi]` comparing whole rotations from `depth`.
    fn simple_sort(&mut self, lo: isize, hi: isize, depth: usize) {
        if hi - lo + 1 < 2 {
            return;
        }
        let (lo, hi) = (lo as usize, hi as usize);
        let big_n = hi - lo + 1;
        let top = INCS.iter().position(|&h| h >= big_n).unwrap_or(INCS.len());

        for &h in INCS[..top].iter().rev() {
            for i in lo + h..=hi {
                let v = self.fmap[i];
                let mut j = i;
                while self.full_gt_u(self.fmap[j - h] as usize + depth, v as usize + depth) {
                    self.fmap[j] = self.fmap[j - h];
                    j -= h;
                    if j < lo + h {
                        break;
                    }
                }
                self.fmap[j] = v;
                if self.over_budget() {
                    return;
                }
            }
        }
    }

    fn vswap(&mut self, p1: isize, p2: isize, n: isize) {
        for i in 0..n {
            self.fmap.swap((p1 + i) as usize, (p2 + i) as usize);
        }
    }

    /// Ternary-partition quicksort of `fmap[lo..=hi]` on the byte at `depth`.
    fn qsort3(&mut self, lo: usize, hi: usize, depth: usize) {
        self.stack.clear();
        self.stack.push(SortFrame {
            lo: lo as isize,
            hi: hi as isize,
            depth,
        });

        while let Some(SortFrame { lo, hi, depth: d }) = self.stack.pop() {
            if hi - lo < SMALL_THRESH || d > DEPTH_THRESH {
                self.simple_sort(lo, hi, d);
                if self.over_budget() {
                    return;
                }
                continue;
            }

            let med = med3(self.key(lo, d), self.key(hi, d), self.key((lo + hi) >> 1, d));

            let (mut un_lo, mut lt_lo) = (lo, lo);
            let (mut un_hi, mut gt_hi) = (hi, hi);

            loop {
                while un_lo <= un_hi {
                    let n = self.key(un_lo, d) - med;
                    if n == 0 {
                        self.fmap.swap(un_lo as usize, lt_lo as usize);
                        lt_lo += 1;
                        un_lo += 1;
                        continue;
                    }
                    if n > 0 {
                        break;
                    }
                    un_lo += 1;
                }
                while un_lo <= un_hi {
                    let n = self.key(un_hi, d) - med;
                    if n == 0 {
                        self.fmap.swap(un_hi as usize, gt_hi as usize);
                        gt_hi -= 1;
                        un_hi -= 1;
                        continue;
                    }
                    if n < 0 {
                        break;
                    }
                    un_hi -= 1;
                }
                if un_lo > un_hi {
                    break;
                }
                self.fmap.swap(un_lo as usize, un_hi as usize);
                un_lo += 1;
                un_hi -= 1;
            }

            // Every entry equal to the pivot: go one byte deeper.
            if gt_hi < lt_lo {
                self.stack.push(SortFrame {
                    lo,
                    hi,
                    depth: d + 1,
                });
                continue;
            }

            let n = (lt_lo - lo).min(un_lo - lt_lo);
            self.vswap(lo, un_lo - n, n);
            let m = (hi - gt_hi).min(gt_hi - un_hi);
            self.vswap(un_lo, hi - m + 1, m);

            let n = lo + un_lo - lt_lo - 1;
            let m = hi - (gt_hi - un_hi) + 1;

            self.stack.push(SortFrame { lo, hi: n, depth: d });
            self.stack.push(SortFrame {
                lo: n + 1,
                hi: m - 1,
                depth: d + 1,
            });
            self.stack.push(SortFrame { lo: m, hi, depth: d });
        }
    }

    fn bucket_size(&self, big: usize) -> u32 {
        self.ftab[(big + 1) << 8] - self.ftab[big << 8]
    }

    fn main_sort(&mut self) {
        let last = self.last;
        let block = self.block;

        // Radix pass on the first two bytes of every rotation.
        self.ftab.fill(0);
        let mut c1 = block[0];
        for i in 0..=last {
            let c2 = block[i + 1];
            self.ftab[((c1 as usize) << 8) + c2 as usize] += 1;
            c1 = c2;
        }
        for i in 1..self.ftab.len() {
            self.ftab[i] += self.ftab[i - 1];
        }
        let mut c1 = block[1];
        for i in 0..last {
            let c2 = block[i + 2];
            let j = ((c1 as usize) << 8) + c2 as usize;
            c1 = c2;
            self.ftab[j] -= 1;
            self.fmap[self.ftab[j] as usize] = i as u32;
        }
        let j = ((block[last + 1] as usize) << 8) + block[1] as usize;
        self.ftab[j] -= 1;
        self.fmap[self.ftab[j] as usize] = last as u32;

        // Visit big buckets smallest first.
        let mut running_order: [usize; 256] = std::array::from_fn(|i| i);
        let mut h = 364;
        while h != 1 {
            h /= 3;
            for i in h..256 {
                let vv = running_order[i];
                let mut j = i;
                while self.bucket_size(running_order[j - h]) > self.bucket_size(vv) {
                    running_order[j] = running_order[j - h];
                    j -= h;
                    if j < h {
                        break;
                    }
                }
                running_order[j] = vv;
            }
        }

        let mut big_done = [false; 256];
        let mut copy = [0usize; 256];

        for (i, &ss) in running_order.iter().enumerate() {
            // Sort every unsorted small bucket [ss, j].
            for j in 0..256 {
                let sb = (ss << 8) + j;
                if self.ftab[sb] & SETMASK == 0 {
                    let lo = (self.ftab[sb] & CLEARMASK) as usize;
                    let end = (self.ftab[sb + 1] & CLEARMASK) as usize;
                    if end > lo + 1 {
                        self.qsort3(lo, end - 1, 2);
                        if self.over_budget() {
                            return;
                        }
                    }
                    self.ftab[sb] |= SETMASK;
                }
            }

            big_done[ss] = true;

            // Record ranks within this big bucket for later tie-breaks.
            if i < 255 {
                let bb_start = (self.ftab[ss << 8] & CLEARMASK) as usize;
                let bb_size = (self.ftab[(ss + 1) << 8] & CLEARMASK) as usize - bb_start;
                let mut shifts = 0;
                while (bb_size >> shifts) > 65534 {
                    shifts += 1;
                }
                for j in 0..bb_size {
                    let a2update = self.fmap[bb_start + j] as usize;
                    let q_val = (j >> shifts) as u16;
                    self.quadrant[a2update] = q_val;
                    if a2update < OVERSHOOT {
                        self.quadrant[a2update + last + 1] = q_val;
                    }
                }
            }

            // Derive the order of buckets [c, ss] from the sorted bucket ss.
            for (j, slot) in copy.iter_mut().enumerate() {
                *slot = (self.ftab[(j << 8) + ss] & CLEARMASK) as usize;
            }
            let start = (self.ftab[ss << 8] & CLEARMASK) as usize;
            let end = (self.ftab[(ss + 1) << 8] & CLEARMASK) as usize;
            for j in start..end {
                let fj = self.fmap[j] as usize;
                let c = block[fj] as usize;
                if !big_done[c] {
                    self.fmap[copy[c]] = if fj == 0 { last as u32 } else { fj as u32 - 1 };
                    copy[c] += 1;
                }
            }
            for j in 0..256 {
                self.ftab[(j << 8) + ss] |= SETMASK;
            }
        }
    }
}

#[inline]
fn med3(a: i32, b: i32, c: i32) -> i32 {
    let (a, mut b) = if a > b { (b, a) } else { (a, b) };
    if b > c {
        b = c;
    }
    if a > b {
        b = a;
    }
    b
}

/// Randomisation increments shared with every bzip2 decoder.
#[rustfmt::skip]
pub const RNUMS: [u16; 512] = [
    619, 720, 127, 481, 931, 816, 813, 233, 566, 247, 985, 724, 205, 454, 863, 491,
    741, 242, 949, 214, 733, 859, 335, 708, 621, 574, 73, 654, 730, 472, 419, 436,
    278, 496, 867, 210, 399, 680, 480, 51, 878, 465, 811, 169, 869, 675, 611, 697,
    867, 561, 862, 687, 507, 283, 482, 129, 807, 591, 733, 623, 150, 238, 59, 379,
    684, 877, 625, 169, 643, 105, 170, 607, 520, 932, 727, 476, 693, 425, 174, 647,
    73, 122, 335, 530, 442, 853, 695, 249, 445, 515, 909, 545, 703, 919, 874, 474,
    882, 500, 594, 612, 641, 801, 220, 162, 819, 984, 589, 513, 495, 799, 161, 604,
    958, 533, 221, 400, 386, 867, 600, 782, 382, 596, 414, 171, 516, 375, 682, 485,
    911, 276, 98, 553, 163, 354, 666, 933, 424, 341, 533, 870, 227, 730, 475, 186,
    263, 647, 537, 686, 600, 224, 469, 68, 770, 919, 190, 373, 294, 822, 808, 206,
    184, 943, 795, 384, 383, 461, 404, 758, 839, 887, 715, 67, 618, 276, 204, 918,
    873, 777, 604, 560, 951, 160, 578, 722, 79, 804, 96, 409, 713, 940, 652, 934,
    970, 447, 318, 353, 859, 672, 112, 785, 645, 863, 803, 350, 139, 93, 354, 99,
    820, 908, 609, 772, 154, 274, 580, 184, 79, 626, 630, 742, 653, 282, 762, 623,
    680, 81, 927, 626, 789, 125, 411, 521, 938, 300, 821, 78, 343, 175, 128, 250,
    170, 774, 972, 275, 999, 639, 495, 78, 352, 126, 857, 956, 358, 619, 580, 124,
    737, 594, 701, 612, 669, 112, 134, 694, 363, 992, 809, 743, 168, 974, 944, 375,
    748, 52, 600, 747, 642, 182, 862, 81, 344, 805, 988, 739, 511, 655, 814, 334,
    249, 515, 897, 955, 664, 981, 649, 113, 974, 459, 893, 228, 433, 837, 553, 268,
    926, 240, 102, 654, 459, 51, 686, 754, 806, 760, 493, 403, 415, 394, 687, 700,
    946, 670, 656, 610, 738, 392, 760, 799, 887, 653, 978, 321, 576, 617, 626, 502,
    894, 679, 243, 440, 680, 879, 194, 572, 640, 724, 926, 56, 204, 700, 707, 151,
    457, 449, 797, 195, 791, 558, 945, 679, 297, 59, 87, 824, 713, 663, 412, 693,
    342, 606, 134, 108, 571, 364, 631, 212, 174, 643, 304, 329, 343, 97, 430, 751,
    497, 314, 983, 374, 822, 928, 140, 206, 73, 263, 980, 736, 876, 478, 430, 305,
    170, 514, 364, 692, 829, 82, 855, 953, 676, 246, 369, 970, 294, 750, 807, 827,
    150, 790, 288, 923, 804, 378, 215, 828, 592, 281, 565, 555, 710, 82, 896, 831,
    547, 261, 524, 462, 293, 465, 502, 56, 661, 821, 976, 991, 658, 869, 905, 758,
    745, 193, 768, 550, 608, 933, 378, 286, 215, 979, 792, 961, 61, 688, 793, 644,
    986, 403, 106, 366, 905, 644, 372, 567, 466, 434, 645, 210, 389, 550, 919, 135,
    780, 773, 635, 389, 707, 100, 626, 958, 165, 504, 920, 176, 193, 713, 857, 265,
    203, 50, 668, 108, 645, 990, 626, 197, 510, 357, 358, 850, 858, 364, 936, 638,
];
