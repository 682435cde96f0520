//! The bzip2 flavour of CRC-32.
//!
//! bzip2 uses the same polynomial as ZIP/GZIP (0x04C11DB7) but runs it
//! *unreflected*: bytes enter at the top of the register and the table is
//! indexed by the high byte.
//!
//! - Polynomial: 0x04C11DB7
//! - Initial value: 0xFFFFFFFF
//! - Final XOR: 0xFFFFFFFF
//! - Reflected input/output: No
//!
//! Each block carries the CRC of its raw (pre-RLE) bytes; the stream trailer
//! carries a combined CRC that folds in every block CRC in order.

/// bzip2 CRC-32 lookup table (polynomial 0x04C11DB7, MSB-first).
const BZ_CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0usize;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut j = 0;
        while j < 8 {
            if crc & 0x8000_0000 != 0 {
                crc = (crc << 1) ^ 0x04C1_1DB7;
            } else {
                crc <<= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// bzip2 CRC-32 calculator.
///
/// # Example
///
/// ```
/// use oxibz_core::crc::BzCrc32;
///
/// let mut crc = BzCrc32::new();
/// crc.update(b"12345");
/// crc.update(b"6789");
/// assert_eq!(crc.finalize(), 0xFC89_1918);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BzCrc32 {
    crc: u32,
}

impl BzCrc32 {
    /// Create a new calculator.
    pub fn new() -> Self {
        Self { crc: 0xFFFF_FFFF }
    }

    /// Reset the CRC to its initial state.
    pub fn reset(&mut self) {
        self.crc = 0xFFFF_FFFF;
    }

    /// Fold a single byte into the CRC.
    #[inline(always)]
    pub fn update_byte(&mut self, byte: u8) {
        let index = ((self.crc >> 24) ^ byte as u32) as usize;
        self.crc = (self.crc << 8) ^ BZ_CRC32_TABLE[index];
    }

    /// Fold `count` copies of `byte` into the CRC.
    #[inline]
    pub fn update_run(&mut self, byte: u8, count: usize) {
        for _ in 0..count {
            self.update_byte(byte);
        }
    }

    /// Update the CRC with more data.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.update_byte(byte);
        }
    }

    /// Get the current CRC value (without finalizing).
    #[inline(always)]
    pub fn value(&self) -> u32 {
        !self.crc
    }

    /// Finalize and return the CRC value.
    #[inline(always)]
    pub fn finalize(self) -> u32 {
        !self.crc
    }

    /// Compute the CRC of a slice in one call.
    pub fn compute(data: &[u8]) -> u32 {
        let mut crc = Self::new();
        crc.update(data);
        crc.finalize()
    }

    /// Fold a finished block CRC into a stream's combined CRC.
    #[inline]
    pub fn combine(combined: u32, block_crc: u32) -> u32 {
        combined.rotate_left(1) ^ block_crc
    }
}

impl Default for BzCrc32 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_head() {
        assert_eq!(BZ_CRC32_TABLE[0], 0x0000_0000);
        assert_eq!(BZ_CRC32_TABLE[1], 0x04C1_1DB7);
        assert_eq!(BZ_CRC32_TABLE[2], 0x0982_3B6E);
        assert_eq!(BZ_CRC32_TABLE[3], 0x0D43_26D9);
    }

    #[test]
    fn test_empty() {
        assert_eq!(BzCrc32::compute(b""), 0x0000_0000);
    }

    #[test]
    fn test_check_value() {
        // CRC-32/BZIP2 check value for "123456789"
        assert_eq!(BzCrc32::compute(b"123456789"), 0xFC89_1918);
    }

    #[test]
    fn test_known_values() {
        assert_eq!(BzCrc32::compute(b"a"), 0x1993_9B6B);
        assert_eq!(BzCrc32::compute(b"hello world"), 0x44F7_1378);
    }

    #[test]
    fn test_incremental_and_runs() {
        let mut crc = BzCrc32::new();
        crc.update(b"hello");
        crc.update_byte(b' ');
        crc.update(b"wor");
        crc.update_run(b'l', 1);
        crc.update_byte(b'd');
        assert_eq!(crc.value(), 0x44F7_1378);

        let mut run = BzCrc32::new();
        run.update_run(b'z', 300);
        assert_eq!(run.finalize(), BzCrc32::compute(&[b'z'; 300]));
    }

    #[test]
    fn test_reset() {
        let mut crc = BzCrc32::new();
        crc.update(b"garbage");
        crc.reset();
        crc.update(b"123456789");
        assert_eq!(crc.finalize(), 0xFC89_1918);
    }

    #[test]
    fn test_combine() {
        assert_eq!(BzCrc32::combine(0, 0x44F7_1378), 0x44F7_1378);
        assert_eq!(BzCrc32::combine(0x8000_0001, 0), 0x0000_0003);
        let two = BzCrc32::combine(BzCrc32::combine(0, 0x1234_5678), 0x9ABC_DEF0);
        assert_eq!(two, 0x1234_5678u32.rotate_left(1) ^ 0x9ABC_DEF0);
    }
}
