//! [`Compressor`] adapter over [`BzEncoder`].

use crate::CompressionLevel;
use crate::encode::BzEncoder;
use oxibz_core::error::{OxiBzError, Result};
use oxibz_core::traits::{CompressStatus, Compressor, FlushMode};
use std::io::Write;

/// BZip2 compressor implementing the Compressor trait.
///
/// Compressed bytes are produced into an internal buffer and copied out as
/// the caller supplies output space. `FlushMode::Full` ends the current
/// member so that everything written so far is decodable on its own; the
/// next input begins a new member.
#[derive(Debug)]
pub struct Bzip2Compressor {
    level: CompressionLevel,
    encoder: BzEncoder<Vec<u8>>,
    drained: usize,
    finishing: bool,
    finished: bool,
}

impl Bzip2Compressor {
    /// Create a new compressor.
    pub fn new(level: CompressionLevel) -> Self {
        Self {
            level,
            encoder: BzEncoder::new(Vec::new(), level),
            drained: 0,
            finishing: false,
            finished: false,
        }
    }

    /// Block-size level of this compressor.
    pub fn level(&self) -> CompressionLevel {
        self.level
    }

    /// Uncompressed bytes accepted so far.
    pub fn total_in(&self) -> u64 {
        self.encoder.total_in()
    }

    fn pending(&self) -> usize {
        self.encoder.get_ref().len() - self.drained
    }

    fn drain_into(&mut self, output: &mut [u8]) -> usize {
        let produced = &self.encoder.get_ref()[self.drained..];
        let n = produced.len().min(output.len());
        output[..n].copy_from_slice(&produced[..n]);
        self.drained += n;

        if self.drained == self.encoder.get_ref().len() {
            self.encoder.get_mut().clear();
            self.drained = 0;
        }
        n
    }
}

impl Default for Bzip2Compressor {
    fn default() -> Self {
        Self::new(CompressionLevel::default())
    }
}

impl Compressor for Bzip2Compressor {
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        if self.finishing && !input.is_empty() {
            return Err(OxiBzError::finished());
        }
        if self.finished {
            return Ok((0, 0, CompressStatus::Done));
        }

        self.encoder.write_data(input)?;

        match flush {
            FlushMode::None => {}
            FlushMode::Sync => self.encoder.flush()?,
            FlushMode::Full => self.encoder.reset_state()?,
            FlushMode::Finish => {
                self.encoder.finish()?;
                self.finishing = true;
            }
        }

        let produced = self.drain_into(output);
        let status = if self.pending() > 0 {
            CompressStatus::NeedsOutput
        } else if self.finishing {
            self.finished = true;
            CompressStatus::Done
        } else {
            CompressStatus::NeedsInput
        };

        Ok((input.len(), produced, status))
    }

    fn reset(&mut self) {
        self.encoder = BzEncoder::new(Vec::new(), self.level);
        self.drained = 0;
        self.finishing = false;
        self.finished = false;
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}
