//! Streaming compression contract.
//!
//! A [`Compressor`] consumes input and produces output into caller-provided
//! buffers, one call at a time, so it can be driven from any I/O loop.

use crate::error::Result;

/// Status of a streaming compression operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressStatus {
    /// More input data can be accepted.
    NeedsInput,
    /// Compressed bytes are waiting for output buffer space.
    NeedsOutput,
    /// Compression is complete and all output has been delivered.
    Done,
}

/// Flush mode for compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// No flush - buffer data for best compression.
    #[default]
    None,
    /// Sync flush - deliver output that is already complete.
    Sync,
    /// Full flush - end the current stream and start a fresh one.
    Full,
    /// Finish - complete the stream.
    Finish,
}

/// A streaming compressor (encoder).
pub trait Compressor {
    /// Compress data from input to output.
    ///
    /// # Arguments
    ///
    /// * `input` - Input data to compress
    /// * `output` - Output buffer for compressed data
    /// * `flush` - Flush mode
    ///
    /// # Returns
    ///
    /// A tuple of (bytes consumed from input, bytes written to output, status)
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)>;

    /// Reset the compressor to its initial state.
    fn reset(&mut self);

    /// Check if the compressor has finished.
    fn is_finished(&self) -> bool;

    /// Compress all data at once (convenience method).
    fn compress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut input_pos = 0;
        let mut buffer = vec![0u8; 32768];

        loop {
            let flush = if input_pos >= input.len() {
                FlushMode::Finish
            } else {
                FlushMode::None
            };

            let (consumed, produced, status) =
                self.compress(&input[input_pos..], &mut buffer, flush)?;

            input_pos += consumed;
            output.extend_from_slice(&buffer[..produced]);

            if status == CompressStatus::Done {
                break;
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Copies input through unchanged, one output buffer at a time.
    struct Passthrough {
        pending: Vec<u8>,
        finished: bool,
    }

    impl Compressor for Passthrough {
        fn compress(
            &mut self,
            input: &[u8],
            output: &mut [u8],
            flush: FlushMode,
        ) -> Result<(usize, usize, CompressStatus)> {
            self.pending.extend_from_slice(input);
            let n = self.pending.len().min(output.len());
            output[..n].copy_from_slice(&self.pending[..n]);
            self.pending.drain(..n);
            let status = if !self.pending.is_empty() {
                CompressStatus::NeedsOutput
            } else if flush == FlushMode::Finish {
                self.finished = true;
                CompressStatus::Done
            } else {
                CompressStatus::NeedsInput
            };
            Ok((input.len(), n, status))
        }

        fn reset(&mut self) {
            self.pending.clear();
            self.finished = false;
        }

        fn is_finished(&self) -> bool {
            self.finished
        }
    }

    #[test]
    fn test_flush_mode_default() {
        assert_eq!(FlushMode::default(), FlushMode::None);
    }

    #[test]
    fn test_compress_all_drives_to_done() {
        let mut c = Passthrough {
            pending: Vec::new(),
            finished: false,
        };
        let input: Vec<u8> = (0..100_000u32).map(|i| i as u8).collect();
        let out = c.compress_all(&input).unwrap();
        assert_eq!(out, input);
        assert!(c.is_finished());

        c.reset();
        assert!(!c.is_finished());
        assert!(c.compress_all(b"").unwrap().is_empty());
    }
}
