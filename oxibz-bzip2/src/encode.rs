//! BZip2 encoder.

use crate::block::BlockFramer;
use crate::rle::RunCollector;
use crate::{BZIP2_MAGIC, CompressionLevel};
use oxibz_core::bitstream::BitWriter;
use oxibz_core::error::{OxiBzError, Result};
use std::io::{self, Write};

/// Where the encoder is within the current member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberState {
    /// Nothing written yet; the header goes out with the first byte.
    Pending,
    /// Header written, blocks in progress.
    Open,
    /// Trailer written; the next byte starts a new member.
    Finished,
    /// An error left a partial member in the sink.
    Failed,
}

/// Counters over the lifetime of an encoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderStats {
    /// Uncompressed bytes accepted.
    pub total_in: u64,
    /// Compressed bytes produced.
    pub total_out: u64,
    /// Blocks framed.
    pub blocks_written: u64,
    /// Blocks that needed the randomised sort.
    pub blocks_randomised: u64,
    /// Members (complete `BZh` streams) started.
    pub members: u64,
}

/// Streaming bzip2 encoder writing into any `Write`.
///
/// Nothing touches the sink until the first byte arrives. [`finish`] ends
/// the current member and frees the block workspace; writing again starts a
/// new member, so one encoder can produce a multi-member stream.
///
/// Dropping an encoder without calling [`finish`] or [`close`] leaves the
/// member unterminated.
///
/// Any error, typically from the sink, leaves a partial member behind. The
/// encoder then rejects every further call with
/// [`OxiBzError::EncoderFailed`]; recovering is up to the caller.
///
/// [`finish`]: BzEncoder::finish
/// [`close`]: BzEncoder::close
#[derive(Debug)]
pub struct BzEncoder<W: Write> {
    writer: BitWriter<W>,
    level: CompressionLevel,
    framer: Option<BlockFramer>,
    runs: RunCollector,
    state: MemberState,
    stats: EncoderStats,
}

impl<W: Write> BzEncoder<W> {
    /// Create a new encoder. No output is produced until data is written.
    pub fn new(writer: W, level: CompressionLevel) -> Self {
        Self {
            writer: BitWriter::new(writer),
            level,
            framer: None,
            runs: RunCollector::new(),
            state: MemberState::Pending,
            stats: EncoderStats::default(),
        }
    }

    /// Block-size level of this encoder.
    pub fn level(&self) -> CompressionLevel {
        self.level
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }

    /// Get a mutable reference to the underlying writer.
    ///
    /// Writing to it directly while a member is open corrupts the stream.
    pub fn get_mut(&mut self) -> &mut W {
        self.writer.get_mut()
    }

    /// Uncompressed bytes accepted so far.
    pub fn total_in(&self) -> u64 {
        self.stats.total_in
    }

    /// Compressed bytes produced so far.
    pub fn total_out(&self) -> u64 {
        self.writer.bytes_written()
    }

    /// Blocks framed so far, across all members.
    pub fn blocks_written(&self) -> u64 {
        self.stats().blocks_written
    }

    /// Blocks that needed the randomised sort.
    pub fn blocks_randomised(&self) -> u64 {
        self.stats().blocks_randomised
    }

    /// Snapshot of the encoder counters.
    pub fn stats(&self) -> EncoderStats {
        let (open_blocks, open_randomised) = self
            .framer
            .as_ref()
            .map_or((0, 0), |f| (f.blocks_written(), f.blocks_randomised()));
        EncoderStats {
            total_out: self.total_out(),
            blocks_written: self.stats.blocks_written + open_blocks,
            blocks_randomised: self.stats.blocks_randomised + open_randomised,
            ..self.stats
        }
    }

    fn start_member(&mut self) -> Result<()> {
        self.writer.write_bytes(&BZIP2_MAGIC)?;
        let level = self.level;
        let framer = self.framer.get_or_insert_with(|| BlockFramer::new(level));
        framer.start(&mut self.writer)?;

        self.runs = RunCollector::new();
        self.state = MemberState::Open;
        self.stats.members += 1;
        log::debug!(
            "member {} started, level {}",
            self.stats.members,
            self.level.level()
        );
        Ok(())
    }

    /// Whether an earlier error stopped the encoder.
    pub fn has_failed(&self) -> bool {
        self.state == MemberState::Failed
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.has_failed() {
            return Err(OxiBzError::encoder_failed());
        }
        Ok(())
    }

    fn fail_on_error<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.state = MemberState::Failed;
        }
        result
    }

    /// Compress a single byte.
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write_data(std::slice::from_ref(&byte))
    }

    /// Compress a slice of bytes.
    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_usable()?;
        if data.is_empty() {
            return Ok(());
        }
        let result = self.feed(data);
        self.fail_on_error(result)
    }

    fn feed(&mut self, data: &[u8]) -> Result<()> {
        if self.state != MemberState::Open {
            self.start_member()?;
        }

        let framer = self
            .framer
            .as_mut()
            .expect("an open member owns a block framer");
        for &byte in data {
            if let Some(run) = self.runs.push(byte) {
                framer.push_run(run, &mut self.writer)?;
            }
            self.stats.total_in += 1;
        }
        Ok(())
    }

    /// End the current member: flush the pending run and block, write the
    /// trailer and release the block workspace.
    ///
    /// Calling `finish` again without writing in between does nothing. On a
    /// fresh encoder it writes an empty stream.
    pub fn finish(&mut self) -> Result<()> {
        self.ensure_usable()?;
        let result = self.finish_member();
        self.fail_on_error(result)
    }

    fn finish_member(&mut self) -> Result<()> {
        match self.state {
            MemberState::Finished | MemberState::Failed => return Ok(()),
            MemberState::Pending if self.stats.members > 0 => {
                self.state = MemberState::Finished;
                return Ok(());
            }
            MemberState::Pending => self.start_member()?,
            MemberState::Open => {}
        }

        let mut framer = self
            .framer
            .take()
            .expect("an open member owns a block framer");
        self.state = MemberState::Finished;

        let result = self.close_member(&mut framer);
        self.stats.blocks_written += framer.blocks_written();
        self.stats.blocks_randomised += framer.blocks_randomised();
        result?;

        log::debug!(
            "member {} finished: {} bytes in, {} bytes out",
            self.stats.members,
            self.stats.total_in,
            self.total_out()
        );
        Ok(())
    }

    fn close_member(&mut self, framer: &mut BlockFramer) -> Result<()> {
        if let Some(run) = self.runs.take() {
            framer.push_run(run, &mut self.writer)?;
        }
        framer.end_block(&mut self.writer)?;
        framer.end_stream(&mut self.writer)?;
        self.writer.flush()
    }

    /// Make the next write begin a new member.
    ///
    /// An open member is finished first so the output stays decodable. The
    /// new header is only written once data arrives.
    pub fn reset_state(&mut self) -> Result<()> {
        self.ensure_usable()?;
        if self.state == MemberState::Open {
            self.finish()?;
        }
        self.state = MemberState::Pending;
        Ok(())
    }

    /// Finish the stream and return the underlying writer.
    pub fn close(mut self) -> Result<W> {
        self.finish()?;
        self.writer.into_inner()
    }
}

impl<W: Write> Write for BzEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_data(buf)?;
        Ok(buf.len())
    }

    /// Pushes completed output to the sink. Block boundaries are not forced.
    fn flush(&mut self) -> io::Result<()> {
        self.ensure_usable()?;
        let result = self.writer.flush();
        self.fail_on_error(result)?;
        Ok(())
    }
}

/// Compress data to BZip2 format.
pub fn compress(data: &[u8], level: CompressionLevel) -> Result<Vec<u8>> {
    let mut encoder = BzEncoder::new(Vec::with_capacity(data.len() / 2 + 64), level);
    encoder.write_data(data)?;
    encoder.close()
}
