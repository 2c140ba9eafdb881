//! `.bin` file writer.
//!
//! [`BinWriter`] produces files in the layout [`crate::BinReader`] reads: the
//! 59-line header followed by 10-line blocks. It exists mostly to build test
//! recordings and to re-emit edited data.
//!
//! # Example
//!
//! ```no_run
//! use geneactiv_rs::{BinWriter, BlockTime, FileInfo, RawBlock, RawSample, Result};
//!
//! fn write_still_recording(info: &FileInfo) -> Result<()> {
//!     let mut writer = BinWriter::create("still.bin")?;
//!     writer.write_header(info)?;
//!
//!     let start = BlockTime::from_epoch_seconds(1_577_836_800.0).expect("valid epoch");
//!     for sequence in 0..info.declared_block_count {
//!         let offset = sequence as f64 * 300.0 / info.sampling_rate_hz;
//!         let time = BlockTime::from_epoch_seconds(1_577_836_800.0 + offset).unwrap_or(start);
//!         let block = RawBlock::filled(
//!             sequence,
//!             time,
//!             21.5,
//!             info.sampling_rate_hz,
//!             RawSample::default(),
//!         );
//!         writer.write_block(&block)?;
//!     }
//!     writer.finish()?;
//!     Ok(())
//! }
//! ```

use crate::{
    Error, Result,
    blocks::{FileInfo, RawBlock},
};
use log::{debug, warn};
use std::fs::File;
use std::io::{BufWriter, Write};

/// Writer for `.bin` recordings.
///
/// Lines are terminated with `\r\n`, as the device writes them.
pub struct BinWriter<W: Write> {
    writer: W,
    declared_blocks: Option<u64>,
    blocks_written: u64,
}

impl BinWriter<BufWriter<File>> {
    /// Create (or truncate) `path` and write to it through a buffer.
    pub fn create(path: &str) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::with_capacity(1 << 20, file)))
    }
}

impl<W: Write> BinWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            declared_blocks: None,
            blocks_written: 0,
        }
    }

    fn write_lines<S: AsRef<str>>(&mut self, lines: &[S]) -> Result<()> {
        for line in lines {
            self.writer.write_all(line.as_ref().as_bytes())?;
            self.writer.write_all(b"\r\n")?;
        }
        Ok(())
    }

    /// Write the 59 header lines. Must be called once, before any block.
    pub fn write_header(&mut self, info: &FileInfo) -> Result<()> {
        if self.declared_blocks.is_some() {
            return Err(Error::MalformedHeader {
                line: 1,
                reason: "header already written".to_string(),
            });
        }
        self.write_lines(&info.to_lines())?;
        self.declared_blocks = Some(info.declared_block_count);
        Ok(())
    }

    /// Write one block.
    ///
    /// # Returns
    /// [`Error::BlockPayloadLength`] if the block does not hold exactly 300
    /// samples, or [`Error::MalformedBlock`] if no header was written yet.
    pub fn write_block(&mut self, block: &RawBlock) -> Result<()> {
        if self.declared_blocks.is_none() {
            return Err(Error::MalformedBlock {
                sequence: Some(block.sequence),
                line: 1,
                reason: "block written before the header".to_string(),
            });
        }
        let lines = block.to_lines()?;
        self.write_lines(&lines)?;
        self.blocks_written += 1;
        Ok(())
    }

    /// Number of blocks written so far.
    pub fn blocks_written(&self) -> u64 {
        self.blocks_written
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        match self.declared_blocks {
            Some(declared) if declared != self.blocks_written => warn!(
                "Header declares {declared} blocks but {} were written",
                self.blocks_written
            ),
            _ => debug!("Wrote {} blocks", self.blocks_written),
        }
        Ok(self.writer)
    }
}
