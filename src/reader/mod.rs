//! Sequential `.bin` reading.
//!
//! [`BinReader`] drives the whole decode: header once, then every block in
//! file order. Each block is validated, decoded, timestamped and handed to the
//! day indexers before the next block is read. The first fatal error stops the
//! read and leaves every buffer as it was after the last good block.

mod builder;

pub use builder::{BinReaderBuilder, ReaderConfig, SequencePolicy};

use crate::{
    DayIndex, DayIndexer, DayWindowIndexer, Error, Result,
    blocks::{BlockAnchor, FileInfo, SAMPLES_PER_BLOCK, samples_for_blocks},
    index::BlockContext,
    parsing::{SamplingRateWarning, block_timestamps, decode_payload, reconcile_sampling_rate},
    types::SampleBuffers,
};
use core::fmt;
use log::{debug, trace, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Log a warning if `path` does not look like a `.bin` recording. The file is
/// still read.
pub(crate) fn warn_on_extension(path: &str) {
    let is_bin = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("bin"));
    if !is_bin {
        warn!("File extension is not expected '.bin': {path}");
    }
}

/// Outcome of decoding one block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockOutcome {
    /// Sequence number of the block.
    pub sequence: u64,
    /// Index of the block's first sample in the output buffers.
    pub first_sample: usize,
    /// Number of samples written.
    pub samples: usize,
    /// Set when this block corrected the file's sampling rate.
    pub warning: Option<SamplingRateWarning>,
}

/// A decoded recording.
#[derive(Debug, Clone)]
pub struct Recording {
    info: FileInfo,
    samples: SampleBuffers,
    days: Vec<DayIndex>,
    warnings: Vec<SamplingRateWarning>,
    blocks_read: u64,
    distinct_blocks: u64,
}

impl Recording {
    /// Header values, with the sampling rate as corrected during the read.
    pub fn info(&self) -> &FileInfo {
        &self.info
    }

    pub fn samples(&self) -> &SampleBuffers {
        &self.samples
    }

    /// Take ownership of the sample buffers.
    pub fn into_samples(self) -> SampleBuffers {
        self.samples
    }

    /// One day index per configured window, then one per custom indexer.
    pub fn days(&self) -> &[DayIndex] {
        &self.days
    }

    /// Sampling rate corrections reported during the read.
    pub fn warnings(&self) -> &[SamplingRateWarning] {
        &self.warnings
    }

    /// Number of blocks decoded, repeated sequence numbers included.
    pub fn blocks_read(&self) -> u64 {
        self.blocks_read
    }

    /// Number of distinct sample slots written. A block that repeats an earlier
    /// sequence number overwrites those slots and is not counted again.
    pub fn samples_written(&self) -> usize {
        samples_for_blocks(self.distinct_blocks).unwrap_or(usize::MAX)
    }

    /// File metadata and indices without the sample data.
    pub fn summary(&self) -> RecordingSummary {
        RecordingSummary {
            info: self.info.clone(),
            blocks_read: self.blocks_read,
            samples_written: self.samples_written(),
            warnings: self.warnings.clone(),
            days: self.days.clone(),
        }
    }

    /// Save [`Recording::summary`] as JSON.
    ///
    /// Requires the `serde` feature.
    #[cfg(feature = "serde")]
    pub fn save_summary(&self, path: &str) -> Result<()> {
        self.summary().save_to_file(path)
    }
}

/// Everything about a recording except its samples.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecordingSummary {
    pub info: FileInfo,
    pub blocks_read: u64,
    pub samples_written: usize,
    pub warnings: Vec<SamplingRateWarning>,
    pub days: Vec<DayIndex>,
}

impl RecordingSummary {
    /// Save the summary as JSON.
    ///
    /// Requires the `serde` feature.
    #[cfg(feature = "serde")]
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            Error::Serialization(format!("JSON serialization failed: {}", e))
        })?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a summary from JSON.
    ///
    /// Requires the `serde` feature.
    #[cfg(feature = "serde")]
    pub fn load_from_file(path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| Error::Serialization(format!("JSON deserialization failed: {}", e)))
    }
}

/// A read that stopped at a fatal error.
///
/// Carries the error, the sequence number of the block that caused it, and
/// everything decoded before it. `partial` is `None` when the header itself
/// could not be read.
#[derive(Debug)]
pub struct ReadFailure {
    error: Error,
    sequence: Option<u64>,
    partial: Option<Recording>,
}

impl ReadFailure {
    pub fn error(&self) -> &Error {
        &self.error
    }

    /// Sequence number of the block that failed, if a block failed.
    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    /// Samples decoded before the failure.
    pub fn partial(&self) -> Option<&Recording> {
        self.partial.as_ref()
    }

    pub fn into_parts(self) -> (Error, Option<u64>, Option<Recording>) {
        (self.error, self.sequence, self.partial)
    }
}

impl fmt::Display for ReadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.partial {
            Some(partial) => write!(
                f,
                "{} (after {} decoded blocks)",
                self.error,
                partial.blocks_read()
            ),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for ReadFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<ReadFailure> for Error {
    fn from(failure: ReadFailure) -> Self {
        failure.error
    }
}

/// Reads one `.bin` recording from a buffered text source.
///
/// ```no_run
/// use geneactiv_rs::{BinReader, Result};
///
/// fn main() -> Result<()> {
///     let mut reader = BinReader::open("recording.bin")?;
///     let info = reader.read_header()?.clone();
///     println!("{} blocks at {} Hz", info.declared_block_count, info.sampling_rate_hz);
///
///     while let Some(block) = reader.next_block()? {
///         if let Some(warning) = &block.warning {
///             eprintln!("{warning}");
///         }
///     }
///     let recording = reader.finish().expect("header was read");
///     println!("{} samples", recording.samples_written());
///     Ok(())
/// }
/// ```
pub struct BinReader<R> {
    reader: R,
    config: ReaderConfig,
    info: Option<FileInfo>,
    buffers: SampleBuffers,
    indexers: Vec<Box<dyn DayIndexer>>,
    days: Vec<DayIndex>,
    warnings: Vec<SamplingRateWarning>,
    blocks_read: u64,
    /// One flag per block slot, set once the slot has been written.
    written: Vec<bool>,
    distinct_blocks: u64,
    previous_sequence: Option<u64>,
    done: bool,
}

impl BinReader<BufReader<File>> {
    /// Open a recording with the default configuration.
    pub fn open(path: &str) -> Result<Self> {
        BinReaderBuilder::new().open(path)
    }

    pub fn builder() -> BinReaderBuilder {
        BinReaderBuilder::new()
    }
}

impl<R: BufRead> BinReader<R> {
    /// Read from `reader` with the default configuration.
    pub fn new(reader: R) -> Self {
        Self::from_builder(reader, BinReaderBuilder::new())
    }

    fn from_builder(reader: R, builder: BinReaderBuilder) -> Self {
        let mut indexers: Vec<Box<dyn DayIndexer>> = builder
            .config
            .day_windows
            .iter()
            .map(|&window| Box::new(DayWindowIndexer::new(window)) as Box<dyn DayIndexer>)
            .collect();
        indexers.extend(builder.extra_indexers);
        let days = vec![DayIndex::default(); indexers.len()];

        Self {
            reader,
            config: builder.config,
            info: None,
            buffers: SampleBuffers::default(),
            indexers,
            days,
            warnings: Vec::new(),
            blocks_read: 0,
            written: Vec::new(),
            distinct_blocks: 0,
            previous_sequence: None,
            done: false,
        }
    }

    /// Parse the header if it has not been read yet.
    ///
    /// The sample buffers start empty and grow as blocks are committed; they
    /// never exceed the declared block count.
    pub fn read_header(&mut self) -> Result<&FileInfo> {
        let info = match self.info.take() {
            Some(info) => info,
            None => {
                let info = FileInfo::read_from(&mut self.reader)?;
                debug!(
                    "Header: fs {} Hz, {} declared blocks, gain {:?}, offset {:?}",
                    info.sampling_rate_hz, info.declared_block_count, info.gain, info.offset
                );
                info
            }
        };
        Ok(self.info.insert(info))
    }

    /// Header values, once read.
    pub fn info(&self) -> Option<&FileInfo> {
        self.info.as_ref()
    }

    /// The sample buffers as filled so far.
    pub fn buffers(&self) -> &SampleBuffers {
        &self.buffers
    }

    /// Decode the next block.
    ///
    /// # Returns
    /// `Ok(None)` once the declared number of blocks has been read or the
    /// input ends at a block boundary. After an error, further calls return
    /// `Ok(None)`.
    pub fn next_block(&mut self) -> Result<Option<BlockOutcome>> {
        self.read_header()?;
        if self.done {
            return Ok(None);
        }
        match self.decode_block() {
            Ok(None) => {
                self.done = true;
                Ok(None)
            }
            Ok(Some(outcome)) => Ok(Some(outcome)),
            Err(e) => {
                self.done = true;
                Err(e)
            }
        }
    }

    fn decode_block(&mut self) -> Result<Option<BlockOutcome>> {
        let Some(info) = self.info.as_mut() else {
            return Ok(None);
        };
        if self.blocks_read >= info.declared_block_count {
            return Ok(None);
        }

        let Some(mut anchor) = BlockAnchor::read_metadata(&mut self.reader)? else {
            warn!(
                "File ends after {} of {} declared blocks",
                self.blocks_read, info.declared_block_count
            );
            return Ok(None);
        };
        let sequence = anchor.sequence;
        if sequence >= info.declared_block_count {
            return Err(Error::MalformedBlock {
                sequence: Some(sequence),
                line: 3,
                reason: format!(
                    "sequence number {sequence} is not below the declared block count {}",
                    info.declared_block_count
                ),
            });
        }

        if self.config.sequence_policy == SequencePolicy::Strict {
            if let Some(previous) = self.previous_sequence {
                if sequence <= previous {
                    return Err(Error::SequenceOutOfOrder {
                        previous,
                        found: sequence,
                    });
                }
            }
        }

        let warning = reconcile_sampling_rate(info, sequence, anchor.sampling_rate)?;
        if let Some(warning) = &warning {
            warn!("{warning}");
        }

        anchor.read_payload(&mut self.reader)?;
        let mut block = decode_payload(&anchor.payload, sequence, anchor.temperature, info)?;
        let time_of_day = block_timestamps(
            &anchor.time_line,
            sequence,
            info.sampling_rate_hz,
            &mut block.timestamps,
        )?;

        let first_sample = self.buffers.commit_block(&block)?;
        let slot = first_sample / SAMPLES_PER_BLOCK;
        if self.written.len() <= slot {
            self.written.resize(slot + 1, false);
        }
        if !core::mem::replace(&mut self.written[slot], true) {
            self.distinct_blocks += 1;
        }
        info.max_sequence_seen = Some(
            info.max_sequence_seen
                .map_or(sequence, |max| max.max(sequence)),
        );
        self.previous_sequence = Some(sequence);
        self.blocks_read += 1;
        if let Some(warning) = &warning {
            self.warnings.push(warning.clone());
        }

        let context = BlockContext {
            sampling_rate: info.sampling_rate_hz,
            first_sample,
            block_samples: SAMPLES_PER_BLOCK,
            max_samples: info.declared_samples(),
            declared_blocks: info.declared_block_count,
            time_of_day,
            timestamps: &block.timestamps,
        };
        for (indexer, days) in self.indexers.iter_mut().zip(self.days.iter_mut()) {
            indexer.index_block(&context, days);
        }

        trace!("Block ({sequence}) decoded into samples {first_sample}..");
        Ok(Some(BlockOutcome {
            sequence,
            first_sample,
            samples: SAMPLES_PER_BLOCK,
            warning,
        }))
    }

    /// Close the day indices and hand over the decoded recording.
    ///
    /// Returns `None` if the header was never read.
    pub fn finish(mut self) -> Option<Recording> {
        let info = self.info.take()?;
        let written = match info.max_sequence_seen {
            Some(max) => max
                .checked_add(1)
                .and_then(samples_for_blocks)
                .unwrap_or(self.buffers.len()),
            None => 0,
        };
        if self.config.trim_to_written {
            self.buffers.resize(written);
        } else {
            self.buffers.resize(info.declared_samples());
        }
        for (indexer, days) in self.indexers.iter_mut().zip(self.days.iter_mut()) {
            indexer.finish(written, days);
        }
        debug!(
            "Read {} blocks, {} sample slots, {} sampling rate warnings",
            self.blocks_read,
            self.buffers.len(),
            self.warnings.len()
        );

        Some(Recording {
            info,
            samples: self.buffers,
            days: self.days,
            warnings: self.warnings,
            blocks_read: self.blocks_read,
            distinct_blocks: self.distinct_blocks,
        })
    }

    /// Decode every block and return the recording, or the first fatal error
    /// together with everything decoded before it.
    pub fn read_all(mut self) -> core::result::Result<Recording, ReadFailure> {
        let mut failure = None;
        loop {
            match self.next_block() {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            }
        }

        match (failure, self.finish()) {
            (None, Some(recording)) => Ok(recording),
            (failure, partial) => {
                let error = failure.unwrap_or_else(|| Error::MalformedHeader {
                    line: 1,
                    reason: "header was not read".to_string(),
                });
                Err(ReadFailure {
                    sequence: error.sequence(),
                    error,
                    partial,
                })
            }
        }
    }
}

/// Read a whole `.bin` file with the default configuration.
///
/// A path without a `.bin` extension is read anyway, with a logged warning.
pub fn read_bin_file(path: &str) -> core::result::Result<Recording, ReadFailure> {
    match BinReader::open(path) {
        Ok(reader) => reader.read_all(),
        Err(error) => Err(ReadFailure {
            error,
            sequence: None,
            partial: None,
        }),
    }
}
