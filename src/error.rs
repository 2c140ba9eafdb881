//! Error types for `.bin` decoding.
//!
//! This module defines the [`Error`] enum which represents all possible failures
//! that can occur when reading a GENEActiv recording. Every block-level variant
//! carries the sequence number of the offending block when it is known, so a
//! caller can report exactly where a file went bad.
//!
//! # Example
//!
//! ```no_run
//! use geneactiv_rs::{Error, Result, read_bin_file};
//!
//! fn load(path: &str) -> Result<()> {
//!     match read_bin_file(path) {
//!         Ok(recording) => {
//!             println!("Decoded {} samples", recording.samples_written());
//!             Ok(())
//!         }
//!         Err(failure) => {
//!             if let Error::MalformedHeader { line, reason } = failure.error() {
//!                 eprintln!("Not a valid header (line {line}): {reason}");
//!             }
//!             Err(failure.into())
//!         }
//!     }
//! }
//! ```

use core::fmt;

/// Errors that can occur while reading or writing `.bin` recordings.
///
/// All variants are fatal: reading stops at the first one. The single
/// recoverable condition, a one-off sampling rate correction, is reported as a
/// [`crate::SamplingRateWarning`] instead.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred while reading or writing the file.
    IOError(std::io::Error),

    /// The 59-line header is short, lacks a delimiter, or holds an
    /// unparseable or invalid value.
    MalformedHeader {
        /// 1-based header line where the problem was detected
        line: usize,
        /// What was wrong with the line
        reason: String,
    },

    /// A block ended inside its metadata lines or holds an unparseable
    /// sequence number, temperature or sampling rate.
    MalformedBlock {
        /// Sequence number, when it was read before the failure
        sequence: Option<u64>,
        /// 1-based line within the block
        line: usize,
        /// What was wrong with the line
        reason: String,
    },

    /// The block's timestamp line could not be read.
    BlockTimestamp {
        /// Sequence number of the block
        sequence: u64,
    },

    /// The block's timestamp line holds an impossible calendar date or time.
    InvalidTimestamp {
        /// Sequence number of the block
        sequence: u64,
        /// The offending timestamp line
        value: String,
    },

    /// A second block disagreed with the file's sampling rate.
    ///
    /// The first disagreement is tolerated and corrects the rate; any later one
    /// means the file cannot be trusted.
    BlockSamplingRate {
        /// Sequence number of the block
        sequence: u64,
        /// Rate recorded in the block
        block_rate: f64,
        /// Rate in effect when the block was read
        file_rate: f64,
    },

    /// The block's payload line could not be read.
    BlockPayload {
        /// Sequence number of the block
        sequence: u64,
    },

    /// The payload line is not exactly 3600 bytes long.
    BlockPayloadLength {
        /// Sequence number of the block
        sequence: u64,
        /// Line length in bytes
        actual: usize,
    },

    /// The payload holds a byte that is not a hex digit.
    InvalidPayloadDigit {
        /// Sequence number of the block
        sequence: u64,
        /// Byte position within the payload
        position: usize,
    },

    /// Strict sequence checking found a block that does not follow its
    /// predecessor.
    SequenceOutOfOrder {
        /// Sequence number of the previous block
        previous: u64,
        /// Sequence number that was found
        found: u64,
    },

    /// A day window has a base hour outside `0..=23` or a period outside
    /// `1..=24`.
    InvalidDayWindow {
        /// Requested window start hour
        base_hour: i64,
        /// Requested window length in hours
        period_hours: i64,
    },

    /// JSON serialization or deserialization failed.
    Serialization(String),
}

impl Error {
    /// Sequence number of the block that caused the error, if any.
    pub fn sequence(&self) -> Option<u64> {
        match self {
            Error::MalformedBlock { sequence, .. } => *sequence,
            Error::BlockTimestamp { sequence }
            | Error::InvalidTimestamp { sequence, .. }
            | Error::BlockSamplingRate { sequence, .. }
            | Error::BlockPayload { sequence }
            | Error::BlockPayloadLength { sequence, .. }
            | Error::InvalidPayloadDigit { sequence, .. } => Some(*sequence),
            Error::SequenceOutOfOrder { found, .. } => Some(*found),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IOError(e) => write!(f, "I/O error: {e}"),
            Error::MalformedHeader { line, reason } => {
                write!(f, "Malformed header at line {line}: {reason}")
            }
            Error::MalformedBlock {
                sequence: Some(sequence),
                line,
                reason,
            } => write!(f, "Malformed block {sequence} at line {line}: {reason}"),
            Error::MalformedBlock {
                sequence: None,
                line,
                reason,
            } => write!(f, "Malformed block at line {line}: {reason}"),
            Error::BlockTimestamp { sequence } => {
                write!(f, "Block ({sequence}) timestamp line could not be read")
            }
            Error::InvalidTimestamp { sequence, value } => {
                write!(f, "Block ({sequence}) has an invalid timestamp: {value:?}")
            }
            Error::BlockSamplingRate {
                sequence,
                block_rate,
                file_rate,
            } => write!(
                f,
                "Block ({sequence}) fs [{block_rate:.2}] is not the same as header fs [{file_rate:.2}], and the sampling rate was already corrected once"
            ),
            Error::BlockPayload { sequence } => {
                write!(f, "Block ({sequence}) data line could not be read")
            }
            Error::BlockPayloadLength { sequence, actual } => write!(
                f,
                "Block ({sequence}) data line has {actual} bytes, expected {}",
                crate::blocks::PAYLOAD_LEN
            ),
            Error::InvalidPayloadDigit { sequence, position } => write!(
                f,
                "Block ({sequence}) data line has a non-hex byte at position {position}"
            ),
            Error::SequenceOutOfOrder { previous, found } => write!(
                f,
                "Block sequence number {found} does not follow previous block {previous}"
            ),
            Error::InvalidDayWindow {
                base_hour,
                period_hours,
            } => write!(
                f,
                "Invalid day window: base {base_hour} must be in [0, 23] and period {period_hours} in [1, 24]"
            ),
            Error::Serialization(s) => write!(f, "Serialization error: {s}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IOError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IOError(err)
    }
}

/// A specialized Result type for `.bin` operations.
///
/// This is defined as `core::result::Result<T, Error>` for convenience.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_of_block_errors() {
        assert_eq!(Error::BlockPayload { sequence: 7 }.sequence(), Some(7));
        assert_eq!(
            Error::SequenceOutOfOrder {
                previous: 4,
                found: 2
            }
            .sequence(),
            Some(2)
        );
        let header = Error::MalformedHeader {
            line: 20,
            reason: "missing ':'".into(),
        };
        assert_eq!(header.sequence(), None);
    }

    #[test]
    fn test_display_sampling_rate() {
        let err = Error::BlockSamplingRate {
            sequence: 3,
            block_rate: 50.0,
            file_rate: 75.0,
        };
        assert!(err.to_string().starts_with("Block (3) fs [50.00]"));
    }
}
