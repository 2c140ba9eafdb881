#![forbid(unsafe_code)]

//! # geneactiv-rs
//!
//! A Rust library for reading and writing GENEActiv `.bin` accelerometer
//! recordings.
//!
//! Despite the extension, a `.bin` file is line-oriented text: a 59-line
//! header with device and calibration information, followed by fixed 10-line
//! blocks ("pages"). Each block carries a sequence number, a timestamp, one
//! temperature reading, the block's sampling rate and 300 samples packed as
//! 3600 hex characters.
//!
//! ## Features
//!
//! - **Reading**: Decode calibrated x/y/z acceleration, light, temperature and
//!   per-sample UTC timestamps into flat parallel buffers
//! - **Sampling rate reconciliation**: A single header/block disagreement is
//!   corrected with a warning; a second one stops the read
//! - **Day indexing**: Start/stop sample indices for daily windows, computed
//!   while blocks stream in
//! - **Partial results**: A failed read still hands back every block decoded
//!   before the failure
//! - **Writing**: Produce `.bin` files with [`BinWriter`]
//!
//! ## Quick Start
//!
//! ### Reading a recording
//!
//! ```no_run
//! use geneactiv_rs::{Result, read_bin_file};
//!
//! fn main() -> Result<()> {
//!     let recording = read_bin_file("subject_01.bin")?;
//!
//!     println!("{} Hz", recording.info().sampling_rate_hz);
//!     for warning in recording.warnings() {
//!         println!("{warning}");
//!     }
//!     for (start, stop) in recording.days()[0].ranges() {
//!         println!("day: samples {start}..{stop}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Keeping what decoded before a failure
//!
//! ```no_run
//! use geneactiv_rs::read_bin_file;
//!
//! match read_bin_file("damaged.bin") {
//!     Ok(recording) => println!("{} samples", recording.samples_written()),
//!     Err(failure) => {
//!         eprintln!("block {:?}: {}", failure.sequence(), failure.error());
//!         if let Some(partial) = failure.partial() {
//!             println!("{} blocks recovered", partial.blocks_read());
//!         }
//!     }
//! }
//! ```
//!
//! ### Custom day windows
//!
//! ```no_run
//! use geneactiv_rs::{BinReader, Result};
//!
//! fn main() -> Result<()> {
//!     // Calendar days plus 08:00-20:00 and 20:00-08:00 windows.
//!     let recording = BinReader::builder()
//!         .window(8, 12)
//!         .window(20, 12)
//!         .strict()
//!         .open("subject_01.bin")?
//!         .read_all()?;
//!
//!     assert_eq!(recording.days().len(), 3);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`blocks`] | Header and block text layouts |
//! | [`parsing`] | Payload decoding, calibration and timestamps |
//! | [`reader`] | Sequential reading with [`BinReader`] |
//! | [`index`] | Day-boundary indexing |
//! | [`writer`] | File creation with [`BinWriter`] |
//! | [`error`] | Error types and [`Result`] alias |
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`], which is an alias for
//! `std::result::Result<T, Error>`. Whole-file reads return a [`ReadFailure`]
//! instead, which wraps the [`Error`] together with the partial recording.
//!
//! ## Logging
//!
//! Warnings (sampling rate corrections, truncated files, unexpected file
//! extensions) and progress details go through the [`log`] facade. Install
//! any `log` implementation to see them.

pub mod blocks;
pub mod parsing;

mod types;

pub mod error;
pub mod index;
pub mod reader;
pub mod writer;

// Re-export commonly used types at the crate root
pub use blocks::{BlockAnchor, FileInfo, RawBlock, RawSample};
pub use error::{Error, Result};
pub use index::{BlockContext, DayIndex, DayIndexer, DayWindow, DayWindowIndexer};
pub use parsing::{BlockTime, DecodedBlock, SamplingRateWarning, TimeOfDay};
pub use reader::{
    BinReader, BinReaderBuilder, BlockOutcome, ReadFailure, ReaderConfig, Recording,
    RecordingSummary, SequencePolicy, read_bin_file,
};
pub use types::{Sample, SampleBuffers};
pub use writer::BinWriter;
