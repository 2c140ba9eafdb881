// src/blocks/mod.rs

// ============================================================================
// Layout Constants
// ============================================================================
// A .bin file is a fixed 59-line header followed by fixed 10-line blocks.
// Nothing in the file announces these sizes; they are implied by line counts.

/// Number of text lines in the file header.
pub const HEADER_LINES: usize = 59;

/// Number of text lines in one data block, payload line included.
pub const BLOCK_LINES: usize = 10;

/// Number of samples encoded in one block payload.
pub const SAMPLES_PER_BLOCK: usize = 300;

/// Hex characters per sample: three 12-bit axes and one 12-bit light word.
pub const CHARS_PER_SAMPLE: usize = 12;

/// Exact length of a block payload line, excluding the line terminator.
pub const PAYLOAD_LEN: usize = SAMPLES_PER_BLOCK * CHARS_PER_SAMPLE;

// ============================================================================
// Submodules
// ============================================================================

mod common;
mod data_block;
mod header_block;

// Re-export common types
pub use common::{
    BLOCK_FIELDS, BlockField, Extract, FieldSpec, HEADER_FIELDS, HeaderField, TIMESTAMP_FIELDS,
    TimeField, TimeFieldSpec, extract, parse_leading_float, parse_leading_int,
};
pub(crate) use common::{read_line, read_line_bytes};

// Re-export block types
pub use data_block::{BlockAnchor, RawBlock, RawSample, read_payload};
pub use header_block::{FileInfo, samples_for_blocks};
