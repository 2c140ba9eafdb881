//! Shared helpers for building `.bin` recordings in memory.
#![allow(dead_code)]

use geneactiv_rs::{BinWriter, BlockTime, FileInfo, RawBlock, RawSample, Result};
use std::path::PathBuf;

/// 2020-01-01T00:00:00Z
pub const START: f64 = 1_577_836_800.0;

pub const HEADER_LINES: usize = 59;
pub const BLOCK_LINES: usize = 10;

/// Header with unit gain, zero offset and a 1000/300 light scale.
pub fn unit_info(blocks: u64) -> FileInfo {
    FileInfo {
        sampling_rate_hz: 100.0,
        gain: [1.0; 3],
        offset: [0.0; 3],
        volts: 300.0,
        lux: 1000.0,
        declared_block_count: blocks,
        max_sequence_seen: None,
        fs_mismatch_count: 0,
    }
}

/// Block `sequence` of a 100 Hz recording starting at `start`.
pub fn block_at(start: f64, sequence: u64, sample: RawSample) -> RawBlock {
    let time = BlockTime::from_epoch_seconds(start + sequence as f64 * 3.0)
        .expect("test times are representable");
    RawBlock::filled(sequence, time, 20.0, 100.0, sample)
}

pub fn block(sequence: u64, sample: RawSample) -> RawBlock {
    block_at(START, sequence, sample)
}

/// Render a recording as text lines, without terminators.
pub fn render(info: &FileInfo, blocks: &[RawBlock]) -> Result<Vec<String>> {
    let mut writer = BinWriter::new(Vec::new());
    writer.write_header(info)?;
    for block in blocks {
        writer.write_block(block)?;
    }
    let text = String::from_utf8(writer.finish()?).expect("writer emits UTF-8");
    let mut lines: Vec<String> = text.split("\r\n").map(str::to_string).collect();
    // The final terminator leaves an empty piece.
    lines.pop();
    Ok(lines)
}

/// Join lines back into file content.
pub fn join(lines: &[String]) -> String {
    lines.iter().map(|line| format!("{line}\r\n")).collect()
}

/// Index into rendered lines of `line` (1-based) of block number `index`.
pub fn block_line(index: usize, line: usize) -> usize {
    HEADER_LINES + index * BLOCK_LINES + line - 1
}

/// A path under the system temp directory, removed if it already exists.
pub fn temp_path(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(name);
    if path.exists() {
        let _ = std::fs::remove_file(&path);
    }
    path
}
