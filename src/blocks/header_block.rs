// src/blocks/header_block.rs
use super::HEADER_LINES;
use crate::{
    Error, Result,
    blocks::common::{Extract, HEADER_FIELDS, HeaderField, extract, parse_leading_int, read_line},
};
use std::io::BufRead;

/// Lines written for header positions that carry no decoded value.
const HEADER_TEMPLATE: [&str; HEADER_LINES] = [
    "Device Identity",
    "Device Unique Serial Code:000000",
    "Device Type:GENEActiv",
    "Device Model:1.1",
    "Device Firmware:Ver06.17 15June2015",
    "Calibration Date:2015-06-24 10:57:27:000",
    "",
    "Device Capabilities",
    "Accelerometer Range:-8 to 8",
    "Accelerometer Resolution:0.0039",
    "Accelerometer Units:g",
    "Light Meter Range:0 to 5000",
    "Light Meter Resolution:5",
    "Light Meter Units:lux",
    "Temperature Sensor Range:0 to 60",
    "Temperature Sensor Resolution:0.25",
    "Temperature Sensor Units:deg. C",
    "",
    "Configuration Info",
    "Measurement Frequency:",
    "Measurement Period:168 Hours",
    "Start Time:2000-01-01 00:00:00:000",
    "Study Centre:",
    "Study Code:",
    "Investigator ID:",
    "Exercise Type:",
    "Config Operator ID:",
    "Config Time:2000-01-01 00:00:00:000",
    "Config Notes:",
    "Extract Operator ID:",
    "Extract Time:2000-01-01 00:00:00:000",
    "Extract Notes:",
    "",
    "Subject Info",
    "Device Location Code:left wrist",
    "Subject Code:",
    "Date of Birth:",
    "Sex:",
    "Height:",
    "Weight:",
    "Handedness Code:",
    "Subject Notes:",
    "",
    "Trial Info",
    "Trial Notes:",
    "",
    "Calibration Data",
    "x gain:",
    "x offset:",
    "y gain:",
    "y offset:",
    "z gain:",
    "z offset:",
    "Volts:",
    "Lux:",
    "",
    "Memory Status",
    "Number of Pages:",
    "",
];

/// Per-file decoding context read from the 59-line header.
///
/// One `FileInfo` lives for the whole read and is passed explicitly to every
/// block decode. The sampling rate may be corrected once from block data;
/// `fs_mismatch_count` records that this happened.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileInfo {
    /// Sampling rate in Hz.
    pub sampling_rate_hz: f64,
    /// Per-axis gain (x, y, z). Never zero.
    pub gain: [f64; 3],
    /// Per-axis offset (x, y, z).
    pub offset: [f64; 3],
    /// Light channel voltage scale. Never zero.
    pub volts: f64,
    /// Light channel lux scale.
    pub lux: f64,
    /// Number of blocks the header declares.
    pub declared_block_count: u64,
    /// Highest block sequence number decoded so far.
    pub max_sequence_seen: Option<u64>,
    /// Number of blocks whose sampling rate disagreed with the file's.
    pub fs_mismatch_count: u32,
}

impl FileInfo {
    /// Read exactly [`HEADER_LINES`] lines from `reader` and extract the
    /// calibration constants.
    ///
    /// The reader is left positioned at the first block.
    ///
    /// # Returns
    /// A [`FileInfo`] or [`Error::MalformedHeader`] if the header is short or a
    /// field cannot be parsed.
    pub fn read_from<R: BufRead>(reader: &mut R) -> Result<Self> {
        let mut lines = Vec::with_capacity(HEADER_LINES);
        let mut buf = String::new();
        for line in 1..=HEADER_LINES {
            if !read_line(reader, &mut buf)? {
                return Err(Error::MalformedHeader {
                    line,
                    reason: format!("file ends after {} header lines", line - 1),
                });
            }
            lines.push(buf.clone());
        }
        Self::from_lines(&lines)
    }

    /// Extract the header fields from already-split header lines.
    ///
    /// `lines[0]` is header line 1.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Result<Self> {
        if lines.len() < HEADER_LINES {
            return Err(Error::MalformedHeader {
                line: lines.len() + 1,
                reason: format!("expected {HEADER_LINES} header lines, got {}", lines.len()),
            });
        }

        let mut info = FileInfo {
            sampling_rate_hz: 0.0,
            gain: [0.0; 3],
            offset: [0.0; 3],
            volts: 0.0,
            lux: 0.0,
            declared_block_count: 0,
            max_sequence_seen: None,
            fs_mismatch_count: 0,
        };

        for spec in HEADER_FIELDS {
            let line = lines[spec.line - 1].as_ref();
            let text = extract(line, spec.extract).ok_or_else(|| Error::MalformedHeader {
                line: spec.line,
                reason: match spec.extract {
                    Extract::Column(column) => {
                        format!("line is shorter than value column {column}: {line:?}")
                    }
                    _ => format!("missing ':' delimiter: {line:?}"),
                },
            })?;
            let value = parse_leading_int(text).ok_or_else(|| Error::MalformedHeader {
                line: spec.line,
                reason: format!("no number in {:?} value {text:?}", spec.label),
            })?;

            match spec.field {
                HeaderField::SamplingRate => info.sampling_rate_hz = value as f64,
                HeaderField::Gain(axis) => info.gain[axis] = value as f64,
                HeaderField::Offset(axis) => info.offset[axis] = value as f64,
                HeaderField::Volts => info.volts = value as f64,
                HeaderField::Lux => info.lux = value as f64,
                HeaderField::BlockCount => {
                    // Every declared block must have addressable sample slots.
                    info.declared_block_count = u64::try_from(value)
                        .ok()
                        .filter(|&count| samples_for_blocks(count).is_some())
                        .ok_or_else(|| Error::MalformedHeader {
                            line: spec.line,
                            reason: format!("block count {value} out of range"),
                        })?
                }
            }
        }

        info.validate()?;
        Ok(info)
    }

    /// Check the values that later act as divisors or set the time base.
    fn validate(&self) -> Result<()> {
        for spec in HEADER_FIELDS {
            let reason = match spec.field {
                HeaderField::SamplingRate if self.sampling_rate_hz <= 0.0 => "must be positive",
                HeaderField::Gain(axis) if self.gain[axis] == 0.0 => "must not be zero",
                HeaderField::Volts if self.volts == 0.0 => "must not be zero",
                _ => continue,
            };
            return Err(Error::MalformedHeader {
                line: spec.line,
                reason: format!("{:?} {reason}", spec.label),
            });
        }
        Ok(())
    }

    /// Serialize the decoded fields back into a 59-line header.
    ///
    /// Every value is written at the position it is read from, so
    /// `FileInfo::from_lines(&info.to_lines())` restores the calibration
    /// constants and block count. Calibration values are stored as integers in
    /// the file; fractional parts do not survive a round trip.
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = HEADER_TEMPLATE.iter().map(|s| s.to_string()).collect();
        for spec in HEADER_FIELDS {
            let value = match spec.field {
                HeaderField::SamplingRate => format!("{} Hz", self.sampling_rate_hz),
                HeaderField::Gain(axis) => self.gain[axis].to_string(),
                HeaderField::Offset(axis) => self.offset[axis].to_string(),
                HeaderField::Volts => self.volts.to_string(),
                HeaderField::Lux => self.lux.to_string(),
                HeaderField::BlockCount => self.declared_block_count.to_string(),
            };
            lines[spec.line - 1] = match spec.extract {
                Extract::KeyValue => format!("{}:{value}", spec.label),
                _ => format!("{}{value}", spec.label),
            };
        }
        lines
    }

    /// Total sample slots implied by the declared block count, saturating at
    /// `usize::MAX` for a hand-built count too large to address.
    pub fn declared_samples(&self) -> usize {
        samples_for_blocks(self.declared_block_count).unwrap_or(usize::MAX)
    }
}

/// Number of sample slots in `blocks` whole blocks, if it fits in `usize`.
pub fn samples_for_blocks(blocks: u64) -> Option<usize> {
    usize::try_from(blocks).ok()?.checked_mul(super::SAMPLES_PER_BLOCK)
}
