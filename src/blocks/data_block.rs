// src/blocks/data_block.rs
use super::{BLOCK_LINES, PAYLOAD_LEN, SAMPLES_PER_BLOCK};
use crate::{
    Error, Result,
    blocks::common::{
        BLOCK_FIELDS, BlockField, extract, parse_leading_float, parse_leading_int, read_line,
        read_line_bytes,
    },
    parsing::timestamp::BlockTime,
};
use core::fmt::Write as _;
use std::io::BufRead;

/// Lines written for block positions that carry no decoded value.
const BLOCK_TEMPLATE: [&str; BLOCK_LINES] = [
    "Recorded Data",
    "Device Unique Serial Code:000000",
    "Sequence Number:",
    "Page Time:",
    "Unassigned:",
    "Temperature:",
    "Battery voltage:4.1",
    "Device Status:Recording",
    "Measurement Frequency:",
    "",
];

/// The raw per-block values: one timestamp anchor, one temperature reading,
/// the block's own sampling rate and the hex payload.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockAnchor {
    /// Block sequence number (0-based).
    pub sequence: u64,
    /// The full timestamp line, e.g. `Page Time:2020-01-01 00:00:00:000`.
    pub time_line: String,
    /// Temperature reading shared by every sample of the block.
    pub temperature: f64,
    /// Sampling rate recorded in the block.
    pub sampling_rate: f64,
    /// 3600 hex characters; empty until [`BlockAnchor::read_payload`] runs.
    pub payload: String,
}

impl BlockAnchor {
    /// Read the nine metadata lines of the next block.
    ///
    /// # Returns
    /// `Ok(None)` if the input ends exactly at a block boundary. A block that
    /// ends anywhere else fails: [`Error::BlockTimestamp`] if the timestamp line
    /// is missing, [`Error::MalformedBlock`] for any other line.
    pub fn read_metadata<R: BufRead>(reader: &mut R) -> Result<Option<Self>> {
        let mut buf = String::new();
        let mut sequence: Option<u64> = None;
        let mut time_line = None;
        let mut temperature = None;
        let mut sampling_rate = None;

        for line in 1..BLOCK_LINES {
            let spec = BLOCK_FIELDS.iter().find(|spec| spec.line == line);

            if !read_line(reader, &mut buf)? {
                if line == 1 {
                    return Ok(None);
                }
                return Err(match (spec.map(|s| s.field), sequence) {
                    (Some(BlockField::Timestamp), Some(sequence)) => {
                        Error::BlockTimestamp { sequence }
                    }
                    _ => Error::MalformedBlock {
                        sequence,
                        line,
                        reason: format!("block ends after {} lines", line - 1),
                    },
                });
            }

            let Some(spec) = spec else {
                continue;
            };
            let malformed = |reason: String| Error::MalformedBlock {
                sequence,
                line,
                reason,
            };
            let text = extract(&buf, spec.extract)
                .ok_or_else(|| malformed(format!("line too short for {:?}: {buf:?}", spec.label)))?;

            match spec.field {
                BlockField::Sequence => {
                    let value = parse_leading_int(text)
                        .and_then(|n| u64::try_from(n).ok())
                        .ok_or_else(|| malformed(format!("invalid sequence number {text:?}")))?;
                    sequence = Some(value);
                }
                BlockField::Timestamp => time_line = Some(buf.clone()),
                BlockField::Temperature => {
                    temperature = Some(
                        parse_leading_float(text)
                            .ok_or_else(|| malformed(format!("invalid temperature {text:?}")))?,
                    );
                }
                BlockField::SamplingRate => {
                    sampling_rate = Some(
                        parse_leading_float(text)
                            .ok_or_else(|| malformed(format!("invalid sampling rate {text:?}")))?,
                    );
                }
                BlockField::Payload => {}
            }
        }

        match (sequence, time_line, temperature, sampling_rate) {
            (Some(sequence), Some(time_line), Some(temperature), Some(sampling_rate)) => {
                Ok(Some(Self {
                    sequence,
                    time_line,
                    temperature,
                    sampling_rate,
                    payload: String::new(),
                }))
            }
            _ => Err(Error::MalformedBlock {
                sequence,
                line: BLOCK_LINES - 1,
                reason: "block metadata incomplete".to_string(),
            }),
        }
    }

    /// Read the payload line that follows the metadata.
    pub fn read_payload<R: BufRead>(&mut self, reader: &mut R) -> Result<()> {
        self.payload = read_payload(reader, self.sequence)?;
        Ok(())
    }
}

/// Read one payload line and check that it holds exactly [`PAYLOAD_LEN`] hex
/// digits.
///
/// # Returns
/// [`Error::BlockPayload`] at end of input, [`Error::BlockPayloadLength`] for a
/// line of the wrong length and [`Error::InvalidPayloadDigit`] for the first
/// byte that is not a hex digit.
pub fn read_payload<R: BufRead>(reader: &mut R, sequence: u64) -> Result<String> {
    let mut bytes = Vec::with_capacity(PAYLOAD_LEN + 2);
    if !read_line_bytes(reader, &mut bytes)? {
        return Err(Error::BlockPayload { sequence });
    }
    if bytes.len() != PAYLOAD_LEN {
        return Err(Error::BlockPayloadLength {
            sequence,
            actual: bytes.len(),
        });
    }
    if let Some(position) = bytes.iter().position(|b| !b.is_ascii_hexdigit()) {
        return Err(Error::InvalidPayloadDigit { sequence, position });
    }
    String::from_utf8(bytes).map_err(|e| Error::InvalidPayloadDigit {
        sequence,
        position: e.utf8_error().valid_up_to(),
    })
}

/// One undecoded sample: three 12-bit two's complement axes and a 12-bit
/// light word whose low 2 bits are status flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawSample {
    /// x, y, z in `-2048..=2047`; wider values wrap to 12 bits.
    pub axes: [i16; 3],
    /// Raw light word in `0..=0xFFF`.
    pub light: u16,
}

impl RawSample {
    /// Append the 12 hex characters of this sample to `out`.
    pub fn write_hex(&self, out: &mut String) {
        for axis in self.axes {
            let _ = write!(out, "{:03X}", (axis as u16) & 0xFFF);
        }
        let _ = write!(out, "{:03X}", self.light & 0xFFF);
    }
}

/// An undecoded block, as written by [`crate::BinWriter`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawBlock {
    pub sequence: u64,
    pub time: BlockTime,
    pub temperature: f64,
    pub sampling_rate: f64,
    /// Exactly [`SAMPLES_PER_BLOCK`] samples.
    pub samples: Vec<RawSample>,
}

impl RawBlock {
    /// A block whose samples are all `sample`.
    pub fn filled(
        sequence: u64,
        time: BlockTime,
        temperature: f64,
        sampling_rate: f64,
        sample: RawSample,
    ) -> Self {
        Self {
            sequence,
            time,
            temperature,
            sampling_rate,
            samples: vec![sample; SAMPLES_PER_BLOCK],
        }
    }

    /// Serialize the block into its [`BLOCK_LINES`] text lines.
    pub fn to_lines(&self) -> Result<Vec<String>> {
        if self.samples.len() != SAMPLES_PER_BLOCK {
            return Err(Error::BlockPayloadLength {
                sequence: self.sequence,
                actual: self.samples.len() * super::CHARS_PER_SAMPLE,
            });
        }

        let mut lines: Vec<String> = BLOCK_TEMPLATE.iter().map(|s| s.to_string()).collect();
        for spec in BLOCK_FIELDS {
            let line = &mut lines[spec.line - 1];
            match spec.field {
                BlockField::Sequence => *line = format!("{}{}", spec.label, self.sequence),
                BlockField::Timestamp => *line = format!("{}{}", spec.label, self.time),
                BlockField::Temperature => *line = format!("{}{}", spec.label, self.temperature),
                BlockField::SamplingRate => {
                    *line = format!("{}{}", spec.label, self.sampling_rate)
                }
                BlockField::Payload => {
                    line.clear();
                    line.reserve(PAYLOAD_LEN);
                    for sample in &self.samples {
                        sample.write_hex(line);
                    }
                }
            }
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn time() -> BlockTime {
        BlockTime {
            year: 2020,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            microsecond: 0,
        }
    }

    fn block_text(block: &RawBlock) -> String {
        let mut text = block.to_lines().unwrap().join("\n");
        text.push('\n');
        text
    }

    #[test]
    fn test_write_hex_wraps_negative_axes() {
        let mut out = String::new();
        RawSample {
            axes: [-1, -2048, 2047],
            light: 0x3FF,
        }
        .write_hex(&mut out);
        assert_eq!(out, "FFF8007FF3FF");
    }

    #[test]
    fn test_metadata_and_payload() -> Result<()> {
        let block = RawBlock::filled(4, time(), 21.5, 100.0, RawSample::default());
        let mut reader = Cursor::new(block_text(&block));

        let mut anchor = BlockAnchor::read_metadata(&mut reader)?.unwrap();
        assert_eq!(anchor.sequence, 4);
        assert_eq!(anchor.time_line, "Page Time:2020-01-01 00:00:00:000");
        assert_eq!(anchor.temperature, 21.5);
        assert_eq!(anchor.sampling_rate, 100.0);

        anchor.read_payload(&mut reader)?;
        assert_eq!(anchor.payload, "0".repeat(PAYLOAD_LEN));
        assert!(BlockAnchor::read_metadata(&mut reader)?.is_none());
        Ok(())
    }

    #[test]
    fn test_missing_timestamp_line() {
        let text = "Recorded Data\nDevice Unique Serial Code:1\nSequence Number:9\n";
        let err = BlockAnchor::read_metadata(&mut Cursor::new(text)).unwrap_err();
        assert!(matches!(err, Error::BlockTimestamp { sequence: 9 }));
    }

    #[test]
    fn test_truncated_before_sequence() {
        let text = "Recorded Data\n";
        let err = BlockAnchor::read_metadata(&mut Cursor::new(text)).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedBlock {
                sequence: None,
                line: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_payload_line() {
        let err = read_payload(&mut Cursor::new(""), 3).unwrap_err();
        assert!(matches!(err, Error::BlockPayload { sequence: 3 }));
    }

    #[test]
    fn test_payload_length_boundaries() {
        for len in [PAYLOAD_LEN - 1, PAYLOAD_LEN + 1] {
            let text = format!("{}\n", "0".repeat(len));
            let err = read_payload(&mut Cursor::new(text), 0).unwrap_err();
            assert!(matches!(err, Error::BlockPayloadLength { actual, .. } if actual == len));
        }
        let text = format!("{}\r\n", "0".repeat(PAYLOAD_LEN));
        assert!(read_payload(&mut Cursor::new(text), 0).is_ok());
    }

    #[test]
    fn test_non_ascii_payload_byte() {
        let mut bytes = vec![b'0'; PAYLOAD_LEN];
        bytes[25] = 0xFF;
        bytes.extend_from_slice(b"\r\n");
        let err = read_payload(&mut Cursor::new(bytes), 6).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidPayloadDigit {
                sequence: 6,
                position: 25
            }
        ));
    }

    #[test]
    fn test_invalid_utf8_in_temperature_keeps_sequence() {
        let text = b"Recorded Data\nSerial:1\nSequence Number:5\nPage Time:2020-01-01 00:00:00:000\nUnassigned:\nTemperature:\xFF\n".to_vec();
        let err = BlockAnchor::read_metadata(&mut Cursor::new(text)).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedBlock {
                sequence: Some(5),
                line: 6,
                ..
            }
        ));
    }

    #[test]
    fn test_wrong_sample_count_not_written() {
        let mut block = RawBlock::filled(0, time(), 20.0, 100.0, RawSample::default());
        block.samples.pop();
        assert!(block.to_lines().is_err());
    }
}
