// blocks/common.rs
//! Field extraction tables and text parsing helpers shared by the header and
//! block parsers.
//!
//! This module provides:
//! - [`HEADER_FIELDS`], [`BLOCK_FIELDS`], [`TIMESTAMP_FIELDS`]: where every value
//!   lives in the text layout, as data rather than code
//! - [`extract`]: pull the value text out of a line per [`Extract`]
//! - [`parse_leading_int`] / [`parse_leading_float`]: numeric prefix parsing
//! - [`read_line`]: line reading with terminator stripping

use crate::Result;
use std::io::BufRead;

// ============================================================================
// Field Tables
// ============================================================================

/// How the value of a field is located on its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extract {
    /// Everything after the first `:` on the line.
    KeyValue,
    /// Everything from a fixed character column onwards.
    ///
    /// Used where the label itself may contain colons or where the value is
    /// read directly after a known label.
    Column(usize),
    /// The whole line, consumed as a unit by a later stage.
    WholeLine,
}

/// Location of one field in a fixed text layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec<F> {
    /// Which value this is.
    pub field: F,
    /// 1-based line number within the header or block.
    pub line: usize,
    /// How to find the value on that line.
    pub extract: Extract,
    /// Label written in front of the value. For [`Extract::Column`] the label
    /// spans exactly the columns before the value.
    pub label: &'static str,
}

/// Values extracted from the file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    SamplingRate,
    Gain(usize),
    Offset(usize),
    Volts,
    Lux,
    BlockCount,
}

/// Values extracted from each data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockField {
    Sequence,
    Timestamp,
    Temperature,
    SamplingRate,
    Payload,
}

/// Header field locations, in file order.
pub const HEADER_FIELDS: [FieldSpec<HeaderField>; 10] = [
    FieldSpec {
        field: HeaderField::SamplingRate,
        line: 20,
        extract: Extract::KeyValue,
        label: "Measurement Frequency",
    },
    FieldSpec {
        field: HeaderField::Gain(0),
        line: 48,
        extract: Extract::KeyValue,
        label: "x gain",
    },
    FieldSpec {
        field: HeaderField::Offset(0),
        line: 49,
        extract: Extract::KeyValue,
        label: "x offset",
    },
    FieldSpec {
        field: HeaderField::Gain(1),
        line: 50,
        extract: Extract::KeyValue,
        label: "y gain",
    },
    FieldSpec {
        field: HeaderField::Offset(1),
        line: 51,
        extract: Extract::KeyValue,
        label: "y offset",
    },
    FieldSpec {
        field: HeaderField::Gain(2),
        line: 52,
        extract: Extract::KeyValue,
        label: "z gain",
    },
    FieldSpec {
        field: HeaderField::Offset(2),
        line: 53,
        extract: Extract::KeyValue,
        label: "z offset",
    },
    FieldSpec {
        field: HeaderField::Volts,
        line: 54,
        extract: Extract::Column(6),
        label: "Volts:",
    },
    FieldSpec {
        field: HeaderField::Lux,
        line: 55,
        extract: Extract::Column(4),
        label: "Lux:",
    },
    FieldSpec {
        field: HeaderField::BlockCount,
        line: 58,
        extract: Extract::Column(16),
        label: "Number of Pages:",
    },
];

/// Block field locations, in file order.
pub const BLOCK_FIELDS: [FieldSpec<BlockField>; 5] = [
    FieldSpec {
        field: BlockField::Sequence,
        line: 3,
        extract: Extract::Column(16),
        label: "Sequence Number:",
    },
    FieldSpec {
        field: BlockField::Timestamp,
        line: 4,
        extract: Extract::WholeLine,
        label: "Page Time:",
    },
    FieldSpec {
        field: BlockField::Temperature,
        line: 6,
        extract: Extract::Column(12),
        label: "Temperature:",
    },
    FieldSpec {
        field: BlockField::SamplingRate,
        line: 9,
        extract: Extract::Column(22),
        label: "Measurement Frequency:",
    },
    FieldSpec {
        field: BlockField::Payload,
        line: 10,
        extract: Extract::WholeLine,
        label: "",
    },
];

/// Calendar components of a block timestamp line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeField {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    /// Digit run of any length; read as a decimal fraction of a second.
    Fraction,
}

/// Character span of one timestamp component. `end` is `None` for an
/// open-ended digit run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFieldSpec {
    pub field: TimeField,
    pub start: usize,
    pub end: Option<usize>,
}

/// Timestamp component spans within `Page Time:YYYY-MM-DD hh:mm:ss:fff`.
pub const TIMESTAMP_FIELDS: [TimeFieldSpec; 7] = [
    TimeFieldSpec {
        field: TimeField::Year,
        start: 10,
        end: Some(14),
    },
    TimeFieldSpec {
        field: TimeField::Month,
        start: 15,
        end: Some(17),
    },
    TimeFieldSpec {
        field: TimeField::Day,
        start: 18,
        end: Some(20),
    },
    TimeFieldSpec {
        field: TimeField::Hour,
        start: 21,
        end: Some(23),
    },
    TimeFieldSpec {
        field: TimeField::Minute,
        start: 24,
        end: Some(26),
    },
    TimeFieldSpec {
        field: TimeField::Second,
        start: 27,
        end: Some(29),
    },
    TimeFieldSpec {
        field: TimeField::Fraction,
        start: 30,
        end: None,
    },
];

// ============================================================================
// Extraction & Parsing Helpers
// ============================================================================

/// Return the value text of `line` according to `how`.
///
/// Returns `None` when a [`Extract::KeyValue`] line has no `:` or a
/// [`Extract::Column`] line is shorter than the column.
#[inline]
pub fn extract(line: &str, how: Extract) -> Option<&str> {
    match how {
        Extract::KeyValue => line.split_once(':').map(|(_, value)| value),
        Extract::Column(column) => line.get(column..),
        Extract::WholeLine => Some(line),
    }
}

/// Length of the numeric prefix of `bytes` starting at `start`, accepting an
/// optional sign followed by digits. Returns the end index and whether any
/// digit was seen.
fn scan_digits(bytes: &[u8], start: usize) -> (usize, bool) {
    let mut end = start;
    if matches!(bytes.get(end), Some(b'+' | b'-')) {
        end += 1;
    }
    let digits_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    (end, end > digits_start)
}

/// Parse the base-10 integer at the start of `text`.
///
/// Leading whitespace is skipped and parsing stops at the first character
/// that cannot continue the number, so `" 100 Hz"` yields `100`. Returns
/// `None` if no digit is found or the value overflows.
pub fn parse_leading_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (end, any) = scan_digits(text.as_bytes(), 0);
    if !any {
        return None;
    }
    text[..end].parse().ok()
}

/// Parse the decimal floating-point number at the start of `text`.
///
/// Accepts an optional sign, digits with an optional fractional part, and an
/// optional exponent. Leading whitespace is skipped and trailing text is
/// ignored, so `"21.5 C"` yields `21.5`.
pub fn parse_leading_float(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let (mut end, mut any) = scan_digits(bytes, 0);
    if bytes.get(end) == Some(&b'.') {
        let fraction_start = end + 1;
        let mut fraction_end = fraction_start;
        while bytes.get(fraction_end).is_some_and(u8::is_ascii_digit) {
            fraction_end += 1;
        }
        any |= fraction_end > fraction_start;
        end = fraction_end;
    }
    if !any {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let (exp_end, exp_any) = scan_digits(bytes, end + 1);
        if exp_any {
            end = exp_end;
        }
    }
    text[..end].parse().ok()
}

/// Read one raw line into `buf`, stripping the `\n` or `\r\n` terminator.
///
/// Returns `Ok(false)` at end of input.
pub(crate) fn read_line_bytes<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> Result<bool> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(false);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(true)
}

/// Read one line into `buf` as text, stripping the terminator.
///
/// Bytes that are not valid UTF-8 become U+FFFD, so a damaged line fails
/// when its field is parsed rather than as an I/O error.
pub(crate) fn read_line<R: BufRead>(reader: &mut R, buf: &mut String) -> Result<bool> {
    let mut bytes = core::mem::take(buf).into_bytes();
    let more = read_line_bytes(reader, &mut bytes)?;
    *buf = String::from_utf8(bytes)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());
    Ok(more)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_column_labels_span_their_column() {
        for spec in HEADER_FIELDS {
            if let Extract::Column(column) = spec.extract {
                assert_eq!(spec.label.len(), column, "{:?}", spec.field);
            }
        }
        for spec in BLOCK_FIELDS {
            if let Extract::Column(column) = spec.extract {
                assert_eq!(spec.label.len(), column, "{:?}", spec.field);
            }
        }
    }

    #[test]
    fn test_header_fields_in_file_order() {
        assert!(HEADER_FIELDS.windows(2).all(|w| w[0].line < w[1].line));
        assert!(BLOCK_FIELDS.windows(2).all(|w| w[0].line < w[1].line));
        assert!(HEADER_FIELDS.iter().all(|f| f.line <= super::super::HEADER_LINES));
        assert!(BLOCK_FIELDS.iter().all(|f| f.line <= super::super::BLOCK_LINES));
    }

    #[test]
    fn test_extract() {
        assert_eq!(
            extract("Measurement Frequency:100 Hz", Extract::KeyValue),
            Some("100 Hz")
        );
        assert_eq!(
            extract("Calibration Date:2015-6-24 10:57:27:000", Extract::KeyValue),
            Some("2015-6-24 10:57:27:000")
        );
        assert_eq!(extract("x gain 25548", Extract::KeyValue), None);
        assert_eq!(extract("Volts:300", Extract::Column(6)), Some("300"));
        assert_eq!(extract("Lux", Extract::Column(4)), None);
    }

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int("100 Hz"), Some(100));
        assert_eq!(parse_leading_int("  -3730"), Some(-3730));
        assert_eq!(parse_leading_int("+12abc"), Some(12));
        assert_eq!(parse_leading_int("85.7 Hz"), Some(85));
        assert_eq!(parse_leading_int("Hz"), None);
        assert_eq!(parse_leading_int("-"), None);
        assert_eq!(parse_leading_int(""), None);
    }

    #[test]
    fn test_parse_leading_float() {
        assert_eq!(parse_leading_float("21.5"), Some(21.5));
        assert_eq!(parse_leading_float("100.00"), Some(100.0));
        assert_eq!(parse_leading_float(" 85.7 Hz"), Some(85.7));
        assert_eq!(parse_leading_float("-.5"), Some(-0.5));
        assert_eq!(parse_leading_float("1e2x"), Some(100.0));
        assert_eq!(parse_leading_float("3e"), Some(3.0));
        assert_eq!(parse_leading_float("."), None);
        assert_eq!(parse_leading_float("abc"), None);
    }

    #[test]
    fn test_read_line_strips_terminators() -> Result<()> {
        let mut reader = Cursor::new("first\r\nsecond\nlast");
        let mut buf = String::new();
        assert!(read_line(&mut reader, &mut buf)?);
        assert_eq!(buf, "first");
        assert!(read_line(&mut reader, &mut buf)?);
        assert_eq!(buf, "second");
        assert!(read_line(&mut reader, &mut buf)?);
        assert_eq!(buf, "last");
        assert!(!read_line(&mut reader, &mut buf)?);
        Ok(())
    }

    #[test]
    fn test_read_line_replaces_invalid_utf8() -> Result<()> {
        let mut reader = Cursor::new(b"Subject Notes:caf\xE9\r\nnext\n".to_vec());
        let mut buf = String::new();
        assert!(read_line(&mut reader, &mut buf)?);
        assert_eq!(buf, "Subject Notes:caf\u{FFFD}");
        assert!(read_line(&mut reader, &mut buf)?);
        assert_eq!(buf, "next");
        Ok(())
    }

    #[test]
    fn test_read_line_bytes_keeps_raw_bytes() -> Result<()> {
        let mut reader = Cursor::new(b"0A\xFF\r\n".to_vec());
        let mut buf = Vec::new();
        assert!(read_line_bytes(&mut reader, &mut buf)?);
        assert_eq!(buf, b"0A\xFF");
        assert!(!read_line_bytes(&mut reader, &mut buf)?);
        Ok(())
    }
}
