//! Per-sample timestamps from one timestamp anchor per block.
//!
//! Each block records a single wall-clock time for its first sample. All other
//! sample times are interpolated at the file's sampling rate:
//! `t[j] = epoch(anchor) + j / fs`.

use crate::{
    Error, Result,
    blocks::{TIMESTAMP_FIELDS, TimeField},
};
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use core::fmt;

/// Time of day of a block anchor, handed to day indexing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub microsecond: u32,
}

impl TimeOfDay {
    /// Seconds since midnight.
    pub fn seconds_since_midnight(&self) -> f64 {
        (self.hour * 3600 + self.minute * 60 + self.second) as f64
            + self.microsecond as f64 / 1_000_000.0
    }
}

/// Calendar fields of a block timestamp line, read as UTC wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub microsecond: u32,
}

impl BlockTime {
    /// Parse the fixed-column fields of a timestamp line such as
    /// `Page Time:2020-01-01 12:30:05:250`.
    ///
    /// Separators are not checked. The fractional field is a digit run of any
    /// length read as a decimal fraction of a second (resolution 1 µs); a
    /// missing fraction counts as zero.
    pub fn parse(line: &str) -> Option<Self> {
        let mut time = BlockTime {
            year: 0,
            month: 0,
            day: 0,
            hour: 0,
            minute: 0,
            second: 0,
            microsecond: 0,
        };

        for spec in TIMESTAMP_FIELDS {
            let Some(end) = spec.end else {
                let rest = line.get(spec.start..).unwrap_or("");
                let digits: Vec<u32> = rest.chars().map_while(|c| c.to_digit(10)).collect();
                time.microsecond = digits
                    .iter()
                    .take(6)
                    .zip([100_000, 10_000, 1_000, 100, 10, 1])
                    .map(|(d, scale)| d * scale)
                    .sum();
                continue;
            };

            let text = line.get(spec.start..end)?;
            if !text.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let value: u32 = text.parse().ok()?;
            match spec.field {
                TimeField::Year => time.year = value as i32,
                TimeField::Month => time.month = value,
                TimeField::Day => time.day = value,
                TimeField::Hour => time.hour = value,
                TimeField::Minute => time.minute = value,
                TimeField::Second => time.second = value,
                TimeField::Fraction => {}
            }
        }
        Some(time)
    }

    /// Convert to a UTC date-time, or `None` for an impossible calendar value.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let date = NaiveDate::from_ymd_opt(self.year, self.month, self.day)?;
        let naive = date.and_hms_micro_opt(self.hour, self.minute, self.second, self.microsecond)?;
        Some(naive.and_utc())
    }

    /// Seconds since the Unix epoch, with sub-second precision.
    pub fn epoch_seconds(&self) -> Option<f64> {
        let datetime = self.to_datetime()?;
        Some(datetime.timestamp() as f64 + self.microsecond as f64 / 1_000_000.0)
    }

    /// Build from seconds since the Unix epoch, rounded to the microsecond.
    pub fn from_epoch_seconds(seconds: f64) -> Option<Self> {
        let mut whole = seconds.floor();
        let mut micros = ((seconds - whole) * 1_000_000.0).round() as u32;
        if micros >= 1_000_000 {
            whole += 1.0;
            micros = 0;
        }
        let datetime = DateTime::<Utc>::from_timestamp(whole as i64, micros * 1_000)?;
        Some(Self::from(datetime))
    }

    pub fn time_of_day(&self) -> TimeOfDay {
        TimeOfDay {
            hour: self.hour,
            minute: self.minute,
            second: self.second,
            microsecond: self.microsecond,
        }
    }
}

impl From<DateTime<Utc>> for BlockTime {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self {
            year: datetime.year(),
            month: datetime.month(),
            day: datetime.day(),
            hour: datetime.hour(),
            minute: datetime.minute(),
            second: datetime.second(),
            microsecond: datetime.nanosecond() / 1_000,
        }
    }
}

impl fmt::Display for BlockTime {
    /// Formats as `YYYY-MM-DD hh:mm:ss:mmm`, the layout of a block time line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}:{:03}",
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            self.microsecond / 1_000
        )
    }
}

/// Fill `out` with `anchor + j / sampling_rate` for each index `j`.
#[inline]
pub fn expand_timestamps(anchor: f64, sampling_rate: f64, out: &mut [f64]) {
    for (j, slot) in out.iter_mut().enumerate() {
        *slot = anchor + j as f64 / sampling_rate;
    }
}

/// Parse a block's timestamp line and expand it into one timestamp per slot of
/// `out`.
///
/// # Returns
/// The anchor's time of day, or [`Error::InvalidTimestamp`] when the line does
/// not hold a valid calendar date and time.
pub fn block_timestamps(
    time_line: &str,
    sequence: u64,
    sampling_rate: f64,
    out: &mut [f64],
) -> Result<TimeOfDay> {
    let invalid = || Error::InvalidTimestamp {
        sequence,
        value: time_line.to_string(),
    };
    let time = BlockTime::parse(time_line).ok_or_else(invalid)?;
    let anchor = time.epoch_seconds().ok_or_else(invalid)?;
    expand_timestamps(anchor, sampling_rate, out);
    Ok(time.time_of_day())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEW_YEAR_2020: f64 = 1_577_836_800.0;

    #[test]
    fn test_parse_page_time() {
        let time = BlockTime::parse("Page Time:2019-10-03 15:29:01:500").unwrap();
        assert_eq!(
            time,
            BlockTime {
                year: 2019,
                month: 10,
                day: 3,
                hour: 15,
                minute: 29,
                second: 1,
                microsecond: 500_000,
            }
        );
        assert_eq!(time.to_string(), "2019-10-03 15:29:01:500");
    }

    #[test]
    fn test_separator_not_checked() {
        let time = BlockTime::parse("Page Time:2020-01-01 00:00:00.250").unwrap();
        assert_eq!(time.epoch_seconds(), Some(NEW_YEAR_2020 + 0.25));
    }

    #[test]
    fn test_missing_fraction_is_zero() {
        let time = BlockTime::parse("Page Time:2020-01-01 00:00:00").unwrap();
        assert_eq!(time.microsecond, 0);
    }

    #[test]
    fn test_rejects_non_digits() {
        assert!(BlockTime::parse("Page Time:20x0-01-01 00:00:00:000").is_none());
        assert!(BlockTime::parse("Page Time:2020-01").is_none());
    }

    #[test]
    fn test_epoch_is_utc() {
        let time = BlockTime::parse("Page Time:2020-01-01 00:00:00:000").unwrap();
        assert_eq!(time.epoch_seconds(), Some(NEW_YEAR_2020));
    }

    #[test]
    fn test_impossible_date() {
        let mut out = [0.0; 4];
        let err = block_timestamps("Page Time:2021-02-30 00:00:00:000", 12, 100.0, &mut out)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTimestamp { sequence: 12, .. }));
    }

    #[test]
    fn test_expand() -> Result<()> {
        let mut out = [0.0; 300];
        let tod = block_timestamps("Page Time:2020-01-01 00:00:00:000", 0, 100.0, &mut out)?;
        assert_eq!(tod, TimeOfDay::default());
        for (j, t) in out.iter().enumerate() {
            assert!((t - (NEW_YEAR_2020 + j as f64 * 0.01)).abs() < 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_epoch_round_trip() {
        let time = BlockTime::from_epoch_seconds(NEW_YEAR_2020 + 86_399.5).unwrap();
        assert_eq!(time.to_string(), "2020-01-01 23:59:59:500");
        assert_eq!(time.epoch_seconds(), Some(NEW_YEAR_2020 + 86_399.5));
    }
}
