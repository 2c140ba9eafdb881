use crate::{
    Error, Result,
    blocks::{CHARS_PER_SAMPLE, FileInfo, PAYLOAD_LEN, SAMPLES_PER_BLOCK},
};
use core::fmt;

/// Raw axis values at or above this are negative in 12-bit two's complement.
const AXIS_SIGN_THRESHOLD: u16 = 2048;

/// Scale applied to the signed axis value before calibration.
const AXIS_SCALE: f64 = 100.0;

/// Maps a raw 12-bit axis word in `0..=4095` onto `-2048..=2047`.
///
/// Only the low 12 bits of `raw` are used.
#[inline]
pub const fn signed_axis(raw: u16) -> i16 {
    let raw = raw & 0xFFF;
    if raw >= AXIS_SIGN_THRESHOLD {
        raw as i16 - 4096
    } else {
        raw as i16
    }
}

/// Calibrated acceleration: `(signed * 100 - offset) / gain`.
#[inline]
pub fn calibrate_axis(signed: i16, gain: f64, offset: f64) -> f64 {
    (signed as f64 * AXIS_SCALE - offset) / gain
}

/// Light level from a raw 12-bit light word.
///
/// The top 10 bits carry the light magnitude; the low 2 bits are status flags
/// and are discarded.
#[inline]
pub fn light_value(raw: u16, lux: f64, volts: f64) -> f64 {
    ((raw & 0xFFF) >> 2) as f64 * (lux / volts)
}

/// Value of three hex digits starting at `at`.
#[inline]
fn hex_triplet(bytes: &[u8], at: usize) -> core::result::Result<u16, usize> {
    let mut value = 0u16;
    for (i, &b) in bytes[at..at + 3].iter().enumerate() {
        let digit = (b as char).to_digit(16).ok_or(at + i)?;
        value = (value << 4) | digit as u16;
    }
    Ok(value)
}

/// Calibrated samples of one block, before they are placed in the output
/// buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBlock {
    pub sequence: u64,
    pub acceleration: Vec<[f64; 3]>,
    pub light: Vec<f64>,
    pub temperature: f64,
    pub timestamps: Vec<f64>,
}

impl DecodedBlock {
    fn new(sequence: u64, temperature: f64) -> Self {
        Self {
            sequence,
            acceleration: Vec::with_capacity(SAMPLES_PER_BLOCK),
            light: Vec::with_capacity(SAMPLES_PER_BLOCK),
            temperature,
            timestamps: vec![0.0; SAMPLES_PER_BLOCK],
        }
    }
}

/// Decodes a 3600-character hex payload into calibrated acceleration and
/// light values.
///
/// Each group of 12 characters is one sample: x, y and z as 3-digit signed
/// axis words, then a 3-digit light word. Timestamps are left zeroed; see
/// [`crate::parsing::timestamp::block_timestamps`].
///
/// # Parameters
/// - `payload`: The payload line, exactly [`PAYLOAD_LEN`] characters.
/// - `sequence`: Block sequence number, for error reporting.
/// - `temperature`: The block's temperature reading.
/// - `info`: Calibration constants.
pub fn decode_payload(
    payload: &str,
    sequence: u64,
    temperature: f64,
    info: &FileInfo,
) -> Result<DecodedBlock> {
    let bytes = payload.as_bytes();
    if bytes.len() != PAYLOAD_LEN {
        return Err(Error::BlockPayloadLength {
            sequence,
            actual: bytes.len(),
        });
    }

    let invalid = |position| Error::InvalidPayloadDigit { sequence, position };
    let mut block = DecodedBlock::new(sequence, temperature);

    for start in (0..PAYLOAD_LEN).step_by(CHARS_PER_SAMPLE) {
        let mut xyz = [0.0; 3];
        for (axis, value) in xyz.iter_mut().enumerate() {
            let raw = hex_triplet(bytes, start + axis * 3).map_err(invalid)?;
            *value = calibrate_axis(signed_axis(raw), info.gain[axis], info.offset[axis]);
        }
        let raw_light = hex_triplet(bytes, start + 9).map_err(invalid)?;

        block.acceleration.push(xyz);
        block.light.push(light_value(raw_light, info.lux, info.volts));
    }

    Ok(block)
}

/// Notice that a block's sampling rate disagreed with the file's and the file
/// rate was corrected.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SamplingRateWarning {
    /// Sequence number of the block that triggered the correction.
    pub sequence: u64,
    /// Rate recorded in the block, now the file rate.
    pub block_rate: f64,
    /// Rate read from the header.
    pub header_rate: f64,
}

impl fmt::Display for SamplingRateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Block ({}) fs [{:.2}] is not the same as header fs [{:.2}]. Setting fs to block fs.",
            self.sequence, self.block_rate, self.header_rate
        )
    }
}

/// Compare a block's sampling rate with the file's.
///
/// The first disagreement in a file corrects `info.sampling_rate_hz` to the
/// block rate and returns a warning. A second disagreement fails with
/// [`Error::BlockSamplingRate`] and leaves `info` untouched.
pub fn reconcile_sampling_rate(
    info: &mut FileInfo,
    sequence: u64,
    block_rate: f64,
) -> Result<Option<SamplingRateWarning>> {
    if block_rate == info.sampling_rate_hz {
        return Ok(None);
    }
    if info.fs_mismatch_count >= 1 {
        return Err(Error::BlockSamplingRate {
            sequence,
            block_rate,
            file_rate: info.sampling_rate_hz,
        });
    }
    if block_rate <= 0.0 || !block_rate.is_finite() {
        return Err(Error::MalformedBlock {
            sequence: Some(sequence),
            line: 9,
            reason: format!("sampling rate {block_rate} is not positive"),
        });
    }

    let warning = SamplingRateWarning {
        sequence,
        block_rate,
        header_rate: info.sampling_rate_hz,
    };
    info.fs_mismatch_count += 1;
    info.sampling_rate_hz = block_rate;
    Ok(Some(warning))
}
