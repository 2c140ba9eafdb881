//! Output sample buffers.
//!
//! [`SampleBuffers`] holds four parallel, sample-indexed sequences. Block `N`
//! always occupies samples `N * 300 .. N * 300 + 300`; slots no block has
//! written hold `NaN`.

use crate::{Error, Result, blocks::samples_for_blocks, parsing::DecodedBlock};

/// One decoded sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Seconds since the Unix epoch (UTC).
    pub timestamp: f64,
    /// Calibrated x, y, z acceleration.
    pub acceleration: [f64; 3],
    pub light: f64,
    pub temperature: f64,
}

/// Parallel output sequences filled block by block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleBuffers {
    pub timestamps: Vec<f64>,
    pub acceleration: Vec<[f64; 3]>,
    pub light: Vec<f64>,
    pub temperature: Vec<f64>,
}

impl SampleBuffers {
    /// Number of sample slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// The sample at `index`, if the slot exists.
    pub fn sample(&self, index: usize) -> Option<Sample> {
        Some(Sample {
            timestamp: *self.timestamps.get(index)?,
            acceleration: *self.acceleration.get(index)?,
            light: *self.light.get(index)?,
            temperature: *self.temperature.get(index)?,
        })
    }

    /// Iterate over all slots in sample order.
    pub fn iter(&self) -> impl Iterator<Item = Sample> + '_ {
        (0..self.len()).filter_map(|i| self.sample(i))
    }

    /// Grow or shrink every sequence to `len`, filling new slots with `NaN`.
    pub fn resize(&mut self, len: usize) {
        self.timestamps.resize(len, f64::NAN);
        self.acceleration.resize(len, [f64::NAN; 3]);
        self.light.resize(len, f64::NAN);
        self.temperature.resize(len, f64::NAN);
    }

    /// Copy a decoded block into its slots, growing the buffers if the block
    /// lies beyond the current end.
    ///
    /// Returns the index of the block's first sample, or
    /// [`Error::MalformedBlock`] if the block's slots are not addressable.
    pub fn commit_block(&mut self, block: &DecodedBlock) -> Result<usize> {
        let first = samples_for_blocks(block.sequence)
            .and_then(|first| Some((first, first.checked_add(block.acceleration.len())?)));
        let Some((first, end)) = first else {
            return Err(Error::MalformedBlock {
                sequence: Some(block.sequence),
                line: 3,
                reason: format!("sequence number {} is out of range", block.sequence),
            });
        };
        if end > self.len() {
            self.resize(end);
        }

        self.timestamps[first..end].copy_from_slice(&block.timestamps);
        self.acceleration[first..end].copy_from_slice(&block.acceleration);
        self.light[first..end].copy_from_slice(&block.light);
        self.temperature[first..end].fill(block.temperature);
        Ok(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::SAMPLES_PER_BLOCK;

    fn block(sequence: u64, value: f64) -> DecodedBlock {
        DecodedBlock {
            sequence,
            acceleration: vec![[value; 3]; SAMPLES_PER_BLOCK],
            light: vec![value; SAMPLES_PER_BLOCK],
            temperature: value,
            timestamps: vec![value; SAMPLES_PER_BLOCK],
        }
    }

    #[test]
    fn test_commit_places_block_by_sequence() -> Result<()> {
        let mut buffers = SampleBuffers::default();
        assert_eq!(buffers.commit_block(&block(2, 7.0))?, 600);

        assert_eq!(buffers.len(), 900);
        assert!(buffers.timestamps[..600].iter().all(|t| t.is_nan()));
        assert!(buffers.temperature[600..].iter().all(|&t| t == 7.0));
        assert_eq!(buffers.sample(899).map(|s| s.light), Some(7.0));
        assert_eq!(buffers.sample(900), None);
        Ok(())
    }

    #[test]
    fn test_commit_into_existing_slots() -> Result<()> {
        let mut buffers = SampleBuffers::default();
        buffers.resize(5 * SAMPLES_PER_BLOCK);
        buffers.commit_block(&block(1, 1.0))?;
        assert_eq!(buffers.len(), 5 * SAMPLES_PER_BLOCK);
        assert_eq!(buffers.acceleration[300], [1.0; 3]);
        assert!(buffers.light[600..].iter().all(|l| l.is_nan()));
        Ok(())
    }

    #[test]
    fn test_unaddressable_sequence_rejected() {
        let mut buffers = SampleBuffers::default();
        let err = buffers.commit_block(&block(u64::MAX, 1.0)).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedBlock {
                sequence: Some(u64::MAX),
                line: 3,
                ..
            }
        ));
        assert!(buffers.is_empty());
    }
}
