//! Builder pattern for BinReader configuration.

use super::BinReader;
use crate::{DayIndexer, DayWindow, Result};
#[cfg(feature = "serde")]
use crate::Error;
use std::io::BufRead;

/// How block sequence numbers are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SequencePolicy {
    /// Blocks are placed by their sequence number without any check. Duplicate
    /// or backwards numbers overwrite earlier samples.
    #[default]
    Trusting,
    /// Every block must have a higher sequence number than the one before it.
    Strict,
}

/// Configuration for BinReader.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReaderConfig {
    /// Sequence number checking.
    /// Default: Trusting
    pub sequence_policy: SequencePolicy,

    /// Daily windows to index. One [`crate::DayIndex`] is produced per window,
    /// in this order.
    /// Default: the calendar day
    pub day_windows: Vec<DayWindow>,

    /// Truncate the output to the samples of the highest block sequence
    /// number seen, instead of keeping every declared slot.
    /// Default: true
    pub trim_to_written: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            sequence_policy: SequencePolicy::Trusting,
            day_windows: vec![DayWindow::CALENDAR_DAY],
            trim_to_written: true,
        }
    }
}

impl ReaderConfig {
    /// Check every configured day window.
    pub fn validate(&self) -> Result<()> {
        self.day_windows.iter().try_for_each(DayWindow::validate)
    }

    /// Save the configuration as JSON.
    ///
    /// Requires the `serde` feature.
    #[cfg(feature = "serde")]
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            Error::Serialization(format!("JSON serialization failed: {}", e))
        })?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a configuration from JSON. Missing keys take their default value.
    ///
    /// Requires the `serde` feature.
    #[cfg(feature = "serde")]
    pub fn load_from_file(path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: ReaderConfig = serde_json::from_str(&json).map_err(|e| {
            Error::Serialization(format!("JSON deserialization failed: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }
}

/// Builder for BinReader configuration.
pub struct BinReaderBuilder {
    pub(super) config: ReaderConfig,
    pub(super) extra_indexers: Vec<Box<dyn DayIndexer>>,
}

impl Default for BinReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BinReaderBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: ReaderConfig::default(),
            extra_indexers: Vec::new(),
        }
    }

    /// Start from an existing configuration.
    pub fn from_config(config: ReaderConfig) -> Self {
        Self {
            config,
            extra_indexers: Vec::new(),
        }
    }

    /// Set how block sequence numbers are checked.
    ///
    /// Default: [`SequencePolicy::Trusting`]
    pub fn sequence_policy(mut self, policy: SequencePolicy) -> Self {
        self.config.sequence_policy = policy;
        self
    }

    /// Reject blocks whose sequence number does not increase.
    pub fn strict(self) -> Self {
        self.sequence_policy(SequencePolicy::Strict)
    }

    /// Replace the day windows to index.
    ///
    /// Default: the calendar day
    pub fn day_windows(mut self, windows: impl IntoIterator<Item = DayWindow>) -> Self {
        self.config.day_windows = windows.into_iter().collect();
        self
    }

    /// Add one day window given as base hour and period, checked at build
    /// time.
    pub fn window(mut self, base_hour: u8, period_hours: u8) -> Self {
        self.config.day_windows.push(DayWindow {
            base_hour,
            period_hours,
        });
        self
    }

    /// Do not index any day windows.
    pub fn no_day_windows(mut self) -> Self {
        self.config.day_windows.clear();
        self
    }

    /// Add a custom day indexer. Its [`crate::DayIndex`] follows those of the
    /// configured windows.
    pub fn day_indexer(mut self, indexer: Box<dyn DayIndexer>) -> Self {
        self.extra_indexers.push(indexer);
        self
    }

    /// Set whether the output is trimmed to the blocks actually seen.
    ///
    /// Default: true
    pub fn trim_to_written(mut self, enabled: bool) -> Self {
        self.config.trim_to_written = enabled;
        self
    }

    /// The configuration built so far.
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Build a reader over `reader`, positioned at the start of the header.
    pub fn build<R: BufRead>(self, reader: R) -> Result<BinReader<R>> {
        self.config.validate()?;
        Ok(BinReader::from_builder(reader, self))
    }

    /// Open `path` and build a reader over it.
    pub fn open(self, path: &str) -> Result<BinReader<std::io::BufReader<std::fs::File>>> {
        super::warn_on_extension(path);
        let file = std::fs::File::open(path)?;
        self.build(std::io::BufReader::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BinReaderBuilder::new().config().clone();
        assert_eq!(config, ReaderConfig::default());
        assert_eq!(config.sequence_policy, SequencePolicy::Trusting);
        assert_eq!(config.day_windows, vec![DayWindow::CALENDAR_DAY]);
        assert!(config.trim_to_written);
    }

    #[test]
    fn test_builder_chain() {
        let builder = BinReaderBuilder::new()
            .strict()
            .no_day_windows()
            .window(8, 12)
            .trim_to_written(false);
        let config = builder.config();
        assert_eq!(config.sequence_policy, SequencePolicy::Strict);
        assert_eq!(
            config.day_windows,
            vec![DayWindow {
                base_hour: 8,
                period_hours: 12
            }]
        );
        assert!(!config.trim_to_written);
    }

    #[test]
    fn test_invalid_window_rejected_at_build() {
        let result = BinReaderBuilder::new()
            .window(24, 12)
            .build(std::io::Cursor::new(""));
        assert!(matches!(
            result.err(),
            Some(crate::Error::InvalidDayWindow {
                base_hour: 24,
                period_hours: 12
            })
        ));
    }
}
