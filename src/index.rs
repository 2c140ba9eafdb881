//! Day-boundary indexing.
//!
//! Long recordings are analysed in daily windows, e.g. "08:00 for 12 hours,
//! every day". This module turns the stream of decoded blocks into sample
//! index pairs marking where each window's samples start and stop, without
//! re-scanning earlier blocks.
//!
//! ```
//! use geneactiv_rs::{DayIndex, DayIndexer, DayWindow, DayWindowIndexer, Result};
//! # use geneactiv_rs::{BlockContext, TimeOfDay};
//!
//! fn main() -> Result<()> {
//!     let mut indexer = DayWindowIndexer::new(DayWindow::new(0, 24)?);
//!     let mut days = DayIndex::default();
//!
//!     // 2020-01-01 23:59:59, one sample per second
//!     let timestamps = [1_577_923_199.0, 1_577_923_200.0, 1_577_923_201.0];
//!     let block = BlockContext {
//!         sampling_rate: 1.0,
//!         first_sample: 0,
//!         block_samples: timestamps.len(),
//!         max_samples: timestamps.len(),
//!         declared_blocks: 1,
//!         time_of_day: TimeOfDay { hour: 23, minute: 59, second: 59, microsecond: 0 },
//!         timestamps: &timestamps,
//!     };
//!     indexer.index_block(&block, &mut days);
//!     indexer.finish(timestamps.len(), &mut days);
//!
//!     assert_eq!(days.starts, vec![0, 1]);
//!     assert_eq!(days.stops, vec![1, 3]);
//!     Ok(())
//! }
//! ```

use crate::{Error, Result, parsing::TimeOfDay};

const SECONDS_PER_HOUR: f64 = 3600.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// A daily window: starts at `base_hour` (UTC) and lasts `period_hours`.
///
/// `DayWindow::new(0, 24)` is the calendar day. A window may run past
/// midnight, e.g. base 20 with period 12 ends at 08:00 the next day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DayWindow {
    pub base_hour: u8,
    pub period_hours: u8,
}

impl DayWindow {
    /// The calendar day, midnight to midnight.
    pub const CALENDAR_DAY: DayWindow = DayWindow {
        base_hour: 0,
        period_hours: 24,
    };

    /// Create a window, checking `base_hour ∈ [0, 23]` and
    /// `period_hours ∈ [1, 24]`.
    pub fn new(base_hour: i64, period_hours: i64) -> Result<Self> {
        let window = DayWindow {
            base_hour: u8::try_from(base_hour).unwrap_or(u8::MAX),
            period_hours: u8::try_from(period_hours).unwrap_or(0),
        };
        window.validate().map_err(|_| Error::InvalidDayWindow {
            base_hour,
            period_hours,
        })?;
        Ok(window)
    }

    /// Check the bounds of a window built directly or deserialized.
    pub fn validate(&self) -> Result<()> {
        if self.base_hour > 23 || !(1..=24).contains(&self.period_hours) {
            return Err(Error::InvalidDayWindow {
                base_hour: self.base_hour as i64,
                period_hours: self.period_hours as i64,
            });
        }
        Ok(())
    }

    fn base_seconds(&self) -> f64 {
        self.base_hour as f64 * SECONDS_PER_HOUR
    }

    fn period_seconds(&self) -> f64 {
        self.period_hours as f64 * SECONDS_PER_HOUR
    }
}

impl Default for DayWindow {
    fn default() -> Self {
        Self::CALENDAR_DAY
    }
}

/// Start and stop sample indices of each window occurrence.
///
/// `starts[i]..stops[i]` is the `i`-th window's sample range, and
/// `stops[i] <= starts[i + 1]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DayIndex {
    pub starts: Vec<usize>,
    pub stops: Vec<usize>,
}

impl DayIndex {
    /// Number of window occurrences with both a start and a stop.
    pub fn len(&self) -> usize {
        self.starts.len().min(self.stops.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over `(start, stop)` pairs.
    pub fn ranges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.starts.iter().copied().zip(self.stops.iter().copied())
    }
}

/// What a day indexer sees of one decoded block.
#[derive(Debug, Clone, Copy)]
pub struct BlockContext<'a> {
    /// Sampling rate the block was timestamped with.
    pub sampling_rate: f64,
    /// Index of the block's first sample in the output buffers.
    pub first_sample: usize,
    /// Number of samples in the block.
    pub block_samples: usize,
    /// Sample count implied by the declared block count.
    pub max_samples: usize,
    /// Block count declared in the header.
    pub declared_blocks: u64,
    /// Time of day of the block's first sample.
    pub time_of_day: TimeOfDay,
    /// Timestamps of the block's samples.
    pub timestamps: &'a [f64],
}

/// Locates window boundaries incrementally, one block at a time.
///
/// Blocks are presented in file order. After [`DayIndexer::finish`] the index
/// holds exactly one start/stop pair per window occurrence the recording
/// touches.
pub trait DayIndexer {
    /// Record every boundary that falls inside `block`.
    fn index_block(&mut self, block: &BlockContext<'_>, days: &mut DayIndex);

    /// Close a window still open at the end of the recording. `total_samples`
    /// is one past the last written sample.
    fn finish(&mut self, total_samples: usize, days: &mut DayIndex);
}

/// Where the indexer is relative to its window.
#[derive(Debug, Clone, Copy, PartialEq)]
enum WindowState {
    /// No block seen yet.
    Unstarted,
    /// Outside a window; the next one starts at this epoch second.
    Waiting { next_start: f64 },
    /// Inside a window that ends at this epoch second.
    Open { stop_at: f64 },
}

/// [`DayIndexer`] for one [`DayWindow`] repeated every UTC day.
#[derive(Debug, Clone)]
pub struct DayWindowIndexer {
    window: DayWindow,
    state: WindowState,
}

impl DayWindowIndexer {
    pub fn new(window: DayWindow) -> Self {
        Self {
            window,
            state: WindowState::Unstarted,
        }
    }

    pub fn window(&self) -> DayWindow {
        self.window
    }

    /// Place the first sample relative to the window: inside one (open at the
    /// block start) or before the next.
    fn locate(&self, first: f64) -> WindowState {
        let midnight = (first / SECONDS_PER_DAY).floor() * SECONDS_PER_DAY;
        // A window from the previous day may still be running.
        let mut start = midnight - SECONDS_PER_DAY + self.window.base_seconds();
        loop {
            let stop = start + self.window.period_seconds();
            if first < stop {
                return if first >= start {
                    WindowState::Open { stop_at: stop }
                } else {
                    WindowState::Waiting { next_start: start }
                };
            }
            start += SECONDS_PER_DAY;
        }
    }
}

impl DayIndexer for DayWindowIndexer {
    fn index_block(&mut self, block: &BlockContext<'_>, days: &mut DayIndex) {
        let (Some(&first), Some(&last)) = (block.timestamps.first(), block.timestamps.last())
        else {
            return;
        };

        if self.state == WindowState::Unstarted {
            self.state = self.locate(first);
            if matches!(self.state, WindowState::Open { .. }) {
                days.starts.push(block.first_sample);
            }
        }

        let index_of =
            |boundary: f64| block.first_sample + block.timestamps.partition_point(|&t| t < boundary);

        loop {
            match self.state {
                WindowState::Open { stop_at } if last >= stop_at => {
                    days.stops.push(index_of(stop_at));
                    self.state = WindowState::Waiting {
                        next_start: stop_at - self.window.period_seconds() + SECONDS_PER_DAY,
                    };
                }
                WindowState::Waiting { next_start } if last >= next_start => {
                    days.starts.push(index_of(next_start));
                    self.state = WindowState::Open {
                        stop_at: next_start + self.window.period_seconds(),
                    };
                }
                _ => break,
            }
        }
    }

    fn finish(&mut self, total_samples: usize, days: &mut DayIndex) {
        if let WindowState::Open { .. } = self.state {
            days.stops.push(total_samples);
            self.state = WindowState::Unstarted;
        }
    }
}
