//! Lap segmentation
//!
//! Splits the continuous row stream into laps using one lap-identifying channel:
//!
//! - **Counter** channels (e.g. `Lap`) start a new lap whenever the value changes by
//!   more than the boundary epsilon. An increase is a normal lap; a decrease is a
//!   session restart.
//! - **Distance percentage** channels (e.g. `LapDistPct`) start a new lap when the
//!   value drops by more than half the channel range between consecutive samples.
//!
//! Every row lands in exactly one lap, in order. The final lap is never closed by a
//! boundary and is therefore reported as incomplete. When the lap channel is missing
//! or unusable the whole stream becomes a single lap and a
//! [`DecodeWarning::LapChannelMissing`] is recorded.
//!
//! ```rust
//! use pitwall_ingest::ibt::CaptureBuilder;
//! use pitwall_ingest::laps::segment_laps;
//! use pitwall_ingest::types::ScalarType;
//! use pitwall_ingest::{DecodeOptions, IbtReader};
//!
//! let mut builder = CaptureBuilder::new().channel("Lap", ScalarType::Int32, 1, "");
//! for lap in [1, 1, 2, 2, 2] {
//!     builder = builder.row(|row| row.i32("Lap", lap));
//! }
//! let reader = IbtReader::from_bytes(builder.build()).unwrap();
//!
//! let segmentation =
//!     segment_laps(reader.rows(), reader.dictionary(), &DecodeOptions::default(), 60);
//! let counts: Vec<usize> = segmentation.laps.iter().map(|lap| lap.row_count()).collect();
//! assert_eq!(counts, vec![2, 3]);
//! ```

mod boundary;
mod lap;

pub use lap::{Lap, LapInvalidReason, LapStart};

use boundary::BoundaryDetector;
use lap::LapBuilder;
use tracing::{debug, trace, warn};

use crate::DecodeWarning;
use crate::options::DecodeOptions;
use crate::types::{ChannelDictionary, SampleRow};

/// Result of segmenting a row stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    /// Laps in row order, numbered from 1
    pub laps: Vec<Lap>,
    /// Rows consumed
    pub rows_seen: usize,
    /// The single-lap fallback was used
    pub lap_channel_missing: bool,
    /// Sample rate the row-index clock was based on
    pub tick_rate: i32,
    pub warnings: Vec<DecodeWarning>,
}

/// Incremental lap segmenter; rows are pushed one at a time.
#[derive(Debug)]
pub struct LapSegmenter {
    detector: Option<BoundaryDetector>,
    timestamp_index: Option<usize>,
    tick_rate: i32,
    current: Option<LapBuilder>,
    laps: Vec<Lap>,
    rows_seen: usize,
    warnings: Vec<DecodeWarning>,
}

impl LapSegmenter {
    /// Resolve the lap and timestamp channels once for the whole stream.
    pub fn new(dictionary: &ChannelDictionary, options: &DecodeOptions, tick_rate: i32) -> Self {
        let mut warnings = Vec::new();
        let detector = match BoundaryDetector::resolve(dictionary, options) {
            Ok(detector) => {
                debug!(
                    channel = %options.lap_channel,
                    distance = detector.is_distance(),
                    "Lap channel resolved"
                );
                Some(detector)
            }
            Err(reason) => {
                warn!(
                    channel = %options.lap_channel,
                    %reason,
                    "Lap channel unusable, falling back to a single lap"
                );
                warnings.push(DecodeWarning::LapChannelMissing {
                    channel: options.lap_channel.clone(),
                    reason,
                });
                None
            }
        };

        let timestamp_index = dictionary
            .index_of(&options.timestamp_channel)
            .filter(|&i| dictionary.descriptors()[i].is_scalar());
        if timestamp_index.is_none() {
            debug!(
                channel = %options.timestamp_channel,
                tick_rate,
                "No timestamp channel, timing laps from row index"
            );
        }

        Self {
            detector,
            timestamp_index,
            tick_rate,
            current: None,
            laps: Vec::new(),
            rows_seen: 0,
            warnings,
        }
    }

    /// Whether the single-lap fallback is in effect.
    pub fn lap_channel_missing(&self) -> bool {
        self.detector.is_none()
    }

    fn timestamp(&self, row: &SampleRow) -> f64 {
        match self.timestamp_index {
            Some(i) => row.value(i).and_then(|v| v.as_f64()).unwrap_or(f64::NAN),
            None => row.index() as f64 / f64::from(self.tick_rate.max(1)),
        }
    }

    /// Consume the next row of the stream.
    pub fn push(&mut self, row: SampleRow) {
        self.rows_seen += 1;
        let boundary = self.detector.as_mut().and_then(|d| d.observe(&row));
        let seconds = self.timestamp(&row);

        let current = match (self.current.take(), boundary) {
            (Some(open), Some(start)) => {
                let lap = open.finish(true);
                trace!(lap = lap.number(), rows = lap.row_count(), ?start, "Lap closed");
                let next = lap.number() + 1;
                self.laps.push(lap);
                LapBuilder::new(next, start)
            }
            (Some(open), None) => open,
            (None, _) => LapBuilder::new(1, LapStart::SessionStart),
        };

        let current = self.current.insert(current);
        current.push(row, seconds);
    }

    /// Close the final lap and return the segmentation.
    pub fn finish(mut self) -> Segmentation {
        let lap_channel_missing = self.lap_channel_missing();
        if let Some(open) = self.current.take() {
            self.laps.push(open.finish(false));
        }

        debug!(
            laps = self.laps.len(),
            rows = self.rows_seen,
            valid = self.laps.iter().filter(|lap| lap.is_valid()).count(),
            lap_channel_missing,
            "Lap segmentation complete"
        );

        Segmentation {
            laps: self.laps,
            rows_seen: self.rows_seen,
            lap_channel_missing,
            tick_rate: self.tick_rate,
            warnings: self.warnings,
        }
    }
}

/// Segment a row stream into laps.
pub fn segment_laps<I>(
    rows: I,
    dictionary: &ChannelDictionary,
    options: &DecodeOptions,
    tick_rate: i32,
) -> Segmentation
where
    I: IntoIterator<Item = SampleRow>,
{
    let mut segmenter = LapSegmenter::new(dictionary, options, tick_rate);
    for row in rows {
        segmenter.push(row);
    }
    segmenter.finish()
}
