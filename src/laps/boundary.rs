//! Lap boundary detection over a single lap-identifying channel

use tracing::debug;

use crate::options::{DecodeOptions, LapChannelKind};
use crate::types::{ChannelDictionary, SampleRow};

use super::LapStart;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Signal {
    Counter,
    DistancePct { range: f64 },
}

/// Detects lap starts from consecutive samples of the lap channel.
///
/// Samples that are missing, not numeric or NaN never trigger a boundary and do
/// not replace the last good sample.
#[derive(Debug, Clone)]
pub(crate) struct BoundaryDetector {
    index: usize,
    signal: Signal,
    epsilon: f64,
    previous: Option<f64>,
}

impl BoundaryDetector {
    /// Resolve the configured lap channel, or explain why it is unusable.
    pub(crate) fn resolve(
        dictionary: &ChannelDictionary,
        options: &DecodeOptions,
    ) -> Result<Self, String> {
        let name = options.lap_channel.as_str();
        let index = dictionary.index_of(name).ok_or_else(|| "not present in capture".to_string())?;
        let descriptor = &dictionary.descriptors()[index];

        if !descriptor.is_scalar() {
            return Err(format!("{} elements per row, expected a scalar", descriptor.count));
        }

        let kind = match options.lap_channel_kind {
            LapChannelKind::Auto => {
                let detected = if descriptor.scalar_type.is_float() {
                    LapChannelKind::DistancePct
                } else {
                    LapChannelKind::Counter
                };
                debug!(
                    channel = name,
                    scalar_type = ?descriptor.scalar_type,
                    kind = ?detected,
                    "Lap channel kind detected from type"
                );
                detected
            }
            explicit => explicit,
        };

        let signal = match kind {
            LapChannelKind::DistancePct => {
                let range = options.distance_range;
                if !(range.is_finite() && range > 0.0) {
                    return Err(format!("distance range {} is not positive", range));
                }
                Signal::DistancePct { range }
            }
            _ => Signal::Counter,
        };

        Ok(Self { index, signal, epsilon: options.boundary_epsilon.abs(), previous: None })
    }

    pub(crate) fn is_distance(&self) -> bool {
        matches!(self.signal, Signal::DistancePct { .. })
    }

    /// Feed the next row; returns how a new lap starts at this row, if one does.
    pub(crate) fn observe(&mut self, row: &SampleRow) -> Option<LapStart> {
        let value = row.value(self.index).and_then(|v| v.as_f64()).filter(|v| !v.is_nan())?;

        match self.signal {
            Signal::Counter => {
                let previous = self.previous.replace(value)?;
                let delta = value - previous;
                if delta > self.epsilon {
                    Some(LapStart::CounterIncrement)
                } else if delta < -self.epsilon {
                    Some(LapStart::CounterRestart)
                } else {
                    None
                }
            }
            Signal::DistancePct { range } => {
                // Off-world sentinels (e.g. -1 in the pits) are not positions on track
                if !(0.0..=range).contains(&value) {
                    return None;
                }
                let previous = self.previous.replace(value)?;
                let drop = previous - value;
                (drop > range / 2.0 && drop > self.epsilon).then_some(LapStart::DistanceWrap)
            }
        }
    }
}
