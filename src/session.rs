//! Telemetry session assembly
//!
//! [`TelemetrySession`] is the final artifact of a decode: metadata, the ordered
//! laps and the channel catalogue, plus every warning recovered along the way.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::laps::{Lap, Segmentation};
use crate::schema::SessionMetadata;
use crate::types::{ChannelDescriptor, ChannelDictionary};
use crate::{DecodeError, DecodeWarning, Result};

/// A fully decoded capture.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySession {
    metadata: SessionMetadata,
    laps: Vec<Lap>,
    dictionary: Arc<ChannelDictionary>,
    warnings: Vec<DecodeWarning>,
    lap_channel_missing: bool,
    total_rows: usize,
    tick_rate: i32,
}

impl TelemetrySession {
    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    /// Laps in row order.
    pub fn laps(&self) -> &[Lap] {
        &self.laps
    }

    /// Lap by its 1-based number.
    pub fn lap(&self, number: u32) -> Option<&Lap> {
        number
            .checked_sub(1)
            .and_then(|i| self.laps.get(i as usize))
            .filter(|lap| lap.number() == number)
    }

    /// Every declared channel, in dictionary order.
    pub fn channels(&self) -> &[ChannelDescriptor] {
        self.dictionary.descriptors()
    }

    /// Names of every declared channel, whether or not any lap carries rows for it.
    pub fn channel_catalogue(&self) -> Vec<&str> {
        self.dictionary.names().collect()
    }

    pub fn dictionary(&self) -> &Arc<ChannelDictionary> {
        &self.dictionary
    }

    /// Non-fatal conditions recovered while decoding.
    pub fn warnings(&self) -> &[DecodeWarning] {
        &self.warnings
    }

    /// Whether any data-plane recovery happened.
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Whether the capture held no sample rows.
    pub fn is_empty(&self) -> bool {
        self.total_rows == 0
    }

    /// Whether laps were produced by the single-lap fallback.
    pub fn lap_channel_missing(&self) -> bool {
        self.lap_channel_missing
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn tick_rate(&self) -> i32 {
        self.tick_rate
    }

    /// The fastest valid lap; the lower lap number wins ties.
    pub fn best_lap(&self) -> Option<&Lap> {
        self.laps
            .iter()
            .filter(|lap| lap.is_valid())
            .filter_map(|lap| lap.lap_time_ms().map(|ms| (ms, lap)))
            .min_by_key(|&(ms, lap)| (ms, lap.number()))
            .map(|(_, lap)| lap)
    }

    pub fn into_parts(self) -> (SessionMetadata, Vec<Lap>, Vec<DecodeWarning>) {
        (self.metadata, self.laps, self.warnings)
    }
}

/// Compose decoded stages into a session.
///
/// Fails with [`DecodeError::EmptyCapture`] only when there is nothing at all: no
/// laps, no rows and no declared channels. A capture with channels but zero rows is
/// a valid session carrying a [`DecodeWarning::EmptyCapture`].
pub fn assemble(
    mut metadata: SessionMetadata,
    segmentation: Segmentation,
    dictionary: Arc<ChannelDictionary>,
    mut warnings: Vec<DecodeWarning>,
) -> Result<TelemetrySession> {
    let Segmentation { laps, rows_seen, lap_channel_missing, tick_rate, warnings: lap_warnings } =
        segmentation;

    if laps.is_empty() && rows_seen == 0 && dictionary.is_empty() {
        return Err(DecodeError::EmptyCapture);
    }

    warnings.extend(lap_warnings);
    if rows_seen == 0 {
        warn!(channels = dictionary.len(), "Capture has no sample rows");
        warnings.push(DecodeWarning::EmptyCapture);
    }

    metadata.channels = dictionary.names().map(str::to_string).collect();

    debug!(
        laps = laps.len(),
        rows = rows_seen,
        channels = dictionary.len(),
        warnings = warnings.len(),
        "Telemetry session assembled"
    );

    Ok(TelemetrySession {
        metadata,
        laps,
        dictionary,
        warnings,
        lap_channel_missing,
        total_rows: rows_seen,
        tick_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DecodeOptions;
    use crate::laps::segment_laps;
    use crate::types::{SampleRow, ScalarType, Value};

    fn dictionary() -> Arc<ChannelDictionary> {
        let channel = |name: &str, scalar_type, offset| ChannelDescriptor {
            name: name.to_string(),
            scalar_type,
            count: 1,
            offset,
            count_as_time: false,
            unit: None,
            description: String::new(),
        };
        Arc::new(
            ChannelDictionary::new(vec![
                channel("Lap", ScalarType::Int32, 0),
                channel("SessionTime", ScalarType::Float64, 4),
                channel("Speed", ScalarType::Float32, 12),
            ])
            .unwrap(),
        )
    }

    fn segmentation(dict: &Arc<ChannelDictionary>, samples: &[(i32, f64)]) -> Segmentation {
        let rows = samples.iter().enumerate().map(|(i, &(lap, time))| {
            SampleRow::new(
                i,
                vec![Value::Int32(lap), Value::Float64(time), Value::Float32(0.0)],
                Arc::clone(dict),
            )
        });
        segment_laps(rows, dict, &DecodeOptions::default(), 60)
    }

    #[test]
    fn best_lap_is_fastest_valid_lap() {
        let dict = dictionary();
        let samples =
            [(1, 0.0), (1, 90.0), (2, 90.5), (2, 175.0), (3, 175.5), (3, 262.0), (4, 263.0), (4, 264.0)];
        let session =
            assemble(SessionMetadata::default(), segmentation(&dict, &samples), dict, vec![])
                .unwrap();

        assert_eq!(session.laps().len(), 4);
        // Lap 4 is shortest but incomplete
        assert_eq!(session.best_lap().map(Lap::number), Some(2));
        assert_eq!(session.lap(3).map(Lap::row_count), Some(2));
        assert!(session.lap(0).is_none());
        assert!(session.lap(5).is_none());
    }

    #[test]
    fn catalogue_lists_every_channel() {
        let dict = dictionary();
        let session = assemble(
            SessionMetadata::default(),
            segmentation(&dict, &[(1, 0.0), (1, 1.0)]),
            dict,
            vec![],
        )
        .unwrap();
        assert_eq!(session.channel_catalogue(), vec!["Lap", "SessionTime", "Speed"]);
        assert_eq!(session.metadata().channels, vec!["Lap", "SessionTime", "Speed"]);
        assert!(!session.is_degraded());
    }

    #[test]
    fn zero_rows_is_an_empty_session() {
        let dict = dictionary();
        let session =
            assemble(SessionMetadata::default(), segmentation(&dict, &[]), dict, vec![]).unwrap();
        assert!(session.is_empty());
        assert!(session.laps().is_empty());
        assert_eq!(session.warnings(), &[DecodeWarning::EmptyCapture]);
        assert_eq!(session.channel_catalogue().len(), 3);
    }

    #[test]
    fn nothing_at_all_is_empty_capture_error() {
        let dict = Arc::new(ChannelDictionary::default());
        let segmentation = segment_laps(Vec::new(), &dict, &DecodeOptions::default(), 60);
        let result = assemble(SessionMetadata::default(), segmentation, dict, vec![]);
        assert!(matches!(result, Err(DecodeError::EmptyCapture)));
    }

    #[test]
    fn stage_warnings_are_kept_in_order() {
        let dict = dictionary();
        let options = DecodeOptions::new().lap_channel("Missing");
        let rows = vec![SampleRow::new(
            0,
            vec![Value::Int32(1), Value::Float64(0.0), Value::Float32(0.0)],
            Arc::clone(&dict),
        )];
        let segmentation = segment_laps(rows, &dict, &options, 60);
        let session = assemble(
            SessionMetadata::default(),
            segmentation,
            dict,
            vec![DecodeWarning::SessionInfoCorrupt { details: "bad".into() }],
        )
        .unwrap();

        let kinds: Vec<_> = session.warnings().iter().map(DecodeWarning::kind).collect();
        assert_eq!(
            kinds,
            vec![crate::ErrorKind::SessionInfoCorrupt, crate::ErrorKind::LapChannelMissing]
        );
        assert!(session.lap_channel_missing());
        assert!(session.is_degraded());
    }
}
