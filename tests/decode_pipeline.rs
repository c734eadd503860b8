//! End-to-end decode tests over synthetic captures.

use anyhow::Result;
use pitwall_ingest::ibt::CaptureBuilder;
use pitwall_ingest::types::{ScalarType, Value};
use pitwall_ingest::{
    DecodeError, DecodeOptions, DecodeWarning, ErrorKind, IbtReader, LapInvalidReason, UNKNOWN,
    decode_bytes,
};
use proptest::prelude::*;

const SESSION_YAML: &str = "---
WeekendInfo:
 TrackName: watkinsglen 2021 fullcourse
 TrackDisplayName: Watkins Glen International
DriverInfo:
 DriverCarIdx: 0
 Drivers:
 - CarIdx: 0
   UserName: D'Angelo, Chris
   CarScreenName: Ferrari 296 GT3
SessionInfo:
 Sessions:
 - SessionNum: 0
   SessionType: Offline Testing
...
";

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Capture with `SessionTime`, `Lap` and `Speed`, one row per entry of `laps`.
fn lap_capture(laps: &[i32]) -> CaptureBuilder {
    let mut builder = CaptureBuilder::new()
        .tick_rate(60)
        .start_date(1_700_000_000)
        .channel("SessionTime", ScalarType::Float64, 1, "s")
        .channel("Lap", ScalarType::Int32, 1, "")
        .channel("Speed", ScalarType::Float32, 1, "m/s")
        .session_info(SESSION_YAML);
    for (i, &lap) in laps.iter().enumerate() {
        builder = builder.row(|row| {
            row.f64("SessionTime", i as f64 / 60.0).i32("Lap", lap).f32("Speed", 50.0 + i as f32)
        });
    }
    builder
}

#[test]
fn decodes_metadata_laps_and_catalogue() -> Result<()> {
    init_tracing();
    let session = decode_bytes(&lap_capture(&[1, 1, 1, 2, 2, 3, 3, 3]).build(), &DecodeOptions::default())?;

    let metadata = session.metadata();
    assert_eq!(metadata.track_name, "Watkins Glen International");
    assert_eq!(metadata.car_name, "Ferrari 296 GT3");
    assert_eq!(metadata.driver_name, "D'Angelo, Chris");
    assert_eq!(metadata.session_type, "Offline Testing");
    assert_eq!(metadata.started_at.map(|t| t.timestamp()), Some(1_700_000_000));
    assert_eq!(metadata.get("WeekendInfo.TrackName"), Some("watkinsglen 2021 fullcourse"));

    let counts: Vec<usize> = session.laps().iter().map(|lap| lap.row_count()).collect();
    assert_eq!(counts, vec![3, 2, 3]);
    assert_eq!(session.channel_catalogue(), vec!["SessionTime", "Lap", "Speed"]);
    assert_eq!(session.total_rows(), 8);
    assert_eq!(session.tick_rate(), 60);
    assert!(!session.is_degraded());

    // 2 rows at 60 Hz apart
    assert_eq!(session.laps()[0].lap_time_ms(), Some(33));
    Ok(())
}

#[test]
fn unsupported_version_is_distinct_failure() {
    let bytes = lap_capture(&[1, 1]).version(3).build();
    let error = decode_bytes(&bytes, &DecodeOptions::default()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UnsupportedVersion);
    assert!(error.is_fatal());
}

#[test]
fn truncated_preamble_is_truncated_header() {
    let bytes = lap_capture(&[1]).build();
    let error = decode_bytes(&bytes[..100], &DecodeOptions::default()).unwrap_err();
    assert!(matches!(error, DecodeError::TruncatedHeader { .. }));
}

#[test]
fn overlap_is_rejected_before_any_row() {
    let bytes = CaptureBuilder::new()
        .channel_at("Speed", ScalarType::Float32, 1, 0, "m/s")
        .channel_at("RPM", ScalarType::Float32, 1, 2, "revs/min")
        .row(|row| row.f32("Speed", 1.0))
        .build();

    assert!(matches!(
        decode_bytes(&bytes, &DecodeOptions::default()),
        Err(DecodeError::OverlappingChannel { .. })
    ));
    assert!(matches!(IbtReader::from_bytes(bytes), Err(DecodeError::OverlappingChannel { .. })));
}

#[test]
fn truncated_mid_row_keeps_prior_rows() -> Result<()> {
    init_tracing();
    let builder = lap_capture(&[1, 1, 1, 2, 2, 2]);
    let stride = builder.stride();
    let bytes = builder.truncate(stride / 2).build();

    let session = decode_bytes(&bytes, &DecodeOptions::default())?;
    assert_eq!(session.total_rows(), 5);
    assert_eq!(
        session.warnings(),
        &[DecodeWarning::TruncatedData {
            expected_rows: Some(6),
            decoded_rows: 5,
            discarded_bytes: stride - stride / 2,
        }]
    );
    let counts: Vec<usize> = session.laps().iter().map(|lap| lap.row_count()).collect();
    assert_eq!(counts, vec![3, 2]);
    assert!(session.is_degraded());
    Ok(())
}

#[test]
fn zero_rows_is_empty_session_not_error() -> Result<()> {
    let session = decode_bytes(&lap_capture(&[]).build(), &DecodeOptions::default())?;
    assert!(session.is_empty());
    assert!(session.laps().is_empty());
    assert_eq!(session.channel_catalogue().len(), 3);
    assert!(session.warnings().contains(&DecodeWarning::EmptyCapture));
    assert!(session.best_lap().is_none());
    Ok(())
}

#[test]
fn nothing_declared_is_empty_capture_error() {
    let bytes = CaptureBuilder::new().build();
    assert!(matches!(
        decode_bytes(&bytes, &DecodeOptions::default()),
        Err(DecodeError::EmptyCapture)
    ));
}

#[test]
fn corrupt_session_info_is_a_warning() -> Result<()> {
    let bytes = lap_capture(&[1, 1, 2])
        .session_info("WeekendInfo: {TrackName: [broken\n")
        .build();

    let session = decode_bytes(&bytes, &DecodeOptions::default())?;
    assert_eq!(session.metadata().track_name, UNKNOWN);
    assert!(session.metadata().is_empty());
    // Start date still comes from the header
    assert!(session.metadata().started_at.is_some());
    assert_eq!(session.laps().len(), 2);
    assert!(matches!(session.warnings(), [DecodeWarning::SessionInfoCorrupt { .. }]));
    Ok(())
}

#[test]
fn missing_lap_channel_yields_single_lap() -> Result<()> {
    let options = DecodeOptions::new().lap_channel("LapCompleted");
    let session = decode_bytes(&lap_capture(&[1, 1, 2, 2, 3]).build(), &options)?;

    assert!(session.lap_channel_missing());
    assert_eq!(session.laps().len(), 1);
    let lap = &session.laps()[0];
    assert_eq!(lap.number(), 1);
    assert_eq!(lap.row_count(), 5);
    assert_eq!(lap.invalid_reason(), Some(LapInvalidReason::Incomplete));
    assert!(matches!(
        session.warnings(),
        [DecodeWarning::LapChannelMissing { channel, .. }] if channel == "LapCompleted"
    ));
    Ok(())
}

#[test]
fn row_limit_is_reported() -> Result<()> {
    let options = DecodeOptions::new().max_rows(4);
    let session = decode_bytes(&lap_capture(&[1, 1, 1, 2, 2, 2]).build(), &options)?;
    assert_eq!(session.total_rows(), 4);
    assert_eq!(session.warnings(), &[DecodeWarning::RowLimitReached { limit: 4 }]);
    Ok(())
}

#[test]
fn distance_channel_segments_by_wrap() -> Result<()> {
    let mut builder = CaptureBuilder::new()
        .channel("SessionTime", ScalarType::Float64, 1, "s")
        .channel("LapDistPct", ScalarType::Float32, 1, "%");
    for (i, pct) in [0.1f32, 0.5, 0.95, 0.05, 0.4].into_iter().enumerate() {
        builder = builder.row(|row| row.f64("SessionTime", i as f64).f32("LapDistPct", pct));
    }
    let options = DecodeOptions::new().lap_channel("LapDistPct");
    let session = decode_bytes(&builder.build(), &options)?;

    let counts: Vec<usize> = session.laps().iter().map(|lap| lap.row_count()).collect();
    assert_eq!(counts, vec![3, 2]);
    assert_eq!(session.laps()[0].lap_time_ms(), Some(2000));
    assert!(!session.laps()[1].is_valid());
    Ok(())
}

#[test]
fn array_and_text_channels_decode() -> Result<()> {
    let bytes = CaptureBuilder::new()
        .channel("Lap", ScalarType::Int32, 1, "")
        .channel("CarIdxPosition", ScalarType::Int16, 3, "")
        .channel("DriverTag", ScalarType::Char, 8, "")
        .channel("SessionUniqueID", ScalarType::UInt64, 1, "")
        .row(|row| {
            row.i32("Lap", 1)
                .value(
                    "CarIdxPosition",
                    Value::Array(vec![Value::Int16(3), Value::Int16(1), Value::Int16(2)]),
                )
                .bytes("DriverTag", b"CDA")
                .value("SessionUniqueID", Value::UInt64(u64::MAX - 1))
        })
        .build();

    let reader = IbtReader::from_bytes(bytes)?;
    let row = reader.rows().next().expect("one row");
    assert_eq!(row.get_as::<Vec<i16>>("CarIdxPosition"), Some(Ok(vec![3, 1, 2])));
    assert_eq!(row.get_as::<String>("DriverTag"), Some(Ok("CDA".to_string())));
    assert_eq!(row.get_as::<u64>("SessionUniqueID"), Some(Ok(u64::MAX - 1)));

    let json = serde_json::to_value(&row)?;
    assert_eq!(json["CarIdxPosition"], serde_json::json!([3, 1, 2]));
    Ok(())
}

#[test]
fn reader_and_pipeline_agree() -> Result<()> {
    let bytes = lap_capture(&[1, 1, 2, 2, 2, 3]).build();
    let options = DecodeOptions::default();
    let from_reader = IbtReader::from_bytes(bytes.clone())?.decode(&options)?;
    let from_pipeline = decode_bytes(&bytes, &options)?;
    assert_eq!(from_reader, from_pipeline);
    Ok(())
}

prop_compose! {
    /// Lap counter sequences of `m` laps with 1..20 rows each.
    fn arb_lap_plan()(rows_per_lap in prop::collection::vec(1usize..20, 1..12)) -> Vec<usize> {
        rows_per_lap
    }
}

proptest! {
    #[test]
    fn prop_round_trip_reproduces_channels_and_laps(
        plan in arb_lap_plan(),
        extra_channels in 0usize..12,
    ) {
        let mut builder = CaptureBuilder::new()
            .channel("SessionTime", ScalarType::Float64, 1, "s")
            .channel("Lap", ScalarType::Int32, 1, "");
        for c in 0..extra_channels {
            builder = builder.channel(&format!("Aux{c}"), ScalarType::Float32, 1, "");
        }

        let mut tick = 0;
        for (lap, rows) in plan.iter().enumerate() {
            for _ in 0..*rows {
                builder = builder.row(|row| {
                    row.f64("SessionTime", tick as f64 / 60.0).i32("Lap", lap as i32 + 1)
                });
                tick += 1;
            }
        }

        let session = decode_bytes(&builder.build(), &DecodeOptions::default()).unwrap();
        prop_assert_eq!(session.channels().len(), extra_channels + 2);
        prop_assert_eq!(session.laps().len(), plan.len());
        let counts: Vec<usize> = session.laps().iter().map(|lap| lap.row_count()).collect();
        prop_assert_eq!(counts, plan);
    }

    #[test]
    fn prop_decoding_is_deterministic(
        laps in prop::collection::vec(0i32..5, 0..120),
        cut in 0usize..64,
    ) {
        let bytes = lap_capture(&laps).truncate(cut).build();
        let first = decode_bytes(&bytes, &DecodeOptions::default());
        let second = decode_bytes(&bytes, &DecodeOptions::default());

        match (first, second) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(a), Err(b)) => prop_assert_eq!(a.to_string(), b.to_string()),
            (a, b) => prop_assert!(false, "outcomes differ: {:?} vs {:?}", a.is_ok(), b.is_ok()),
        }
    }

    #[test]
    fn prop_laps_cover_every_decoded_row(
        laps in prop::collection::vec(1i32..4, 1..150),
    ) {
        let bytes = lap_capture(&laps).build();
        let reader = IbtReader::from_bytes(bytes).unwrap();
        let rows: Vec<_> = reader.rows().collect();
        let session = reader.decode(&DecodeOptions::default()).unwrap();

        let rebuilt: Vec<_> = session.laps().iter().flat_map(|lap| lap.rows().iter().cloned()).collect();
        prop_assert_eq!(rebuilt, rows);
    }
}
