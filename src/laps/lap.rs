//! Lap values and per-lap accumulation

use serde::Serialize;

use crate::types::SampleRow;

/// What opened a lap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LapStart {
    /// First row of the capture
    SessionStart,
    /// Lap counter increased
    CounterIncrement,
    /// Lap counter went backwards, typically a session reset
    CounterRestart,
    /// Distance percentage wrapped past the start/finish line
    DistanceWrap,
}

/// Why a lap is structurally invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LapInvalidReason {
    /// Zero or one row; no elapsed time can be measured
    TooFewRows,
    /// The capture ended before the lap was closed by a boundary
    Incomplete,
    /// Timestamps go backwards (or are not finite) within the lap
    NonMonotonicTime,
}

/// One segmented lap: a contiguous run of rows between two boundaries.
#[derive(Debug, Clone, PartialEq)]
pub struct Lap {
    number: u32,
    start: LapStart,
    first_row: usize,
    rows: Vec<SampleRow>,
    lap_time_ms: Option<u64>,
    invalid_reason: Option<LapInvalidReason>,
}

impl Lap {
    /// 1-based lap number, unique within the session.
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn start(&self) -> LapStart {
        self.start
    }

    /// Index of the lap's first row in the capture's row sequence.
    pub fn first_row(&self) -> usize {
        self.first_row
    }

    pub fn rows(&self) -> &[SampleRow] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Elapsed time between the first and last row, `None` when timing is unusable.
    pub fn lap_time_ms(&self) -> Option<u64> {
        self.lap_time_ms
    }

    pub fn is_valid(&self) -> bool {
        self.invalid_reason.is_none()
    }

    pub fn invalid_reason(&self) -> Option<LapInvalidReason> {
        self.invalid_reason
    }

    pub fn into_rows(self) -> Vec<SampleRow> {
        self.rows
    }
}

/// Rows and timing of the lap currently being filled.
#[derive(Debug)]
pub(crate) struct LapBuilder {
    number: u32,
    start: LapStart,
    rows: Vec<SampleRow>,
    first_time: Option<f64>,
    last_time: Option<f64>,
    monotonic: bool,
}

impl LapBuilder {
    pub(crate) fn new(number: u32, start: LapStart) -> Self {
        Self { number, start, rows: Vec::new(), first_time: None, last_time: None, monotonic: true }
    }

    /// Append a row with its timestamp in seconds.
    pub(crate) fn push(&mut self, row: SampleRow, seconds: f64) {
        if !seconds.is_finite() {
            self.monotonic = false;
        } else {
            if self.last_time.is_some_and(|last| seconds < last) {
                self.monotonic = false;
            }
            self.first_time.get_or_insert(seconds);
            self.last_time = Some(seconds);
        }
        self.rows.push(row);
    }

    /// Close the lap. `closed` is false for the final lap of a capture.
    pub(crate) fn finish(self, closed: bool) -> Lap {
        let lap_time_ms = match (self.monotonic, self.first_time, self.last_time) {
            (true, Some(first), Some(last)) => Some(((last - first) * 1000.0).round() as u64),
            _ => None,
        };

        let invalid_reason = if self.rows.len() <= 1 {
            Some(LapInvalidReason::TooFewRows)
        } else if !closed {
            Some(LapInvalidReason::Incomplete)
        } else if lap_time_ms.is_none() {
            Some(LapInvalidReason::NonMonotonicTime)
        } else {
            None
        };

        Lap {
            number: self.number,
            start: self.start,
            first_row: self.rows.first().map_or(0, SampleRow::index),
            rows: self.rows,
            lap_time_ms,
            invalid_reason,
        }
    }
}
