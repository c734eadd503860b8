//! Decode configuration.
//!
//! Everything the pipeline needs beyond the capture bytes is passed in explicitly
//! through [`DecodeOptions`]; nothing is read from the environment.
//!
//! ```rust
//! use pitwall_ingest::{DecodeOptions, LapChannelKind};
//!
//! let options = DecodeOptions::from_yaml("lap_channel: LapDistPct\nmax_rows: 5000\n").unwrap();
//! assert_eq!(options.lap_channel, "LapDistPct");
//! assert_eq!(options.lap_channel_kind, LapChannelKind::Auto);
//! assert_eq!(options.max_rows, Some(5000));
//! ```

use serde::{Deserialize, Serialize};

/// How the lap-identifying channel marks lap boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LapChannelKind {
    /// Float channels are treated as distance percentage, everything else as a counter.
    ///
    /// A float-typed lap counter therefore never wraps and decodes as a single lap;
    /// set [`LapChannelKind::Counter`] explicitly for such captures.
    #[default]
    Auto,
    /// Lap number counter: a change in value starts a new lap
    Counter,
    /// Lap distance fraction that wraps toward zero at the start/finish line
    DistancePct,
}

/// Options controlling a capture decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Channel used for lap segmentation
    pub lap_channel: String,
    pub lap_channel_kind: LapChannelKind,
    /// Session clock channel, in seconds
    pub timestamp_channel: String,
    /// Changes of the lap channel at or below this magnitude are treated as noise
    pub boundary_epsilon: f64,
    /// Full-scale value of a distance percentage channel
    pub distance_range: f64,
    /// Stop decoding after this many rows
    pub max_rows: Option<usize>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            lap_channel: "Lap".to_string(),
            lap_channel_kind: LapChannelKind::Auto,
            timestamp_channel: "SessionTime".to_string(),
            boundary_epsilon: 1e-6,
            distance_range: 1.0,
            max_rows: None,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a YAML document; omitted fields keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml_ng::Error> {
        serde_yaml_ng::from_str(yaml)
    }

    pub fn lap_channel(mut self, name: impl Into<String>) -> Self {
        self.lap_channel = name.into();
        self
    }

    pub fn lap_channel_kind(mut self, kind: LapChannelKind) -> Self {
        self.lap_channel_kind = kind;
        self
    }

    pub fn timestamp_channel(mut self, name: impl Into<String>) -> Self {
        self.timestamp_channel = name.into();
        self
    }

    pub fn boundary_epsilon(mut self, epsilon: f64) -> Self {
        self.boundary_epsilon = epsilon.abs();
        self
    }

    pub fn distance_range(mut self, range: f64) -> Self {
        self.distance_range = range;
        self
    }

    pub fn max_rows(mut self, limit: usize) -> Self {
        self.max_rows = Some(limit);
        self
    }
}
