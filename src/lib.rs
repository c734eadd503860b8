//! IBT telemetry decoding and lap segmentation for session ingestion.
//!
//! Pitwall Ingest turns an iRacing `.ibt` capture into a [`TelemetrySession`]:
//! session metadata, the channel catalogue, and the sample stream split into laps.
//!
//! # Features
//!
//! - **Validated schema**: header and variable dictionary are checked before any row is read
//! - **Streaming rows**: rows are decoded lazily and fed straight into lap segmentation
//! - **Degraded-mode decode**: truncated data, corrupt session info and a missing lap
//!   channel are recovered and reported as [`DecodeWarning`]s
//! - **Batch decoding**: independent captures decode concurrently via [`decode_batch`]
//!
//! # Pipeline
//!
//! ```text
//! RawCapture ─► read_header ─► read_variables ─► read_session_info
//!                                   │
//!                                   ▼
//!                             RowDecoder ─► LapSegmenter ─► assemble ─► TelemetrySession
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use pitwall_ingest::ibt::CaptureBuilder;
//! use pitwall_ingest::types::ScalarType;
//! use pitwall_ingest::{DecodeOptions, decode_bytes};
//!
//! let mut builder = CaptureBuilder::new()
//!     .channel("Lap", ScalarType::Int32, 1, "")
//!     .channel("SessionTime", ScalarType::Float64, 1, "s");
//! for (i, lap) in [1, 1, 1, 2, 2, 3, 3, 3].into_iter().enumerate() {
//!     builder = builder.row(|row| row.i32("Lap", lap).f64("SessionTime", i as f64));
//! }
//!
//! let session = decode_bytes(&builder.build(), &DecodeOptions::default()).unwrap();
//! let counts: Vec<usize> = session.laps().iter().map(|lap| lap.row_count()).collect();
//! assert_eq!(counts, vec![3, 2, 3]);
//! assert_eq!(session.channel_catalogue(), vec!["Lap", "SessionTime"]);
//! ```

// Core types and error handling
mod error;
pub mod options;
pub mod types;
mod yaml_utils;

// Decode stages
pub mod ibt;
pub mod laps;
pub mod schema;
pub mod session;

// Pipeline and outputs
mod batch;
mod pipeline;
pub mod records;

// Core exports
pub use error::*;
pub use options::{DecodeOptions, LapChannelKind};
pub use types::RawCapture;

// Stage exports
pub use ibt::{IbtReader, read_header};
pub use laps::{Lap, LapInvalidReason, LapStart, Segmentation, segment_laps};
pub use schema::{SessionMetadata, UNKNOWN, read_session_info, read_variables};
pub use session::{TelemetrySession, assemble};

// Main API exports
pub use batch::decode_batch;
pub use pipeline::{decode, decode_bytes};
pub use records::{ChannelRecord, LapRecord, SessionRecord, SessionRecords, SessionStatus};
