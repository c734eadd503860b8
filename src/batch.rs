//! Concurrent decoding of independent captures.
//!
//! Each capture gets its own pipeline on tokio's blocking pool; nothing is shared
//! between pipelines except the read-only options. Results come back in input order.
//!
//! ```rust
//! use pitwall_ingest::ibt::CaptureBuilder;
//! use pitwall_ingest::types::{RawCapture, ScalarType};
//! use pitwall_ingest::{DecodeOptions, decode_batch};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let capture: RawCapture = CaptureBuilder::new()
//!     .channel("Lap", ScalarType::Int32, 1, "")
//!     .row(|row| row.i32("Lap", 1))
//!     .build()
//!     .into();
//!
//! let results = decode_batch(vec![capture.clone(), capture], &DecodeOptions::default()).await;
//! assert_eq!(results.len(), 2);
//! assert!(results.iter().all(|r| r.is_ok()));
//! # }
//! ```

use std::sync::Arc;
use tracing::{debug, error};

use crate::options::DecodeOptions;
use crate::pipeline::decode;
use crate::session::TelemetrySession;
use crate::types::RawCapture;
use crate::{DecodeError, Result};

/// Decode many captures concurrently, one blocking task per capture.
///
/// A panicking pipeline is reported as [`DecodeError::Batch`] for that capture only.
pub async fn decode_batch<I>(captures: I, options: &DecodeOptions) -> Vec<Result<TelemetrySession>>
where
    I: IntoIterator<Item = RawCapture>,
{
    let options = Arc::new(options.clone());

    let tasks: Vec<_> = captures
        .into_iter()
        .enumerate()
        .map(|(index, capture)| {
            let options = Arc::clone(&options);
            tokio::task::spawn_blocking(move || {
                debug!(index, size = capture.len(), "Batch decode started");
                decode(&capture, &options)
            })
        })
        .collect();

    debug!(captures = tasks.len(), "Waiting for batch decode");

    futures::future::join_all(tasks)
        .await
        .into_iter()
        .enumerate()
        .map(|(index, joined)| {
            joined.unwrap_or_else(|e| {
                error!(index, error = %e, "Batch decode task failed");
                Err(DecodeError::Batch { index, details: e.to_string() })
            })
        })
        .collect()
}
