//! End-to-end decode of one capture.
//!
//! ```text
//! read_header ──► read_variables ──► read_session_info
//!                        │
//!                        ▼
//!                 RowDecoder ──(streamed)──► LapSegmenter ──► assemble
//! ```
//!
//! Structural failures return early. Data-plane problems are downgraded to
//! warnings on the resulting [`TelemetrySession`].

use std::sync::Arc;
use tracing::{debug, warn};

use crate::ibt::format::{FormatHeader, read_header};
use crate::ibt::rows::RowDecoder;
use crate::laps::LapSegmenter;
use crate::options::DecodeOptions;
use crate::schema::{SessionMetadata, read_session_info, read_variables};
use crate::session::{TelemetrySession, assemble};
use crate::types::{ChannelDictionary, RawCapture};
use crate::{DecodeError, DecodeWarning, Result};

/// Decode a capture into a [`TelemetrySession`].
pub fn decode(capture: &RawCapture, options: &DecodeOptions) -> Result<TelemetrySession> {
    decode_bytes(capture.as_bytes(), options)
}

/// Decode capture bytes into a [`TelemetrySession`].
pub fn decode_bytes(capture: &[u8], options: &DecodeOptions) -> Result<TelemetrySession> {
    let header = read_header(capture)?;
    let dictionary = Arc::new(read_variables(capture, &header)?);
    decode_with(capture, &header, dictionary, options)
}

/// Decode the data plane once the header and dictionary are trusted.
pub(crate) fn decode_with(
    capture: &[u8],
    header: &FormatHeader,
    dictionary: Arc<ChannelDictionary>,
    options: &DecodeOptions,
) -> Result<TelemetrySession> {
    debug!(
        capture_len = capture.len(),
        channels = dictionary.len(),
        lap_channel = %options.lap_channel,
        "Decoding capture"
    );

    let mut warnings = Vec::new();
    let metadata = match read_session_info(capture, header) {
        Ok(metadata) => metadata,
        Err(DecodeError::SessionInfoCorrupt { details }) => {
            let warning = DecodeWarning::SessionInfoCorrupt { details };
            warn!(%warning, "Continuing with empty session metadata");
            warnings.push(warning);
            SessionMetadata::from_header(header)
        }
        Err(error) => return Err(error),
    };

    let mut rows = RowDecoder::new(capture, header, Arc::clone(&dictionary), options.max_rows);
    let mut segmenter = LapSegmenter::new(&dictionary, options, header.tick_rate);
    for row in rows.by_ref() {
        segmenter.push(row);
    }
    warnings.extend(rows.into_warnings());

    assemble(metadata, segmenter.finish(), dictionary, warnings)
}
