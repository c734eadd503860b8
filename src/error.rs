//! Error and warning types for capture decoding.
//!
//! Decoding distinguishes two planes:
//!
//! - **Structural errors** ([`DecodeError`]): the header or variable dictionary cannot be
//!   trusted, so no row can be decoded unambiguously. These abort the pipeline.
//! - **Data-plane warnings** ([`DecodeWarning`]): the capture is damaged or incomplete but
//!   a degraded result is still useful (truncated rows, corrupt session info, missing lap
//!   channel). These are recovered locally and attached to the resulting session.
//!
//! ## Recovery guidance
//!
//! ```rust
//! use pitwall_ingest::DecodeError;
//!
//! let error = DecodeError::UnsupportedVersion { found: 3, supported: 2 };
//! assert!(error.is_fatal());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```
//!
//! ## Helper constructors
//!
//! ```rust
//! use pitwall_ingest::DecodeError;
//! use std::path::PathBuf;
//!
//! let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
//! let file_error = DecodeError::file_error(PathBuf::from("/path/to/session.ibt"), io_err);
//!
//! let header_error = DecodeError::truncated_header("session info", "ends past capture");
//! ```

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for decode operations.
pub type Result<T, E = DecodeError> = std::result::Result<T, E>;

/// Classification of decode failures and warnings, independent of payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedVersion,
    TruncatedHeader,
    InvalidChannelName,
    InvalidDescriptor,
    DuplicateChannel,
    OverlappingChannel,
    TruncatedData,
    RowLimitReached,
    SessionInfoCorrupt,
    LapChannelMissing,
    EmptyCapture,
    File,
    Batch,
}

/// Fatal error produced while decoding a capture.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DecodeError {
    #[error("Unsupported capture version {found} (supported: {supported})")]
    UnsupportedVersion { found: i32, supported: i32 },

    #[error("Header region '{region}' is truncated or corrupt: {details}")]
    TruncatedHeader { region: &'static str, details: String },

    #[error("Channel name at dictionary index {index} is not printable: {raw:?}")]
    InvalidChannelName { index: usize, raw: Vec<u8> },

    #[error("Channel '{name}' (dictionary index {index}) has an invalid layout: {details}")]
    InvalidDescriptor { index: usize, name: String, details: String },

    #[error("Channel '{name}' is declared more than once")]
    DuplicateChannel { name: String },

    #[error("Channels '{first}' and '{second}' overlap at row offset {offset}")]
    OverlappingChannel { first: String, second: String, offset: usize },

    #[error("Session info block is corrupt: {details}")]
    SessionInfoCorrupt { details: String },

    #[error("Capture contains no channels and no sample rows")]
    EmptyCapture,

    #[error("Capture file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Batch decode of capture {index} failed: {details}")]
    Batch { index: usize, details: String },
}

impl DecodeError {
    /// Returns the taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            DecodeError::TruncatedHeader { .. } => ErrorKind::TruncatedHeader,
            DecodeError::InvalidChannelName { .. } => ErrorKind::InvalidChannelName,
            DecodeError::InvalidDescriptor { .. } => ErrorKind::InvalidDescriptor,
            DecodeError::DuplicateChannel { .. } => ErrorKind::DuplicateChannel,
            DecodeError::OverlappingChannel { .. } => ErrorKind::OverlappingChannel,
            DecodeError::SessionInfoCorrupt { .. } => ErrorKind::SessionInfoCorrupt,
            DecodeError::EmptyCapture => ErrorKind::EmptyCapture,
            DecodeError::File { .. } => ErrorKind::File,
            DecodeError::Batch { .. } => ErrorKind::Batch,
        }
    }

    /// Returns whether this error aborts decoding of the whole capture.
    ///
    /// `SessionInfoCorrupt` is only returned by the session info decoder itself;
    /// the pipeline downgrades it to a [`DecodeWarning`]. `EmptyCapture` is an
    /// empty-result signal rather than corruption.
    pub fn is_fatal(&self) -> bool {
        match self {
            DecodeError::UnsupportedVersion { .. }
            | DecodeError::TruncatedHeader { .. }
            | DecodeError::InvalidChannelName { .. }
            | DecodeError::InvalidDescriptor { .. }
            | DecodeError::DuplicateChannel { .. }
            | DecodeError::OverlappingChannel { .. }
            | DecodeError::File { .. }
            | DecodeError::Batch { .. } => true,
            DecodeError::SessionInfoCorrupt { .. } | DecodeError::EmptyCapture => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            DecodeError::UnsupportedVersion { .. } => vec![
                "Re-export the telemetry with a supported simulator build",
                "Update this library to a release that understands the new version",
            ],
            DecodeError::TruncatedHeader { .. } => vec![
                "Check the upload completed and the object is not truncated",
                "Verify the file is an IBT telemetry capture",
            ],
            DecodeError::InvalidChannelName { .. }
            | DecodeError::InvalidDescriptor { .. }
            | DecodeError::DuplicateChannel { .. }
            | DecodeError::OverlappingChannel { .. } => vec![
                "The variable dictionary is damaged; re-record the session",
                "Verify the capture was not modified by another tool",
            ],
            DecodeError::SessionInfoCorrupt { .. } => vec![
                "Telemetry is still usable; session metadata will be reported as unknown",
            ],
            DecodeError::EmptyCapture => vec![
                "Ensure telemetry recording was enabled in the simulator",
                "Check the session lasted long enough to record samples",
            ],
            DecodeError::File { .. } => vec![
                "Check file exists and is readable",
                "Check file permissions",
            ],
            DecodeError::Batch { .. } => vec![
                "Retry the capture on its own to isolate the failure",
            ],
        }
    }

    /// Downgrade a recoverable error into the warning attached to a degraded session.
    ///
    /// Returns `None` for fatal errors.
    pub fn into_warning(self) -> Option<DecodeWarning> {
        match self {
            DecodeError::SessionInfoCorrupt { details } => {
                Some(DecodeWarning::SessionInfoCorrupt { details })
            }
            DecodeError::EmptyCapture => Some(DecodeWarning::EmptyCapture),
            _ => None,
        }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        DecodeError::File { path, source }
    }

    /// Helper constructor for header region errors.
    pub fn truncated_header(region: &'static str, details: impl Into<String>) -> Self {
        DecodeError::TruncatedHeader { region, details: details.into() }
    }

    /// Helper constructor for descriptor layout errors.
    pub fn invalid_descriptor(
        index: usize,
        name: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        DecodeError::InvalidDescriptor { index, name: name.into(), details: details.into() }
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(err: std::io::Error) -> Self {
        DecodeError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

/// Non-fatal condition recovered during decoding and attached to the session.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeWarning {
    #[error(
        "Sample data truncated: decoded {decoded_rows} rows, discarded {discarded_bytes} trailing bytes"
    )]
    TruncatedData { expected_rows: Option<usize>, decoded_rows: usize, discarded_bytes: usize },

    #[error("Row limit of {limit} reached; remaining rows were not decoded")]
    RowLimitReached { limit: usize },

    #[error("Session info block is corrupt: {details}")]
    SessionInfoCorrupt { details: String },

    #[error("Lap channel '{channel}' unavailable ({reason}); session treated as a single lap")]
    LapChannelMissing { channel: String, reason: String },

    #[error("Capture header is valid but contains no sample rows")]
    EmptyCapture,
}

impl DecodeWarning {
    /// Returns the taxonomy kind of this warning.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeWarning::TruncatedData { .. } => ErrorKind::TruncatedData,
            DecodeWarning::RowLimitReached { .. } => ErrorKind::RowLimitReached,
            DecodeWarning::SessionInfoCorrupt { .. } => ErrorKind::SessionInfoCorrupt,
            DecodeWarning::LapChannelMissing { .. } => ErrorKind::LapChannelMissing,
            DecodeWarning::EmptyCapture => ErrorKind::EmptyCapture,
        }
    }
}
