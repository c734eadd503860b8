//! IBT capture reader
//!
//! Loads a capture into memory, validates its header and variable dictionary up
//! front, then hands out row iterators and the full decode on demand.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use pitwall_ingest::{DecodeOptions, IbtReader};
//!
//! fn summarize() -> pitwall_ingest::Result<()> {
//!     let reader = IbtReader::open("telemetry.ibt")?;
//!     println!("{} channels at {} Hz", reader.dictionary().len(), reader.header().tick_rate);
//!
//!     let session = reader.decode(&DecodeOptions::default())?;
//!     for lap in session.laps() {
//!         println!("Lap {}: {:?} ms", lap.number(), lap.lap_time_ms());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Performance Notes
//!
//! - File data is loaded into memory once; cloning the reader shares it
//! - The dictionary is decoded once and shared by every row
//! - Rows are decoded lazily as the iterator advances

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::format::{FormatHeader, read_header};
use super::rows::RowDecoder;
use crate::options::DecodeOptions;
use crate::pipeline::decode_with;
use crate::schema::{SessionMetadata, read_session_info, read_variables};
use crate::session::TelemetrySession;
use crate::types::{ChannelDictionary, RawCapture};
use crate::{Result, yaml_utils};

/// Reader over one in-memory IBT capture with a validated header and dictionary.
#[derive(Debug, Clone)]
pub struct IbtReader {
    capture: RawCapture,
    path: PathBuf,
    header: FormatHeader,
    dictionary: Arc<ChannelDictionary>,
}

impl IbtReader {
    /// Open an IBT file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let capture = RawCapture::read(path)?;
        Self::from_capture_with_path(capture, path.to_path_buf())
    }

    /// Create a reader from capture bytes.
    pub fn from_bytes(bytes: impl Into<RawCapture>) -> Result<Self> {
        Self::from_capture(bytes.into())
    }

    pub fn from_capture(capture: RawCapture) -> Result<Self> {
        Self::from_capture_with_path(capture, PathBuf::from("<memory>"))
    }

    fn from_capture_with_path(capture: RawCapture, path: PathBuf) -> Result<Self> {
        let header = read_header(capture.as_bytes())?;
        let dictionary = Arc::new(read_variables(capture.as_bytes(), &header)?);

        debug!(
            path = %path.display(),
            size = capture.len(),
            channels = dictionary.len(),
            records = header.disk.record_count,
            "Opened IBT capture"
        );

        Ok(Self { capture, path, header, dictionary })
    }

    pub fn header(&self) -> &FormatHeader {
        &self.header
    }

    pub fn dictionary(&self) -> &Arc<ChannelDictionary> {
        &self.dictionary
    }

    pub fn capture(&self) -> &RawCapture {
        &self.capture
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lazily decode every sample row.
    pub fn rows(&self) -> RowDecoder<'_> {
        self.rows_with_limit(None)
    }

    /// Lazily decode at most `max_rows` sample rows.
    pub fn rows_with_limit(&self, max_rows: Option<usize>) -> RowDecoder<'_> {
        RowDecoder::new(self.capture.as_bytes(), &self.header, Arc::clone(&self.dictionary), max_rows)
    }

    /// Cleaned session YAML, or `None` when the capture carries none.
    pub fn session_yaml(&self) -> Option<String> {
        let region = self.capture.as_bytes().get(self.header.session_info_range())?;
        let yaml = yaml_utils::preprocess_session_yaml(&yaml_utils::extract_session_yaml(region));
        (!yaml.trim().is_empty()).then_some(yaml)
    }

    /// Decode the session info block.
    pub fn session_info(&self) -> Result<SessionMetadata> {
        read_session_info(self.capture.as_bytes(), &self.header)
    }

    /// Run the full decode: session info, rows, laps and assembly.
    pub fn decode(&self, options: &DecodeOptions) -> Result<TelemetrySession> {
        decode_with(self.capture.as_bytes(), &self.header, Arc::clone(&self.dictionary), options)
    }
}
