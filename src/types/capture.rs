//! Raw capture bytes

use std::path::Path;
use std::sync::Arc;

use crate::{DecodeError, Result};

/// Immutable, fully materialized capture bytes.
///
/// Cloning is cheap; the bytes are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCapture {
    bytes: Arc<[u8]>,
}

impl RawCapture {
    /// Read a capture file into memory.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| DecodeError::file_error(path.to_path_buf(), e))?;
        Ok(Self::from(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Vec<u8>> for RawCapture {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes: bytes.into() }
    }
}

impl From<&[u8]> for RawCapture {
    fn from(bytes: &[u8]) -> Self {
        Self { bytes: bytes.into() }
    }
}

impl From<Arc<[u8]>> for RawCapture {
    fn from(bytes: Arc<[u8]>) -> Self {
        Self { bytes }
    }
}

impl AsRef<[u8]> for RawCapture {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
