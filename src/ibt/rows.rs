//! Lazy sample row decoding
//!
//! [`RowDecoder`] walks the active sample buffer one stride at a time, producing a
//! [`SampleRow`] per complete slice. It is a single forward pass over borrowed
//! capture bytes; nothing beyond the current row is materialized.
//!
//! Damage to the sample region is a data-plane condition: the sequence stops at the
//! last complete row and the decoder records a [`DecodeWarning`] instead of failing.

use std::iter::FusedIterator;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::format::FormatHeader;
use crate::DecodeWarning;
use crate::types::{ChannelDictionary, SampleRow, decode_field};

/// Forward-only iterator over the sample rows of a capture.
#[derive(Debug)]
pub struct RowDecoder<'a> {
    buffer: &'a [u8],
    stride: usize,
    dictionary: Arc<ChannelDictionary>,
    next_index: usize,
    available_rows: usize,
    expected_rows: Option<usize>,
    discarded_bytes: usize,
    limit: Option<usize>,
    warnings: Vec<DecodeWarning>,
    finished: bool,
}

impl<'a> RowDecoder<'a> {
    /// Prepare a decoder over the active sample buffer described by `header`.
    pub fn new(
        capture: &'a [u8],
        header: &FormatHeader,
        dictionary: Arc<ChannelDictionary>,
        max_rows: Option<usize>,
    ) -> Self {
        let stride = header.buf_len.max(dictionary.row_extent());

        let mut decoder = Self {
            buffer: &[],
            stride,
            dictionary,
            next_index: 0,
            available_rows: 0,
            expected_rows: None,
            discarded_bytes: 0,
            limit: max_rows,
            warnings: Vec::new(),
            finished: false,
        };

        let Some(active) = header.active_buffer() else {
            debug!("Capture declares no sample buffers");
            return decoder;
        };
        if stride == 0 {
            debug!("Capture rows are zero bytes wide");
            return decoder;
        }

        let region = capture.get(active.offset..).unwrap_or_default();
        decoder.expected_rows = if header.is_disk_capture() {
            usize::try_from(header.disk.record_count).ok().filter(|&n| n > 0)
        } else {
            Some(1)
        };

        let (buffer, discarded) = match decoder.expected_rows {
            Some(rows) => {
                let declared = rows.saturating_mul(stride);
                if region.len() >= declared {
                    if region.len() > declared {
                        trace!(extra = region.len() - declared, "Ignoring bytes after sample buffer");
                    }
                    (&region[..declared], 0)
                } else {
                    warn!(
                        expected_rows = rows,
                        available_bytes = region.len(),
                        declared_bytes = declared,
                        "Sample buffer shorter than record count"
                    );
                    let complete = region.len() / stride * stride;
                    (&region[..complete], region.len() - complete)
                }
            }
            None => {
                let complete = region.len() / stride * stride;
                (&region[..complete], region.len() - complete)
            }
        };

        decoder.buffer = buffer;
        decoder.available_rows = buffer.len() / stride;
        decoder.discarded_bytes = discarded;

        debug!(
            stride,
            rows = decoder.available_rows,
            expected_rows = ?decoder.expected_rows,
            discarded_bytes = discarded,
            limit = ?max_rows,
            "Sample buffer ready"
        );
        decoder
    }

    /// Row stride in bytes.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Rows declared by the capture, when it declares a count.
    pub fn expected_rows(&self) -> Option<usize> {
        self.expected_rows
    }

    /// Rows produced so far.
    pub fn decoded_rows(&self) -> usize {
        self.next_index
    }

    pub fn dictionary(&self) -> &Arc<ChannelDictionary> {
        &self.dictionary
    }

    /// Warnings recorded so far; complete once the iterator is exhausted.
    pub fn warnings(&self) -> &[DecodeWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<DecodeWarning> {
        self.warnings
    }

    fn is_truncated(&self) -> bool {
        self.discarded_bytes > 0
            || self.expected_rows.is_some_and(|expected| self.available_rows < expected)
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        if self.is_truncated() {
            let warning = DecodeWarning::TruncatedData {
                expected_rows: self.expected_rows,
                decoded_rows: self.next_index,
                discarded_bytes: self.discarded_bytes,
            };
            warn!(%warning, "Sample data truncated");
            self.warnings.push(warning);
        }
    }
}

impl Iterator for RowDecoder<'_> {
    type Item = SampleRow;

    fn next(&mut self) -> Option<SampleRow> {
        if self.finished {
            return None;
        }

        if self.next_index >= self.available_rows {
            self.finish();
            return None;
        }

        if let Some(limit) = self.limit.filter(|&limit| self.next_index >= limit) {
            warn!(limit, "Row limit reached");
            self.warnings.push(DecodeWarning::RowLimitReached { limit });
            // A short buffer is still reported when the limit stops iteration first
            self.finish();
            return None;
        }

        let start = self.next_index * self.stride;
        let slice = &self.buffer[start..start + self.stride];

        let values = self
            .dictionary
            .descriptors()
            .iter()
            .map(|d| decode_field(slice, d.scalar_type, d.offset, d.count))
            .collect::<Option<Vec<_>>>();

        let Some(values) = values else {
            // A field reaches past the row; the row is unusable and so is the rest
            self.discarded_bytes += self.buffer.len() - start;
            self.available_rows = self.next_index;
            self.finish();
            return None;
        };

        let row = SampleRow::new(self.next_index, values, Arc::clone(&self.dictionary));
        self.next_index += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            return (0, Some(0));
        }
        let end = self.limit.map_or(self.available_rows, |l| l.min(self.available_rows));
        (0, Some(end.saturating_sub(self.next_index)))
    }
}

impl FusedIterator for RowDecoder<'_> {}

/// Decode the sample rows of a capture lazily.
pub fn decode_rows<'a>(
    capture: &'a [u8],
    header: &FormatHeader,
    dictionary: Arc<ChannelDictionary>,
    max_rows: Option<usize>,
) -> RowDecoder<'a> {
    RowDecoder::new(capture, header, dictionary, max_rows)
}
