//! Synthetic IBT capture encoder.
//!
//! [`CaptureBuilder`] lays out a disk capture exactly as the decoder expects it:
//! preamble, variable dictionary, session info block, then one contiguous sample
//! buffer (or up to four snapshot buffers). Channels declared with
//! [`CaptureBuilder::channel`] are packed back to back in declaration order.
//!
//! ```rust
//! use pitwall_ingest::ibt::CaptureBuilder;
//! use pitwall_ingest::types::ScalarType;
//!
//! let bytes = CaptureBuilder::new()
//!     .channel("Lap", ScalarType::Int32, 1, "")
//!     .channel("Speed", ScalarType::Float32, 1, "m/s")
//!     .row(|row| row.i32("Lap", 1).f32("Speed", 41.5))
//!     .row(|row| row.i32("Lap", 2).f32("Speed", 43.0))
//!     .build();
//!
//! let reader = pitwall_ingest::IbtReader::from_bytes(bytes).unwrap();
//! assert_eq!(reader.rows().count(), 2);
//! ```

use tracing::warn;

use super::format::{
    IRSDK_HEADER_SIZE, IRSDK_MAX_BUFS, IRSDK_VAR_DESC_SIZE, IRSDK_VAR_HEADER_SIZE,
    IRSDK_VAR_NAME_SIZE, IRSDK_VAR_UNIT_SIZE, PREAMBLE_SIZE, SUPPORTED_VERSION,
};
use crate::types::{ScalarType, Value};

#[derive(Debug, Clone)]
struct ChannelSpec {
    name: String,
    scalar_type: ScalarType,
    count: usize,
    offset: usize,
    unit: String,
    description: String,
}

/// Values for one sample row, keyed by channel name.
///
/// Channels left unset encode as zero bytes.
#[derive(Debug, Clone, Default)]
pub struct RowWriter {
    values: Vec<(String, Value)>,
}

impl RowWriter {
    pub fn value(mut self, name: &str, value: Value) -> Self {
        self.values.push((name.to_string(), value));
        self
    }

    pub fn f64(self, name: &str, value: f64) -> Self {
        self.value(name, Value::Float64(value))
    }

    pub fn f32(self, name: &str, value: f32) -> Self {
        self.value(name, Value::Float32(value))
    }

    pub fn i32(self, name: &str, value: i32) -> Self {
        self.value(name, Value::Int32(value))
    }

    pub fn u32(self, name: &str, value: u32) -> Self {
        self.value(name, Value::UInt32(value))
    }

    pub fn i64(self, name: &str, value: i64) -> Self {
        self.value(name, Value::Int64(value))
    }

    pub fn bool(self, name: &str, value: bool) -> Self {
        self.value(name, Value::Bool(value))
    }

    pub fn bytes(self, name: &str, value: &[u8]) -> Self {
        self.value(name, Value::Bytes(value.to_vec()))
    }
}

/// Builder for synthetic IBT disk captures.
#[derive(Debug, Clone)]
pub struct CaptureBuilder {
    version: i32,
    tick_rate: i32,
    start_date: i64,
    channels: Vec<ChannelSpec>,
    next_offset: usize,
    session_info: String,
    rows: Vec<RowWriter>,
    buf_len: Option<usize>,
    record_count: Option<i32>,
    snapshot_ticks: Vec<i32>,
    truncate: usize,
}

impl Default for CaptureBuilder {
    fn default() -> Self {
        Self {
            version: SUPPORTED_VERSION,
            tick_rate: 60,
            start_date: 0,
            channels: Vec::new(),
            next_offset: 0,
            session_info: String::new(),
            rows: Vec::new(),
            buf_len: None,
            record_count: None,
            snapshot_ticks: Vec::new(),
            truncate: 0,
        }
    }
}

impl CaptureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Header version field; anything other than 2 is rejected by the decoder.
    pub fn version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn tick_rate(mut self, tick_rate: i32) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Session start as unix seconds.
    pub fn start_date(mut self, unix_seconds: i64) -> Self {
        self.start_date = unix_seconds;
        self
    }

    /// Declare a channel packed directly after the previous one.
    pub fn channel(self, name: &str, scalar_type: ScalarType, count: usize, unit: &str) -> Self {
        let offset = self.next_offset;
        self.channel_at(name, scalar_type, count, offset, unit)
    }

    /// Declare a channel at an explicit row offset.
    pub fn channel_at(
        mut self,
        name: &str,
        scalar_type: ScalarType,
        count: usize,
        offset: usize,
        unit: &str,
    ) -> Self {
        self.next_offset = self.next_offset.max(offset + scalar_type.size() * count);
        self.channels.push(ChannelSpec {
            name: name.to_string(),
            scalar_type,
            count,
            offset,
            unit: unit.to_string(),
            description: format!("{} channel", name),
        });
        self
    }

    /// Embedded session info YAML.
    pub fn session_info(mut self, yaml: &str) -> Self {
        self.session_info = yaml.to_string();
        self
    }

    pub fn row(mut self, fill: impl FnOnce(RowWriter) -> RowWriter) -> Self {
        self.rows.push(fill(RowWriter::default()));
        self
    }

    /// Declared row length; defaults to the packed channel extent.
    pub fn buf_len(mut self, buf_len: usize) -> Self {
        self.buf_len = Some(buf_len);
        self
    }

    /// Override the disk sub-header record count (defaults to the rows written).
    pub fn record_count(mut self, record_count: i32) -> Self {
        self.record_count = Some(record_count);
        self
    }

    /// Lay the rows out as memory snapshot buffers, one row per buffer.
    ///
    /// Buffer `i` holds row `i` (zeroed when fewer rows were written) and carries
    /// `tick_counts[i]`. Pass two to four tick counts; a single buffer reads as a
    /// disk capture.
    pub fn snapshot_buffers(mut self, tick_counts: &[i32]) -> Self {
        self.snapshot_ticks = tick_counts.iter().copied().take(IRSDK_MAX_BUFS).collect();
        self
    }

    /// Drop this many bytes from the end of the encoded capture.
    pub fn truncate(mut self, bytes: usize) -> Self {
        self.truncate = bytes;
        self
    }

    /// Offset of the variable dictionary in the encoded capture.
    pub fn dictionary_offset(&self) -> usize {
        PREAMBLE_SIZE
    }

    /// Offset of the sample buffer in the encoded capture.
    pub fn buffer_offset(&self) -> usize {
        PREAMBLE_SIZE + self.channels.len() * IRSDK_VAR_HEADER_SIZE + self.session_info_bytes().len()
    }

    /// Row stride the encoded capture will use.
    pub fn stride(&self) -> usize {
        self.buf_len.unwrap_or(0).max(self.next_offset)
    }

    fn session_info_bytes(&self) -> Vec<u8> {
        if self.session_info.is_empty() {
            return Vec::new();
        }
        let mut bytes = self.session_info.clone().into_bytes();
        bytes.push(0);
        bytes
    }

    pub fn build(&self) -> Vec<u8> {
        let session_info = self.session_info_bytes();
        let buf_len = self.buf_len.unwrap_or(self.next_offset);
        let stride = self.stride();
        let dict_offset = self.dictionary_offset();
        let session_offset = dict_offset + self.channels.len() * IRSDK_VAR_HEADER_SIZE;
        let buffer_offset = self.buffer_offset();
        let record_count = self.record_count.unwrap_or(self.rows.len() as i32);

        let slots = self.rows.len().max(self.snapshot_ticks.len());
        let mut out = vec![0u8; buffer_offset + stride * slots];

        put_i32(&mut out, 0, self.version);
        put_i32(&mut out, 4, 1);
        put_i32(&mut out, 8, self.tick_rate);
        put_i32(&mut out, 12, 1);
        put_i32(&mut out, 16, session_info.len() as i32);
        put_i32(&mut out, 20, session_offset as i32);
        put_i32(&mut out, 24, self.channels.len() as i32);
        put_i32(&mut out, 28, dict_offset as i32);
        put_i32(&mut out, 36, buf_len as i32);
        if self.snapshot_ticks.is_empty() {
            put_i32(&mut out, 32, 1);
            put_i32(&mut out, 48, self.rows.len() as i32);
            put_i32(&mut out, 52, buffer_offset as i32);
        } else {
            put_i32(&mut out, 32, self.snapshot_ticks.len() as i32);
            for (i, &tick_count) in self.snapshot_ticks.iter().enumerate() {
                put_i32(&mut out, 48 + i * 16, tick_count);
                put_i32(&mut out, 52 + i * 16, (buffer_offset + i * stride) as i32);
            }
        }

        // Disk sub-header
        let base = IRSDK_HEADER_SIZE;
        out[base..base + 8].copy_from_slice(&self.start_date.to_le_bytes());
        let end_time = self.rows.len() as f64 / self.tick_rate.max(1) as f64;
        out[base + 8..base + 16].copy_from_slice(&0f64.to_le_bytes());
        out[base + 16..base + 24].copy_from_slice(&end_time.to_le_bytes());
        put_i32(&mut out, base + 28, record_count);

        for (i, channel) in self.channels.iter().enumerate() {
            let at = dict_offset + i * IRSDK_VAR_HEADER_SIZE;
            put_i32(&mut out, at, channel.scalar_type.code());
            put_i32(&mut out, at + 4, channel.offset as i32);
            put_i32(&mut out, at + 8, channel.count as i32);
            put_str(&mut out[at + 16..at + 16 + IRSDK_VAR_NAME_SIZE], &channel.name);
            put_str(&mut out[at + 48..at + 48 + IRSDK_VAR_DESC_SIZE], &channel.description);
            put_str(&mut out[at + 112..at + 112 + IRSDK_VAR_UNIT_SIZE], &channel.unit);
        }

        out[session_offset..session_offset + session_info.len()].copy_from_slice(&session_info);

        for (r, row) in self.rows.iter().enumerate() {
            let start = buffer_offset + r * stride;
            let slot = &mut out[start..start + stride];
            for (name, value) in &row.values {
                match self.channels.iter().find(|c| &c.name == name) {
                    Some(channel) => encode_field(slot, channel, value),
                    None => warn!(channel = %name, row = r, "Ignoring value for undeclared channel"),
                }
            }
        }

        out.truncate(out.len().saturating_sub(self.truncate));
        out
    }
}

fn put_i32(out: &mut [u8], offset: usize, value: i32) {
    out[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_str(field: &mut [u8], value: &str) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(field.len().saturating_sub(1));
    field[..len].copy_from_slice(&bytes[..len]);
}

fn encode_field(slot: &mut [u8], channel: &ChannelSpec, value: &Value) {
    let size = channel.scalar_type.size();
    let field = &mut slot[channel.offset..channel.offset + size * channel.count];
    match value {
        Value::Bytes(bytes) => {
            let len = bytes.len().min(field.len());
            field[..len].copy_from_slice(&bytes[..len]);
        }
        Value::Array(items) => {
            for (element, item) in field.chunks_exact_mut(size).zip(items) {
                encode_element(channel.scalar_type, item, element);
            }
        }
        scalar => encode_element(channel.scalar_type, scalar, &mut field[..size]),
    }
}

/// Encode one value into a channel element, converting numerically to the declared type.
fn encode_element(scalar_type: ScalarType, value: &Value, out: &mut [u8]) {
    let int = integer(value);
    match scalar_type {
        ScalarType::Char | ScalarType::UInt8 => out[0] = int as u8,
        ScalarType::Bool => out[0] = u8::from(int != 0),
        ScalarType::Int8 => out.copy_from_slice(&(int as i8).to_le_bytes()),
        ScalarType::Int16 => out.copy_from_slice(&(int as i16).to_le_bytes()),
        ScalarType::UInt16 => out.copy_from_slice(&(int as u16).to_le_bytes()),
        ScalarType::Int32 => out.copy_from_slice(&(int as i32).to_le_bytes()),
        ScalarType::UInt32 | ScalarType::BitField => {
            out.copy_from_slice(&(int as u32).to_le_bytes())
        }
        ScalarType::Int64 => out.copy_from_slice(&(int as i64).to_le_bytes()),
        ScalarType::UInt64 => out.copy_from_slice(&(int as u64).to_le_bytes()),
        ScalarType::Float32 => {
            out.copy_from_slice(&(value.as_f64().unwrap_or(0.0) as f32).to_le_bytes())
        }
        ScalarType::Float64 => out.copy_from_slice(&value.as_f64().unwrap_or(0.0).to_le_bytes()),
    }
}

fn integer(value: &Value) -> i128 {
    match *value {
        Value::Char(v) | Value::UInt8(v) => v.into(),
        Value::Bool(v) => v.into(),
        Value::Int8(v) => v.into(),
        Value::Int16(v) => v.into(),
        Value::UInt16(v) => v.into(),
        Value::Int32(v) => v.into(),
        Value::UInt32(v) | Value::BitField(v) => v.into(),
        Value::Int64(v) => v.into(),
        Value::UInt64(v) => v.into(),
        Value::Float32(v) => v as i128,
        Value::Float64(v) => v as i128,
        Value::Bytes(_) | Value::Array(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ibt::format::read_header;

    #[test]
    fn layout_places_regions_back_to_back() {
        let builder = CaptureBuilder::new()
            .channel("Gear", ScalarType::Int8, 1, "")
            .channel("RPM", ScalarType::Float32, 1, "revs/min")
            .session_info("WeekendInfo:\n TrackName: spa\n")
            .row(|row| row.value("Gear", Value::Int8(3)).f32("RPM", 7200.0));
        let bytes = builder.build();

        let header = read_header(&bytes).unwrap();
        assert_eq!(header.variable_dict_offset, builder.dictionary_offset());
        assert_eq!(header.session_info_offset, PREAMBLE_SIZE + 2 * IRSDK_VAR_HEADER_SIZE);
        assert_eq!(header.buf_len, 5);
        assert_eq!(header.buffers[0].offset, builder.buffer_offset());
        assert_eq!(bytes.len(), builder.buffer_offset() + 5);

        let row = &bytes[builder.buffer_offset()..];
        assert_eq!(row[0], 3);
        assert_eq!(&row[1..5], &7200.0f32.to_le_bytes());
    }

    #[test]
    fn values_convert_to_declared_type() {
        let mut out = [0u8; 4];
        encode_element(ScalarType::Float32, &Value::Int32(2), &mut out);
        assert_eq!(out, 2.0f32.to_le_bytes());

        encode_element(ScalarType::Int32, &Value::Float64(-7.9), &mut out);
        assert_eq!(out, (-7i32).to_le_bytes());

        let mut flag = [0u8; 1];
        encode_element(ScalarType::Bool, &Value::Int32(5), &mut flag);
        assert_eq!(flag, [1]);
    }

    #[test]
    fn truncation_and_overrides_apply() {
        let builder = CaptureBuilder::new()
            .channel("Lap", ScalarType::Int32, 1, "")
            .buf_len(8)
            .record_count(9)
            .row(|row| row.i32("Lap", 1))
            .truncate(3);
        let bytes = builder.build();
        assert_eq!(builder.stride(), 8);
        assert_eq!(bytes.len(), builder.buffer_offset() + 5);

        let header = read_header(&bytes).unwrap();
        assert_eq!(header.disk.record_count, 9);
    }
}
