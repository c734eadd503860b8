//! IBT capture format structures and header parsing
//!
//! Defines the binary structures used in iRacing's IBT telemetry captures and the
//! header reader that validates them against the capture bounds.
//!
//! ## IBT File Structure
//!
//! 1. **Main Header** (112 bytes) - `irsdk_header` compatible structure
//! 2. **Disk Sub-Header** (32 bytes) - start date, timing and record counts
//! 3. **Variable Headers** - `num_vars` records of 144 bytes
//! 4. **Session Info** - YAML session configuration (optional)
//! 5. **Sample Buffer** - fixed-stride telemetry rows
//!
//! All integers are little-endian. Every offset/length pair is checked against the
//! capture length before anything downstream slices into it.

use crate::{DecodeError, Result};
use tracing::{debug, trace};

/// Size of the `irsdk_header` structure.
pub const IRSDK_HEADER_SIZE: usize = 112;
/// Size of the `irsdk_diskSubHeader` structure.
pub const IRSDK_DISK_SUBHEADER_SIZE: usize = 32;
/// Header plus disk sub-header; the minimum readable capture.
pub const PREAMBLE_SIZE: usize = IRSDK_HEADER_SIZE + IRSDK_DISK_SUBHEADER_SIZE;
/// Size of one variable dictionary record.
pub const IRSDK_VAR_HEADER_SIZE: usize = 144;
pub const IRSDK_VAR_NAME_SIZE: usize = 32;
pub const IRSDK_VAR_DESC_SIZE: usize = 64;
pub const IRSDK_VAR_UNIT_SIZE: usize = 32;
/// Maximum number of sample buffers in the header table.
pub const IRSDK_MAX_BUFS: usize = 4;

/// The only capture version this decoder understands.
pub const SUPPORTED_VERSION: i32 = 2;

const MAX_VARIABLES: i32 = 10_000;
const MAX_ROW_LENGTH: i32 = 100_000_000;

/// Location of one sample buffer within the capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferInfo {
    /// Tick count when the buffer was last written
    pub tick_count: i32,
    /// Absolute offset of the buffer
    pub offset: usize,
    /// Declared length in bytes; `None` means "to the end of the capture"
    pub length: Option<usize>,
}

/// IBT disk sub-header (`irsdk_diskSubHeader`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskSubHeader {
    /// Session start, unix seconds
    pub start_date: i64,
    /// Session time at the first record, seconds
    pub start_time: f64,
    /// Session time at the last record, seconds
    pub end_time: f64,
    /// Laps completed during the recording
    pub lap_count: i32,
    /// Number of telemetry records written
    pub record_count: i32,
}

/// Validated capture header.
///
/// All offsets here resolve within the capture the header was read from, except the
/// tail of a disk sample buffer whose declared length may overrun a truncated capture.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatHeader {
    pub version: i32,
    pub status: i32,
    /// Samples per second
    pub tick_rate: i32,
    pub session_info_update: i32,
    /// Absolute offset of the session info block
    pub session_info_offset: usize,
    /// Length of the session info block in bytes
    pub session_info_len: usize,
    /// Number of variable dictionary records
    pub variable_count: usize,
    /// Absolute offset of the variable dictionary
    pub variable_dict_offset: usize,
    /// Declared row length in bytes
    pub buf_len: usize,
    /// Sample buffers declared by the header
    pub buffers: Vec<BufferInfo>,
    pub disk: DiskSubHeader,
}

impl FormatHeader {
    /// The buffer holding the most recent samples: highest tick count, lowest index on ties.
    pub fn active_buffer(&self) -> Option<&BufferInfo> {
        self.buffers.iter().reduce(|best, buf| if buf.tick_count > best.tick_count { buf } else { best })
    }

    /// Number of sample buffers declared.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Whether this is a disk capture (single contiguous sample buffer).
    pub fn is_disk_capture(&self) -> bool {
        self.buffers.len() == 1
    }

    /// Byte range of the variable dictionary.
    pub fn variable_dict_range(&self) -> std::ops::Range<usize> {
        let len = self.variable_count * IRSDK_VAR_HEADER_SIZE;
        self.variable_dict_offset..self.variable_dict_offset + len
    }

    /// Byte range of the session info block.
    pub fn session_info_range(&self) -> std::ops::Range<usize> {
        self.session_info_offset..self.session_info_offset + self.session_info_len
    }
}

/// Parse and validate the capture header.
///
/// Pure function of its input: rejects unsupported versions before looking at any
/// other field, then checks every region against the capture bounds.
pub fn read_header(capture: &[u8]) -> Result<FormatHeader> {
    trace!(capture_len = capture.len(), "Reading IBT header ({} bytes)", PREAMBLE_SIZE);

    if capture.len() < PREAMBLE_SIZE {
        return Err(DecodeError::truncated_header(
            "preamble",
            format!("need {} bytes, capture has {}", PREAMBLE_SIZE, capture.len()),
        ));
    }

    // struct irsdk_header {
    //   int ver;                    // offset 0
    //   int status;                 // offset 4
    //   int tickRate;               // offset 8
    //   int sessionInfoUpdate;      // offset 12
    //   int sessionInfoLen;         // offset 16
    //   int sessionInfoOffset;      // offset 20
    //   int numVars;                // offset 24
    //   int varHeaderOffset;        // offset 28
    //   int numBuf;                 // offset 32
    //   int bufLen;                 // offset 36
    //   int pad1[2];                // offset 40
    //   irsdk_varBuf varBuf[4];     // offset 48, 16 bytes each
    // }
    let version = parse_i32_le(capture, 0)?;
    if version != SUPPORTED_VERSION {
        return Err(DecodeError::UnsupportedVersion { found: version, supported: SUPPORTED_VERSION });
    }

    let status = parse_i32_le(capture, 4)?;
    let tick_rate = parse_i32_le(capture, 8)?;
    let session_info_update = parse_i32_le(capture, 12)?;
    let session_info_len = parse_i32_le(capture, 16)?;
    let session_info_offset = parse_i32_le(capture, 20)?;
    let num_vars = parse_i32_le(capture, 24)?;
    let var_header_offset = parse_i32_le(capture, 28)?;
    let num_buf = parse_i32_le(capture, 32)?;
    let buf_len = parse_i32_le(capture, 36)?;

    debug!(version, tick_rate, num_vars, num_buf, buf_len, "Parsed IBT header");

    if tick_rate <= 0 {
        return Err(DecodeError::truncated_header(
            "tick rate",
            format!("tick rate must be positive, found {}", tick_rate),
        ));
    }
    let variable_count = non_negative("variable dictionary", "variable count", num_vars)?;
    if num_vars > MAX_VARIABLES {
        return Err(DecodeError::truncated_header(
            "variable dictionary",
            format!("variable count {} is unreasonably large", num_vars),
        ));
    }
    let variable_dict_offset =
        non_negative("variable dictionary", "variable header offset", var_header_offset)?;
    let session_info_len = non_negative("session info", "session info length", session_info_len)?;
    let session_info_offset =
        non_negative("session info", "session info offset", session_info_offset)?;
    let buf_len = non_negative("sample buffer", "buffer length", buf_len)?;
    if buf_len > MAX_ROW_LENGTH as usize {
        return Err(DecodeError::truncated_header(
            "sample buffer",
            format!("buffer length {} is unreasonably large", buf_len),
        ));
    }
    let buffer_count = non_negative("sample buffer", "buffer count", num_buf)? as usize;
    if buffer_count > IRSDK_MAX_BUFS {
        return Err(DecodeError::truncated_header(
            "sample buffer",
            format!("expected at most {} buffers, found {}", IRSDK_MAX_BUFS, buffer_count),
        ));
    }

    let disk = read_disk_sub_header(capture)?;

    // Variable dictionary must be fully present
    let dict_len = variable_count
        .checked_mul(IRSDK_VAR_HEADER_SIZE)
        .ok_or_else(|| DecodeError::truncated_header("variable dictionary", "size overflows"))?;
    check_region(capture, "variable dictionary", variable_dict_offset, dict_len)?;

    // Session info is optional; when present it must be fully present
    if session_info_len > 0 {
        check_region(capture, "session info", session_info_offset, session_info_len)?;
    }

    let mut buffers = Vec::with_capacity(buffer_count);
    for i in 0..buffer_count {
        let base = 48 + i * 16;
        let tick_count = parse_i32_le(capture, base)?;
        let offset = non_negative("sample buffer", "buffer offset", parse_i32_le(capture, base + 4)?)?;

        let length = if buffer_count == 1 {
            // Disk capture: rows run from the buffer offset for record_count rows. Only the
            // start must exist here; a short tail is reported by the row decoder.
            if offset > capture.len() {
                return Err(DecodeError::truncated_header(
                    "sample buffer",
                    format!("buffer starts at {} past capture end {}", offset, capture.len()),
                ));
            }
            match usize::try_from(disk.record_count) {
                Ok(records) if records > 0 => records.checked_mul(buf_len),
                _ => None,
            }
        } else {
            // Memory snapshot: each buffer holds exactly one row
            check_region(capture, "sample buffer", offset, buf_len)?;
            Some(buf_len)
        };

        trace!(index = i, tick_count, offset, ?length, "Sample buffer");
        buffers.push(BufferInfo { tick_count, offset, length });
    }

    Ok(FormatHeader {
        version,
        status,
        tick_rate,
        session_info_update,
        session_info_offset,
        session_info_len,
        variable_count,
        variable_dict_offset,
        buf_len,
        buffers,
        disk,
    })
}

fn read_disk_sub_header(capture: &[u8]) -> Result<DiskSubHeader> {
    let base = IRSDK_HEADER_SIZE;
    Ok(DiskSubHeader {
        start_date: parse_i64_le(capture, base)?,
        start_time: parse_f64_le(capture, base + 8)?,
        end_time: parse_f64_le(capture, base + 16)?,
        lap_count: parse_i32_le(capture, base + 24)?,
        record_count: parse_i32_le(capture, base + 28)?,
    })
}

fn non_negative(region: &'static str, field: &str, value: i32) -> Result<usize> {
    usize::try_from(value).map_err(|_| {
        DecodeError::truncated_header(region, format!("{} cannot be negative ({})", field, value))
    })
}

fn check_region(capture: &[u8], region: &'static str, offset: usize, len: usize) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= capture.len() => Ok(()),
        _ => Err(DecodeError::truncated_header(
            region,
            format!(
                "offset={}, len={} extends beyond capture size {}",
                offset,
                len,
                capture.len()
            ),
        )),
    }
}

/// Safe byte parsing helpers with bounds checking
pub(crate) fn parse_i32_le(data: &[u8], offset: usize) -> Result<i32> {
    fixed::<4>(data, offset).map(i32::from_le_bytes)
}

fn parse_i64_le(data: &[u8], offset: usize) -> Result<i64> {
    fixed::<8>(data, offset).map(i64::from_le_bytes)
}

fn parse_f64_le(data: &[u8], offset: usize) -> Result<f64> {
    fixed::<8>(data, offset).map(f64::from_le_bytes)
}

fn fixed<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N]> {
    offset
        .checked_add(N)
        .and_then(|end| data.get(offset..end))
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| {
            DecodeError::truncated_header(
                "preamble",
                format!("insufficient data for {} bytes at offset {}", N, offset),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ibt::CaptureBuilder;
    use crate::types::ScalarType;
    use anyhow::Result;

    fn sample_capture() -> Vec<u8> {
        CaptureBuilder::new()
            .tick_rate(60)
            .channel("SessionTime", ScalarType::Float64, 1, "s")
            .channel("Lap", ScalarType::Int32, 1, "")
            .session_info("WeekendInfo:\n TrackName: roadatlanta\n")
            .row(|row| row.f64("SessionTime", 0.0).i32("Lap", 1))
            .row(|row| row.f64("SessionTime", 1.0 / 60.0).i32("Lap", 1))
            .build()
    }

    #[test]
    fn parses_valid_header() -> Result<()> {
        let capture = sample_capture();
        let header = read_header(&capture)?;

        assert_eq!(header.version, 2);
        assert_eq!(header.tick_rate, 60);
        assert_eq!(header.variable_count, 2);
        assert_eq!(header.variable_dict_offset, PREAMBLE_SIZE);
        assert_eq!(header.buf_len, 12);
        assert_eq!(header.buffer_count(), 1);
        assert!(header.is_disk_capture());
        assert_eq!(header.disk.record_count, 2);

        let buffer = header.active_buffer().expect("disk buffer");
        assert_eq!(buffer.length, Some(24));
        assert_eq!(buffer.offset + 24, capture.len());
        Ok(())
    }

    #[test]
    fn short_preamble_is_truncated_header() {
        let result = read_header(&[0u8; 10]);
        match result.unwrap_err() {
            DecodeError::TruncatedHeader { region, .. } => assert_eq!(region, "preamble"),
            other => panic!("Expected TruncatedHeader, got {:?}", other),
        }
    }

    #[test]
    fn unknown_version_is_rejected_explicitly() {
        let mut capture = sample_capture();
        capture[0..4].copy_from_slice(&3i32.to_le_bytes());

        match read_header(&capture).unwrap_err() {
            DecodeError::UnsupportedVersion { found, supported } => {
                assert_eq!(found, 3);
                assert_eq!(supported, SUPPORTED_VERSION);
            }
            other => panic!("Expected UnsupportedVersion, got {:?}", other),
        }
    }

    #[test]
    fn version_is_checked_before_bounds() {
        // A future version with an otherwise garbage header must still report the version
        let mut capture = vec![0xFFu8; PREAMBLE_SIZE];
        capture[0..4].copy_from_slice(&7i32.to_le_bytes());
        assert!(matches!(read_header(&capture), Err(DecodeError::UnsupportedVersion { .. })));
    }

    #[test]
    fn dictionary_past_capture_end_is_truncated_header() {
        let mut capture = sample_capture();
        capture[24..28].copy_from_slice(&5000i32.to_le_bytes());

        match read_header(&capture).unwrap_err() {
            DecodeError::TruncatedHeader { region, .. } => {
                assert_eq!(region, "variable dictionary")
            }
            other => panic!("Expected TruncatedHeader, got {:?}", other),
        }
    }

    #[test]
    fn session_info_past_capture_end_is_truncated_header() {
        let mut capture = sample_capture();
        let len = capture.len() as i32;
        capture[16..20].copy_from_slice(&len.to_le_bytes());

        match read_header(&capture).unwrap_err() {
            DecodeError::TruncatedHeader { region, .. } => assert_eq!(region, "session info"),
            other => panic!("Expected TruncatedHeader, got {:?}", other),
        }
    }

    #[test]
    fn negative_fields_are_rejected() {
        let mut capture = sample_capture();
        capture[28..32].copy_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(read_header(&capture), Err(DecodeError::TruncatedHeader { .. })));

        let mut capture = sample_capture();
        capture[8..12].copy_from_slice(&0i32.to_le_bytes());
        assert!(matches!(read_header(&capture), Err(DecodeError::TruncatedHeader { .. })));
    }

    #[test]
    fn too_many_buffers_is_rejected() {
        let mut capture = sample_capture();
        capture[32..36].copy_from_slice(&5i32.to_le_bytes());
        assert!(matches!(read_header(&capture), Err(DecodeError::TruncatedHeader { .. })));
    }

    #[test]
    fn disk_buffer_overrun_is_left_to_row_decoder() -> Result<()> {
        let mut capture = sample_capture();
        capture.truncate(capture.len() - 5);
        let header = read_header(&capture)?;
        assert_eq!(header.active_buffer().and_then(|b| b.length), Some(24));
        Ok(())
    }

    #[test]
    fn zero_record_count_means_open_ended_buffer() -> Result<()> {
        let mut capture = sample_capture();
        let base = IRSDK_HEADER_SIZE + 28;
        capture[base..base + 4].copy_from_slice(&0i32.to_le_bytes());
        let header = read_header(&capture)?;
        assert_eq!(header.active_buffer().and_then(|b| b.length), None);
        Ok(())
    }

    fn snapshot_capture() -> CaptureBuilder {
        CaptureBuilder::new()
            .channel("Speed", ScalarType::Float32, 1, "m/s")
            .row(|row| row.f32("Speed", 1.0))
            .row(|row| row.f32("Speed", 2.0))
            .snapshot_buffers(&[3, 8])
    }

    #[test]
    fn snapshot_buffers_hold_one_row_each() -> Result<()> {
        let builder = snapshot_capture();
        let header = read_header(&builder.build())?;

        assert_eq!(header.buffer_count(), 2);
        assert!(!header.is_disk_capture());
        let offsets: Vec<(i32, usize, Option<usize>)> =
            header.buffers.iter().map(|b| (b.tick_count, b.offset, b.length)).collect();
        let base = builder.buffer_offset();
        assert_eq!(offsets, vec![(3, base, Some(4)), (8, base + 4, Some(4))]);
        assert_eq!(header.active_buffer().map(|b| b.tick_count), Some(8));
        Ok(())
    }

    #[test]
    fn snapshot_buffer_past_capture_end_is_truncated_header() {
        let bytes = snapshot_capture().truncate(2).build();

        match read_header(&bytes).unwrap_err() {
            DecodeError::TruncatedHeader { region, .. } => assert_eq!(region, "sample buffer"),
            other => panic!("Expected TruncatedHeader, got {:?}", other),
        }
    }

    #[test]
    fn active_buffer_prefers_latest_tick() {
        let header = FormatHeader {
            version: 2,
            status: 1,
            tick_rate: 60,
            session_info_update: 0,
            session_info_offset: 0,
            session_info_len: 0,
            variable_count: 0,
            variable_dict_offset: 0,
            buf_len: 4,
            buffers: vec![
                BufferInfo { tick_count: 10, offset: 200, length: Some(4) },
                BufferInfo { tick_count: 12, offset: 204, length: Some(4) },
                BufferInfo { tick_count: 12, offset: 208, length: Some(4) },
                BufferInfo { tick_count: 11, offset: 212, length: Some(4) },
            ],
            disk: DiskSubHeader {
                start_date: 0,
                start_time: 0.0,
                end_time: 0.0,
                lap_count: 0,
                record_count: 0,
            },
        };
        assert_eq!(header.active_buffer().map(|b| b.offset), Some(204));
    }
}
