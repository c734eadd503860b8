//! Variable dictionary decoding
//!
//! Each dictionary record follows the `irsdk_varHeader` layout:
//! ```c
//! typedef struct irsdk_varHeader
//! {
//!     int type;                           // irsdk_VarType enum value
//!     int offset;                         // offset in bytes from row start
//!     int count;                          // number of elements (1 for scalar)
//!     bool countAsTime;
//!     char pad[3];
//!     char name[IRSDK_MAX_STRING];        // variable name (32 bytes)
//!     char desc[IRSDK_MAX_DESC];          // description (64 bytes)
//!     char unit[IRSDK_MAX_STRING];        // units (32 bytes)
//! } irsdk_varHeader;
//! ```
//!
//! Records are decoded into [`ChannelDescriptor`]s and validated as a whole by
//! [`ChannelDictionary::new`], which rejects duplicate names and overlapping byte
//! ranges. Any malformed record is fatal for the capture: row decoding against an
//! ambiguous layout would silently produce wrong values.

use crate::ibt::format::{
    FormatHeader, IRSDK_VAR_DESC_SIZE, IRSDK_VAR_HEADER_SIZE, IRSDK_VAR_NAME_SIZE,
    IRSDK_VAR_UNIT_SIZE, parse_i32_le,
};
use crate::types::{ChannelDescriptor, ChannelDictionary, ScalarType};
use crate::{DecodeError, Result};
use tracing::{debug, trace};

const NAME_OFFSET: usize = 16;
const DESC_OFFSET: usize = 48;
const UNIT_OFFSET: usize = 112;

/// One undecoded dictionary record.
#[derive(Debug, Clone)]
struct RawVarHeader<'a> {
    var_type: i32,
    offset: i32,
    count: i32,
    count_as_time: u8,
    name: &'a [u8],
    desc: &'a [u8],
    unit: &'a [u8],
}

impl<'a> RawVarHeader<'a> {
    fn parse(record: &'a [u8]) -> Result<Self> {
        if record.len() < IRSDK_VAR_HEADER_SIZE {
            return Err(DecodeError::truncated_header(
                "variable dictionary",
                format!("record is {} bytes, expected {}", record.len(), IRSDK_VAR_HEADER_SIZE),
            ));
        }

        Ok(Self {
            var_type: parse_i32_le(record, 0)?,
            offset: parse_i32_le(record, 4)?,
            count: parse_i32_le(record, 8)?,
            count_as_time: record[12],
            name: &record[NAME_OFFSET..NAME_OFFSET + IRSDK_VAR_NAME_SIZE],
            desc: &record[DESC_OFFSET..DESC_OFFSET + IRSDK_VAR_DESC_SIZE],
            unit: &record[UNIT_OFFSET..UNIT_OFFSET + IRSDK_VAR_UNIT_SIZE],
        })
    }

    fn into_descriptor(self, index: usize) -> Result<ChannelDescriptor> {
        let name = channel_name(self.name)
            .ok_or_else(|| DecodeError::InvalidChannelName { index, raw: until_nul(self.name).to_vec() })?;

        let scalar_type = ScalarType::from_code(self.var_type).ok_or_else(|| {
            DecodeError::invalid_descriptor(index, &name, format!("unknown type code {}", self.var_type))
        })?;

        let count = usize::try_from(self.count)
            .ok()
            .filter(|&count| count >= 1)
            .ok_or_else(|| {
                DecodeError::invalid_descriptor(index, &name, format!("element count {}", self.count))
            })?;

        let offset = usize::try_from(self.offset).map_err(|_| {
            DecodeError::invalid_descriptor(index, &name, format!("negative row offset {}", self.offset))
        })?;

        let unit = c_string_to_string(self.unit);

        Ok(ChannelDescriptor {
            name,
            scalar_type,
            count,
            offset,
            count_as_time: self.count_as_time != 0,
            unit: (!unit.is_empty()).then_some(unit),
            description: c_string_to_string(self.desc),
        })
    }
}

fn until_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    &bytes[..end]
}

/// Convert C string bytes to a Rust `String`, replacing invalid sequences.
fn c_string_to_string(bytes: &[u8]) -> String {
    String::from_utf8_lossy(until_nul(bytes)).trim_end().to_string()
}

/// Decode a channel name: NUL-terminated, trailing spaces trimmed, printable ASCII only.
fn channel_name(bytes: &[u8]) -> Option<String> {
    let raw = until_nul(bytes);
    let end = raw.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
    let name = &raw[..end];

    if name.is_empty() || !name.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
        return None;
    }
    // Only ASCII bytes remain, so this conversion cannot fail
    std::str::from_utf8(name).ok().map(str::to_string)
}

/// Read and validate the variable dictionary described by `header`.
pub fn read_variables(capture: &[u8], header: &FormatHeader) -> Result<ChannelDictionary> {
    debug!(
        count = header.variable_count,
        offset = header.variable_dict_offset,
        "Reading variable dictionary"
    );

    let region = capture.get(header.variable_dict_range()).ok_or_else(|| {
        DecodeError::truncated_header("variable dictionary", "dictionary extends beyond capture")
    })?;

    let descriptors = region
        .chunks_exact(IRSDK_VAR_HEADER_SIZE)
        .enumerate()
        .map(|(index, record)| {
            let descriptor = RawVarHeader::parse(record)?.into_descriptor(index)?;
            trace!(
                index,
                name = %descriptor.name,
                scalar_type = ?descriptor.scalar_type,
                offset = descriptor.offset,
                count = descriptor.count,
                "Channel descriptor"
            );
            Ok(descriptor)
        })
        .collect::<Result<Vec<_>>>()?;

    let dictionary = ChannelDictionary::new(descriptors)?;
    debug!(
        channels = dictionary.len(),
        row_extent = dictionary.row_extent(),
        "Variable dictionary validated"
    );
    Ok(dictionary)
}
