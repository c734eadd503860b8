//! Channel scalar type definitions

use serde::{Deserialize, Serialize};

/// Scalar types a channel can declare.
///
/// Codes 0-5 follow the simulator's `irsdk_VarType` enum; codes 6-12 extend it with
/// the remaining fixed widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    /// 8-bit character; a `Char` channel with count > 1 is a byte array
    Char,
    /// Boolean, any non-zero byte is `true`
    Bool,
    /// 8-bit signed integer
    Int8,
    /// 8-bit unsigned integer
    UInt8,
    /// 16-bit signed integer
    Int16,
    /// 16-bit unsigned integer
    UInt16,
    /// 32-bit signed integer (irsdk_int)
    Int32,
    /// 32-bit unsigned integer
    UInt32,
    /// 64-bit signed integer
    Int64,
    /// 64-bit unsigned integer
    UInt64,
    /// 32-bit floating point (irsdk_float)
    Float32,
    /// 64-bit floating point (irsdk_double)
    Float64,
    /// 32-bit bitfield (irsdk_bitField)
    BitField,
}

impl ScalarType {
    /// Returns the size in bytes of one element of this type.
    pub const fn size(&self) -> usize {
        match self {
            ScalarType::Char | ScalarType::Bool | ScalarType::Int8 | ScalarType::UInt8 => 1,
            ScalarType::Int16 | ScalarType::UInt16 => 2,
            ScalarType::Int32 | ScalarType::UInt32 | ScalarType::Float32 | ScalarType::BitField => {
                4
            }
            ScalarType::Int64 | ScalarType::UInt64 | ScalarType::Float64 => 8,
        }
    }

    /// Map an on-disk type code to a scalar type.
    pub const fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => ScalarType::Char,
            1 => ScalarType::Bool,
            2 => ScalarType::Int32,
            3 => ScalarType::BitField,
            4 => ScalarType::Float32,
            5 => ScalarType::Float64,
            6 => ScalarType::Int8,
            7 => ScalarType::UInt8,
            8 => ScalarType::Int16,
            9 => ScalarType::UInt16,
            10 => ScalarType::UInt32,
            11 => ScalarType::Int64,
            12 => ScalarType::UInt64,
            _ => return None,
        })
    }

    /// On-disk type code of this scalar type.
    pub const fn code(&self) -> i32 {
        match self {
            ScalarType::Char => 0,
            ScalarType::Bool => 1,
            ScalarType::Int32 => 2,
            ScalarType::BitField => 3,
            ScalarType::Float32 => 4,
            ScalarType::Float64 => 5,
            ScalarType::Int8 => 6,
            ScalarType::UInt8 => 7,
            ScalarType::Int16 => 8,
            ScalarType::UInt16 => 9,
            ScalarType::UInt32 => 10,
            ScalarType::Int64 => 11,
            ScalarType::UInt64 => 12,
        }
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, ScalarType::Float32 | ScalarType::Float64)
    }

    /// Decode one little-endian element from `bytes`, which must be exactly `size()` long.
    pub(crate) fn decode_element(&self, bytes: &[u8]) -> Option<Value> {
        Some(match self {
            ScalarType::Char => Value::Char(*bytes.first()?),
            ScalarType::Bool => Value::Bool(*bytes.first()? != 0),
            ScalarType::Int8 => Value::Int8(i8::from_le_bytes(bytes.try_into().ok()?)),
            ScalarType::UInt8 => Value::UInt8(*bytes.first()?),
            ScalarType::Int16 => Value::Int16(i16::from_le_bytes(bytes.try_into().ok()?)),
            ScalarType::UInt16 => Value::UInt16(u16::from_le_bytes(bytes.try_into().ok()?)),
            ScalarType::Int32 => Value::Int32(i32::from_le_bytes(bytes.try_into().ok()?)),
            ScalarType::UInt32 => Value::UInt32(u32::from_le_bytes(bytes.try_into().ok()?)),
            ScalarType::Int64 => Value::Int64(i64::from_le_bytes(bytes.try_into().ok()?)),
            ScalarType::UInt64 => Value::UInt64(u64::from_le_bytes(bytes.try_into().ok()?)),
            ScalarType::Float32 => Value::Float32(f32::from_le_bytes(bytes.try_into().ok()?)),
            ScalarType::Float64 => Value::Float64(f64::from_le_bytes(bytes.try_into().ok()?)),
            ScalarType::BitField => Value::BitField(u32::from_le_bytes(bytes.try_into().ok()?)),
        })
    }
}

/// Runtime value decoded from one channel of a sample row.
///
/// Serializes untagged so per-lap documents carry plain JSON numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Char(u8),
    Bool(bool),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    BitField(u32),
    /// Char channel with count > 1
    Bytes(Vec<u8>),
    /// Any other channel with count > 1
    Array(Vec<Value>),
}

impl Value {
    /// Numeric view of a scalar value; `None` for arrays and byte strings.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Char(v) | Value::UInt8(v) => Some(v as f64),
            Value::Bool(v) => Some(if v { 1.0 } else { 0.0 }),
            Value::Int8(v) => Some(v as f64),
            Value::Int16(v) => Some(v as f64),
            Value::UInt16(v) => Some(v as f64),
            Value::Int32(v) => Some(v as f64),
            Value::UInt32(v) | Value::BitField(v) => Some(v as f64),
            Value::Int64(v) => Some(v as f64),
            Value::UInt64(v) => Some(v as f64),
            Value::Float32(v) => Some(v as f64),
            Value::Float64(v) => Some(v),
            Value::Bytes(_) | Value::Array(_) => None,
        }
    }

    /// Text view of a byte-array value, trimmed at the first NUL.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Bytes(bytes) => {
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                Some(String::from_utf8_lossy(&bytes[..end]).into_owned())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_codes_round_trip() {
        for code in 0..=12 {
            let ty = ScalarType::from_code(code).expect("known code");
            assert_eq!(ty.code(), code);
        }
        assert_eq!(ScalarType::from_code(13), None);
        assert_eq!(ScalarType::from_code(-1), None);
    }

    #[test]
    fn element_sizes_match_wire_widths() {
        assert_eq!(ScalarType::Char.size(), 1);
        assert_eq!(ScalarType::Bool.size(), 1);
        assert_eq!(ScalarType::Int16.size(), 2);
        assert_eq!(ScalarType::BitField.size(), 4);
        assert_eq!(ScalarType::Float32.size(), 4);
        assert_eq!(ScalarType::UInt64.size(), 8);
        assert_eq!(ScalarType::Float64.size(), 8);
    }

    #[test]
    fn decode_element_is_little_endian() {
        assert_eq!(
            ScalarType::Float32.decode_element(&4500.0f32.to_le_bytes()),
            Some(Value::Float32(4500.0))
        );
        assert_eq!(ScalarType::Int16.decode_element(&[0xFE, 0xFF]), Some(Value::Int16(-2)));
        assert_eq!(ScalarType::Bool.decode_element(&[0x40]), Some(Value::Bool(true)));
        assert_eq!(ScalarType::Bool.decode_element(&[0x00]), Some(Value::Bool(false)));
        assert_eq!(ScalarType::Int32.decode_element(&[0x01, 0x02]), None);
    }

    #[test]
    fn numeric_view_covers_scalars_only() {
        assert_eq!(Value::Int32(3).as_f64(), Some(3.0));
        assert_eq!(Value::Bool(true).as_f64(), Some(1.0));
        assert_eq!(Value::BitField(0x10).as_f64(), Some(16.0));
        assert_eq!(Value::Bytes(vec![1, 2]).as_f64(), None);
        assert_eq!(Value::Array(vec![Value::Int8(1)]).as_f64(), None);
    }

    #[test]
    fn byte_arrays_render_as_text() {
        let value = Value::Bytes(b"PIT\0\0".to_vec());
        assert_eq!(value.as_text().as_deref(), Some("PIT"));
        assert_eq!(Value::Int8(1).as_text(), None);
    }
}
