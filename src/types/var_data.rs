//! Typed extraction of decoded channel values

use super::{ScalarType, Value};

/// Trait for Rust types that can be read out of a decoded channel [`Value`].
///
/// Conversions are exact: a channel declared as `Float32` only converts to `f32`
/// (or widens to `f64`), never to an integer.
pub trait VarData: Sized {
    /// Convert a decoded value, returning a type conversion error when incompatible.
    fn from_value(value: &Value) -> crate::Result<Self, VarDataError>;
}

/// Error returned when a channel value cannot be converted to the requested type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Type conversion error: expected {expected}, found {found:?}")]
pub struct VarDataError {
    pub expected: &'static str,
    pub found: Value,
}

impl VarDataError {
    fn new(expected: &'static str, found: &Value) -> Self {
        Self { expected, found: found.clone() }
    }
}

macro_rules! impl_var_data {
    ($ty:ty, $expected:literal, $($variant:ident)|+) => {
        impl VarData for $ty {
            fn from_value(value: &Value) -> crate::Result<Self, VarDataError> {
                match *value {
                    $(Value::$variant(v) => Ok(v.into()),)+
                    _ => Err(VarDataError::new($expected, value)),
                }
            }
        }
    };
}

impl_var_data!(bool, "Bool", Bool);
impl_var_data!(i8, "Int8", Int8);
impl_var_data!(u8, "UInt8 or Char", UInt8 | Char);
impl_var_data!(i16, "Int16", Int16);
impl_var_data!(u16, "UInt16", UInt16);
impl_var_data!(i32, "Int32", Int32);
impl_var_data!(u32, "UInt32 or BitField", UInt32 | BitField);
impl_var_data!(i64, "Int64", Int64);
impl_var_data!(u64, "UInt64", UInt64);
impl_var_data!(f32, "Float32", Float32);
impl_var_data!(f64, "Float64 or Float32", Float64 | Float32);

impl VarData for String {
    fn from_value(value: &Value) -> crate::Result<Self, VarDataError> {
        value.as_text().ok_or_else(|| VarDataError::new("byte array", value))
    }
}

// Array support for VarData
impl<T: VarData> VarData for Vec<T> {
    fn from_value(value: &Value) -> crate::Result<Self, VarDataError> {
        match value {
            Value::Array(items) => items.iter().map(T::from_value).collect(),
            Value::Bytes(bytes) => bytes.iter().map(|&b| T::from_value(&Value::UInt8(b))).collect(),
            scalar => Ok(vec![T::from_value(scalar)?]),
        }
    }
}

/// Decode a channel field from raw row bytes.
///
/// Returns `None` when the field does not fit in `row`.
pub(crate) fn decode_field(
    row: &[u8],
    scalar_type: ScalarType,
    offset: usize,
    count: usize,
) -> Option<Value> {
    let size = scalar_type.size();
    let bytes = row.get(offset..offset.checked_add(size.checked_mul(count)?)?)?;

    if count == 1 {
        return scalar_type.decode_element(bytes);
    }

    if scalar_type == ScalarType::Char {
        return Some(Value::Bytes(bytes.to_vec()));
    }

    bytes
        .chunks_exact(size)
        .map(|element| scalar_type.decode_element(element))
        .collect::<Option<Vec<_>>>()
        .map(Value::Array)
}
