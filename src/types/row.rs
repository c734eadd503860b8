//! Decoded sample rows

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::Arc;

use super::{ChannelDictionary, Value, VarData, VarDataError};

/// One time-indexed snapshot of every channel, decoded from a fixed-stride slice.
///
/// Values are stored in dictionary order; name lookups go through the shared
/// [`ChannelDictionary`] so no per-row map is built.
#[derive(Debug, Clone)]
pub struct SampleRow {
    index: usize,
    values: Vec<Value>,
    dictionary: Arc<ChannelDictionary>,
}

impl SampleRow {
    pub(crate) fn new(index: usize, values: Vec<Value>, dictionary: Arc<ChannelDictionary>) -> Self {
        debug_assert_eq!(values.len(), dictionary.len());
        Self { index, values, dictionary }
    }

    /// 0-based position of this row in the sample stream.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Value of a channel by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.dictionary.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Value at a dictionary position.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Typed lookup by channel name.
    pub fn get_as<T: VarData>(&self, name: &str) -> Option<Result<T, VarDataError>> {
        self.get(name).map(T::from_value)
    }

    /// Numeric view of a scalar channel.
    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    /// `(name, value)` pairs in dictionary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.dictionary.names().zip(self.values.iter())
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn dictionary(&self) -> &Arc<ChannelDictionary> {
        &self.dictionary
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PartialEq for SampleRow {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.values == other.values
            && (Arc::ptr_eq(&self.dictionary, &other.dictionary)
                || self.dictionary == other.dictionary)
    }
}

impl Serialize for SampleRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
