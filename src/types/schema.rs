//! Channel descriptor and dictionary types

use serde::Serialize;
use std::collections::HashMap;

use super::ScalarType;

/// Layout and metadata of one channel within a sample row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelDescriptor {
    /// Channel name, unique within a capture
    pub name: String,
    /// Element type
    pub scalar_type: ScalarType,
    /// Number of elements packed in the field (1 for scalars)
    pub count: usize,
    /// Byte offset within a sample row
    pub offset: usize,
    /// Whether the simulator treats the element count as elapsed time
    pub count_as_time: bool,
    /// Units of measurement (e.g. "m/s", "%")
    pub unit: Option<String>,
    /// Human-readable description
    pub description: String,
}

impl ChannelDescriptor {
    /// Total width of the field in bytes.
    pub fn width(&self) -> usize {
        self.scalar_type.size() * self.count
    }

    /// Exclusive end offset of the field within a row.
    pub fn end(&self) -> usize {
        self.offset + self.width()
    }

    /// Whether this channel is the byte-array scalar type.
    pub fn is_byte_array(&self) -> bool {
        self.scalar_type == ScalarType::Char && self.count > 1
    }

    /// Whether values of this channel are single numeric scalars.
    pub fn is_scalar(&self) -> bool {
        self.count == 1
    }
}

/// Validated, immutable channel lookup table built once per capture.
///
/// Descriptors keep dictionary order; name lookups are O(1). Construction goes through
/// [`crate::schema::read_variables`] or [`ChannelDictionary::new`], both of which enforce
/// name uniqueness and non-overlapping byte ranges.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChannelDictionary {
    descriptors: Vec<ChannelDescriptor>,
    index: HashMap<String, usize>,
    row_extent: usize,
}

impl ChannelDictionary {
    /// Build a dictionary from descriptors, validating uniqueness and overlap.
    pub fn new(descriptors: Vec<ChannelDescriptor>) -> crate::Result<Self> {
        let mut index = HashMap::with_capacity(descriptors.len());
        for (i, descriptor) in descriptors.iter().enumerate() {
            if index.insert(descriptor.name.clone(), i).is_some() {
                return Err(crate::DecodeError::DuplicateChannel { name: descriptor.name.clone() });
            }
        }

        let mut by_offset: Vec<&ChannelDescriptor> = descriptors.iter().collect();
        by_offset.sort_by_key(|d| (d.offset, d.end()));
        for pair in by_offset.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if b.offset < a.end() {
                return Err(crate::DecodeError::OverlappingChannel {
                    first: a.name.clone(),
                    second: b.name.clone(),
                    offset: b.offset,
                });
            }
        }

        let row_extent = descriptors.iter().map(ChannelDescriptor::end).max().unwrap_or(0);
        Ok(Self { descriptors, index, row_extent })
    }

    /// Get a descriptor by name.
    pub fn get(&self, name: &str) -> Option<&ChannelDescriptor> {
        self.index.get(name).map(|&i| &self.descriptors[i])
    }

    /// Position of a channel in dictionary order.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Descriptors in dictionary order.
    pub fn descriptors(&self) -> &[ChannelDescriptor] {
        &self.descriptors
    }

    /// Channel names in dictionary order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|d| d.name.as_str())
    }

    /// Maximum `offset + width` over all descriptors.
    pub fn row_extent(&self) -> usize {
        self.row_extent
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
