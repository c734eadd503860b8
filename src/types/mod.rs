//! Core types for decoded telemetry.
//!
//! ## Architecture
//!
//! The type system maps directly to the capture layout:
//! - [`RawCapture`] holds the immutable capture bytes
//! - [`ChannelDescriptor`] describes one channel's type, count and row offset
//! - [`ChannelDictionary`] is the validated, shared lookup table of descriptors
//! - [`ScalarType`] maps the on-disk type codes with size information
//! - [`Value`] holds one decoded channel value
//! - [`SampleRow`] is one decoded row, values in dictionary order
//! - [`VarData`] converts decoded values into Rust types
//!
//! ## Usage Example
//!
//! ```rust
//! use pitwall_ingest::types::{ChannelDescriptor, ChannelDictionary, ScalarType};
//!
//! let dictionary = ChannelDictionary::new(vec![ChannelDescriptor {
//!     name: "RPM".to_string(),
//!     scalar_type: ScalarType::Float32,
//!     count: 1,
//!     offset: 0,
//!     count_as_time: false,
//!     unit: Some("revs/min".to_string()),
//!     description: "Engine rpm".to_string(),
//! }])
//! .unwrap();
//!
//! assert_eq!(dictionary.row_extent(), 4);
//! assert!(dictionary.contains("RPM"));
//! ```

mod capture;
mod row;
mod schema;
mod var_data;
mod variable_type;

pub use capture::RawCapture;
pub use row::SampleRow;
pub use schema::{ChannelDescriptor, ChannelDictionary};
pub use var_data::{VarData, VarDataError};
pub(crate) use var_data::decode_field;
pub use variable_type::{ScalarType, Value};
