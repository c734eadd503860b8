//! Capture schema decoding
//!
//! The capture is self-describing: a variable dictionary lays out every channel in
//! a sample row, and a session info block describes the session that was recorded.
//!
//! # Architecture
//!
//! - [`read_variables`] decodes the dictionary into a validated [`ChannelDictionary`],
//!   built once and shared read-only by the row decoder and lap segmenter
//! - [`read_session_info`] decodes the session YAML into [`SessionMetadata`]
//!
//! [`ChannelDictionary`]: crate::types::ChannelDictionary

pub mod session_info;
pub mod variables;

pub use session_info::{SessionMetadata, UNKNOWN, read_session_info};
pub use variables::read_variables;
