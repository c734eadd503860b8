//! IBT capture reading and writing
//!
//! - [`format`]: header layout constants and the header reader
//! - [`rows`]: the lazy sample row decoder
//! - [`reader`]: [`IbtReader`], an in-memory capture with validated schema
//! - [`writer`]: [`CaptureBuilder`], a synthetic capture encoder

pub mod format;
pub mod reader;
pub mod rows;
pub mod writer;

pub use format::{FormatHeader, read_header};
pub use reader::IbtReader;
pub use rows::{RowDecoder, decode_rows};
pub use writer::{CaptureBuilder, RowWriter};
