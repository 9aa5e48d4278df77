//! I/O module
//!
//! Handles input files and the stored payload format.
//!
//! # Components
//!
//! - `row_format` - Row validation (`RecordParser`)
//! - `file_reader` - Plain/gzip row reader with iterator interface
//! - `user_apps` - Protobuf payload encoding and decoding

pub mod file_reader;
pub mod row_format;
pub mod user_apps;

pub use file_reader::{RawRow, RowReader};
pub use row_format::RecordParser;
pub use user_apps::{decode_user_apps, encode_user_apps, UserApps};
