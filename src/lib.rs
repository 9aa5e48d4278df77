//! Appsinstalled Loader Library
//! # Overview
//!
//! This library loads tab-separated logs of mobile device installed
//! applications into memcached, one server per device identifier type.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (DeviceRecord, IngestionResult, errors)
//! - [`cli`] - CLI arguments parsing
//! - [`io`] - Input files and payload format:
//!   - [`io::row_format`] - Row validation
//!   - [`io::file_reader`] - Plain and gzip row streaming
//!   - [`io::user_apps`] - Protobuf `UserApps` payload
//! - [`core`] - Write path:
//!   - [`core::router`] - Device type to destination mapping
//!   - [`core::dispatcher`] - Bounded concurrent writes
//!   - [`core::sinks`] - Live and dry-run sinks
//!   - [`core::memcache`] - Memcached destination
//! - [`pipeline`] - Per-file ingestion and the batch driver
//!
//! # Data Flow
//!
//! ```text
//! BatchDriver -> FileIngestor -> RecordParser -> WriteDispatcher -> RecordSink
//!                                                                   └── DestinationRouter -> KeyValueStore
//! ```
//!
//! # Input Format
//!
//! Each row has five tab-separated columns:
//!
//! - `dev_type`: device identifier type (idfa, gaid, adid, dvid)
//! - `dev_id`: device identifier
//! - `lat`, `lon`: coordinates
//! - `apps`: comma-separated application ids (may be empty)
//!
//! Records are stored under `<dev_type>:<dev_id>`.

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod pipeline;
pub mod types;

pub use self::core::{DestinationRouter, KeyValueStore, RecordSink, WriteDispatcher};
pub use io::{decode_user_apps, encode_user_apps, RecordParser, UserApps};
pub use pipeline::{BatchDriver, FileIngestor, LoaderConfig};
pub use types::{
    BatchSummary, DeviceRecord, FileOutcome, IngestionResult, LoaderError, RowRejection,
};
