//! Ingestion pipeline
//!
//! - `config` - Run configuration and component wiring
//! - `ingest` - Per-file ingestion controller
//! - `batch` - Sequential driver over all matching files

pub mod batch;
pub mod config;
pub mod ingest;

pub use batch::{find_input_files, BatchDriver, RunOutcome};
pub use config::LoaderConfig;
pub use ingest::{mark_processed, processed_path, FileIngestor};
