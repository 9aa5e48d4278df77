//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `record`: The validated device record and its storage key
//! - `ingestion`: Per-file tallies and outcomes
//! - `error`: Error types for the loader

pub mod error;
pub mod ingestion;
pub mod record;

pub use error::{LoaderError, RowRejection};
pub use ingestion::{BatchSummary, FileOutcome, IngestionResult};
pub use record::{AppId, DeviceRecord, KEY_SEPARATOR};
