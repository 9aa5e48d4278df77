//! Core traits for backend destinations and record sinks
//!
//! This module defines the two seams of the write path:
//! - `KeyValueStore`: one backend destination (memcached in production)
//! - `RecordSink`: what the dispatcher hands an encoded record to, so live
//!   and simulated runs differ only in which sink is plugged in

use crate::types::LoaderError;
use async_trait::async_trait;

/// A write-capable backend destination
///
/// One instance is bound per device type at startup and shared read-only by
/// every concurrent writer.
#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Store `value` under `key`
    ///
    /// # Returns
    ///
    /// * `Ok(true)` if the backend stored the value
    /// * `Ok(false)` if the backend refused it
    /// * `Err(LoaderError)` on transport or protocol failure
    async fn put(&self, key: &str, value: &[u8]) -> Result<bool, LoaderError>;
}

/// Destination of encoded records
///
/// Implementations never propagate backend errors: every failure is logged
/// and reported as `Ok(false)`. An `Err` means an internal contract was
/// broken (e.g. a category without a destination).
#[async_trait]
pub trait RecordSink: Send + Sync + std::fmt::Debug {
    /// Store one encoded record
    async fn store(
        &self,
        category: &str,
        key: &str,
        payload: Vec<u8>,
    ) -> Result<bool, LoaderError>;
}
