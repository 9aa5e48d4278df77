//! Live and simulated record sinks
//!
//! - `LiveSink` routes each record to its device type's destination and
//!   turns every backend failure into a logged `false`
//! - `SimulatedSink` never touches a destination and always succeeds; it is
//!   used for validation (`--dry`) runs

use super::router::DestinationRouter;
use super::traits::RecordSink;
use crate::io::user_apps::decode_user_apps;
use crate::types::LoaderError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Sink that writes to the configured backend destinations
#[derive(Debug, Clone)]
pub struct LiveSink {
    router: Arc<DestinationRouter>,
}

impl LiveSink {
    /// Create a sink writing through `router`
    pub fn new(router: Arc<DestinationRouter>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl RecordSink for LiveSink {
    async fn store(
        &self,
        category: &str,
        key: &str,
        payload: Vec<u8>,
    ) -> Result<bool, LoaderError> {
        let destination = self.router.resolve(category)?;

        match destination.put(key, &payload).await {
            Ok(true) => Ok(true),
            Ok(false) => {
                warn!(key, "Failed to insert");
                Ok(false)
            }
            Err(e) => {
                error!(key, error = %e, "Exception on insert");
                Ok(false)
            }
        }
    }
}

/// Sink that only logs what would have been written
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedSink;

#[async_trait]
impl RecordSink for SimulatedSink {
    async fn store(
        &self,
        _category: &str,
        key: &str,
        payload: Vec<u8>,
    ) -> Result<bool, LoaderError> {
        match decode_user_apps(&payload) {
            Ok(apps) => debug!(key, lat = ?apps.lat, lon = ?apps.lon, apps = ?apps.apps, "[DRY]"),
            Err(_) => debug!(key, bytes = payload.len(), "[DRY]"),
        }
        Ok(true)
    }
}
