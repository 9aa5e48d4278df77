//! Destination routing by device type
//!
//! The `DestinationRouter` is an immutable category -> destination table built
//! once at startup. It is shared behind `Arc` and never mutated afterwards, so
//! concurrent lookups need no synchronization.

use super::traits::KeyValueStore;
use crate::types::LoaderError;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Fixed mapping from device type to backend destination
#[derive(Debug, Clone, Default)]
pub struct DestinationRouter {
    destinations: BTreeMap<String, Arc<dyn KeyValueStore>>,
}

impl DestinationRouter {
    /// Create a router from `(category, destination)` pairs
    ///
    /// A category listed twice keeps the last destination.
    pub fn new<I, S>(destinations: I) -> Self
    where
        I: IntoIterator<Item = (S, Arc<dyn KeyValueStore>)>,
        S: Into<String>,
    {
        Self {
            destinations: destinations
                .into_iter()
                .map(|(category, store)| (category.into(), store))
                .collect(),
        }
    }

    /// Look up the destination of a device type
    ///
    /// # Errors
    ///
    /// Returns `LoaderError::UnroutableCategory` if the category has no
    /// destination. Parsed records never hit this; it signals a wiring bug.
    pub fn resolve(&self, category: &str) -> Result<&Arc<dyn KeyValueStore>, LoaderError> {
        self.destinations
            .get(category)
            .ok_or_else(|| LoaderError::unroutable_category(category))
    }

    /// Configured device types in sorted order
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.destinations.keys().map(String::as_str)
    }
}
