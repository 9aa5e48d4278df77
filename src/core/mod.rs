//! Core write path
//!
//! This module contains the components between a validated record and the
//! backend:
//! - `traits` - Trait abstractions for destinations and sinks
//! - `router` - Device type to destination mapping
//! - `dispatcher` - Bounded concurrent write dispatch
//! - `sinks` - Live and simulated record sinks
//! - `memcache` - Memcached destination

pub mod dispatcher;
pub mod memcache;
pub mod router;
pub mod sinks;
pub mod traits;

pub use dispatcher::{DispatchBatch, WriteDispatcher, WriteTally};
pub use memcache::MemcacheStore;
pub use router::DestinationRouter;
pub use sinks::{LiveSink, SimulatedSink};
pub use traits::{KeyValueStore, RecordSink};
