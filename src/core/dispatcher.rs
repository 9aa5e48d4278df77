//! Concurrent write dispatch for device records
//!
//! This module provides the `WriteDispatcher`, which turns validated records
//! into storage writes on a bounded pool of concurrent tasks.
//!
//! # Design
//!
//! Each record becomes one independent unit of work spawned onto the tokio
//! runtime. A semaphore with `workers` permits bounds how many units run at
//! the same time. Submission itself is unbounded: the reader may queue far
//! more units than there are permits, and nothing pauses reading while the
//! backlog grows.
//!
//! # Architecture
//!
//! ```text
//! WriteDispatcher
//!     ├── Arc<dyn RecordSink>   (live or simulated)
//!     └── Arc<Semaphore>        (worker pool bound)
//!
//! DispatchBatch (one per file)
//!     ├── JoinSet<unit outcome>
//!     └── runtime Handle
//! ```
//!
//! # Ordering
//!
//! Units complete in any order and writes to the same key race; the last
//! write seen by the backend wins. Only counts are collected.

use super::traits::RecordSink;
use crate::io::user_apps::encode_user_apps;
use crate::types::{DeviceRecord, LoaderError};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::error;

/// Default number of concurrent write units
pub const DEFAULT_WORKERS: usize = 16;

/// Success/failure counts of the write units of one file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteTally {
    /// Units that reported success (including records with no apps)
    pub succeeded: u64,
    /// Units that reported failure
    pub failed: u64,
}

/// Bounded concurrent writer
///
/// Cloning is cheap and clones share the same worker pool.
#[derive(Debug, Clone)]
pub struct WriteDispatcher {
    sink: Arc<dyn RecordSink>,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl WriteDispatcher {
    /// Create a dispatcher running at most `workers` units at once
    ///
    /// A `workers` value of zero is raised to one.
    pub fn new(sink: Arc<dyn RecordSink>, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            sink,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    /// Size of the worker pool
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Encode one record and hand it to the sink
    ///
    /// A record without application ids is reported as success without any
    /// write: there is nothing meaningful to store for it.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` / `Ok(false)` - outcome of the unit
    /// * `Err(LoaderError)` - internal contract violation from the sink
    pub async fn write_record(&self, record: &DeviceRecord) -> Result<bool, LoaderError> {
        if record.app_ids.is_empty() {
            return Ok(true);
        }

        let key = record.storage_key();
        let payload = encode_user_apps(record.latitude, record.longitude, &record.app_ids);
        self.sink.store(&record.category, &key, payload).await
    }

    /// Start collecting units for one file on the given runtime
    pub fn begin(&self, handle: Handle) -> DispatchBatch {
        DispatchBatch {
            dispatcher: self.clone(),
            handle,
            tasks: JoinSet::new(),
        }
    }
}

/// Outstanding write units of one file
///
/// Dropping a batch before `finish` aborts every unit still queued or
/// running.
#[derive(Debug)]
pub struct DispatchBatch {
    dispatcher: WriteDispatcher,
    handle: Handle,
    tasks: JoinSet<Result<bool, LoaderError>>,
}

impl DispatchBatch {
    /// Queue one record; returns immediately
    pub fn submit(&mut self, record: DeviceRecord) {
        let dispatcher = self.dispatcher.clone();
        self.tasks.spawn_on(
            async move {
                let _permit = dispatcher
                    .permits
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| LoaderError::Runtime {
                        message: e.to_string(),
                    })?;
                dispatcher.write_record(&record).await
            },
            &self.handle,
        );
    }

    /// Units submitted and not yet collected
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every submitted unit and count the outcomes
    ///
    /// Units are collected in completion order. A unit that panicked counts
    /// as a failure. This blocks the calling thread, so it must not be
    /// called from inside the runtime.
    ///
    /// # Errors
    ///
    /// Returns the first internal error reported by a unit; remaining units
    /// are aborted.
    pub fn finish(self) -> Result<WriteTally, LoaderError> {
        let DispatchBatch {
            handle, mut tasks, ..
        } = self;

        handle.block_on(async move {
            let mut tally = WriteTally::default();
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Ok(true)) => tally.succeeded += 1,
                    Ok(Ok(false)) => tally.failed += 1,
                    Ok(Err(e)) => return Err(e),
                    Err(e) => {
                        error!(error = %e, "Write task failed");
                        tally.failed += 1;
                    }
                }
            }
            Ok(tally)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::router::DestinationRouter;
    use crate::core::sinks::{LiveSink, SimulatedSink};
    use crate::core::traits::KeyValueStore;
    use crate::pipeline::LoaderConfig;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Store that counts calls, fails keys ending in "bad" and tracks the
    /// highest number of concurrent puts
    #[derive(Debug, Default)]
    struct CountingStore {
        keys: Mutex<Vec<String>>,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl KeyValueStore for CountingStore {
        async fn put(&self, key: &str, _value: &[u8]) -> Result<bool, LoaderError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(2)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            self.keys.lock().unwrap().push(key.to_string());
            if key.ends_with("bad") {
                Err(LoaderError::timeout("fake"))
            } else {
                Ok(true)
            }
        }
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap()
    }

    fn record(device_id: &str, app_ids: Vec<u32>) -> DeviceRecord {
        DeviceRecord {
            category: "idfa".to_string(),
            device_id: device_id.to_string(),
            latitude: 55.55,
            longitude: 42.42,
            app_ids,
        }
    }

    fn live(store: Arc<CountingStore>, workers: usize) -> WriteDispatcher {
        let router = DestinationRouter::new([("idfa", store as Arc<dyn KeyValueStore>)]);
        WriteDispatcher::new(Arc::new(LiveSink::new(Arc::new(router))), workers)
    }

    #[test]
    fn test_every_record_written_once_and_failures_counted() {
        let rt = runtime();
        let store = Arc::new(CountingStore::default());
        let dispatcher = live(store.clone(), 8);

        let mut batch = dispatcher.begin(rt.handle().clone());
        for i in 0..200 {
            let id = if i % 10 == 0 { format!("dev{}-bad", i) } else { format!("dev{}", i) };
            batch.submit(record(&id, vec![1, 2, 3]));
        }
        let tally = batch.finish().unwrap();

        assert_eq!(tally, WriteTally { succeeded: 180, failed: 20 });
        let keys = store.keys.lock().unwrap();
        assert_eq!(keys.len(), 200);
        assert_eq!(keys.iter().collect::<HashSet<_>>().len(), 200);
    }

    #[test]
    fn test_worker_pool_bounds_concurrency() {
        let rt = runtime();
        let store = Arc::new(CountingStore::default());
        let dispatcher = live(store.clone(), 3);

        let mut batch = dispatcher.begin(rt.handle().clone());
        for i in 0..50 {
            batch.submit(record(&format!("dev{}", i), vec![7]));
        }
        batch.finish().unwrap();

        let peak = store.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {} exceeded pool size", peak);
        assert!(peak >= 1);
    }

    #[test]
    fn test_empty_apps_succeed_without_write() {
        let rt = runtime();
        let store = Arc::new(CountingStore::default());
        let dispatcher = live(store.clone(), 4);

        let mut batch = dispatcher.begin(rt.handle().clone());
        batch.submit(record("no-apps", vec![]));
        batch.submit(record("with-apps", vec![1]));
        let tally = batch.finish().unwrap();

        assert_eq!(tally, WriteTally { succeeded: 2, failed: 0 });
        assert_eq!(*store.keys.lock().unwrap(), vec!["idfa:with-apps".to_string()]);
    }

    #[test]
    fn test_dry_run_sink_never_writes() {
        let rt = runtime();
        let store = Arc::new(CountingStore::default());
        let router = DestinationRouter::new([("idfa", store.clone() as Arc<dyn KeyValueStore>)]);
        let mut config = LoaderConfig::new("*.tsv.gz");
        config.dry_run = true;
        let dispatcher = WriteDispatcher::new(config.sink(router), 4);

        let mut batch = dispatcher.begin(rt.handle().clone());
        for i in 0..20 {
            batch.submit(record(&format!("dev{}-bad", i), vec![1]));
        }
        assert_eq!(batch.pending(), 20);
        let tally = batch.finish().unwrap();

        assert_eq!(tally, WriteTally { succeeded: 20, failed: 0 });
        assert!(store.keys.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unroutable_record_aborts_batch() {
        let rt = runtime();
        let dispatcher = live(Arc::new(CountingStore::default()), 2);

        let mut batch = dispatcher.begin(rt.handle().clone());
        let mut stray = record("x", vec![1]);
        stray.category = "imei".to_string();
        batch.submit(stray);

        let err = batch.finish().unwrap_err();
        assert!(matches!(err, LoaderError::UnroutableCategory { .. }));
    }

    #[test]
    fn test_empty_batch_finishes_immediately() {
        let rt = runtime();
        let dispatcher = WriteDispatcher::new(Arc::new(SimulatedSink), 0);
        assert_eq!(dispatcher.workers(), 1);
        let tally = dispatcher.begin(rt.handle().clone()).finish().unwrap();
        assert_eq!(tally, WriteTally::default());
    }
}
