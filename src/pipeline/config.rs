//! Loader configuration
//!
//! `LoaderConfig` is built once at startup (normally from the command line)
//! and is read-only afterwards. It also knows how to build the immutable
//! components derived from it: the record parser, the destination router and
//! the record sink.

use crate::core::dispatcher::DEFAULT_WORKERS;
use crate::core::memcache::{MemcacheStore, DEFAULT_TIMEOUT};
use crate::core::{DestinationRouter, KeyValueStore, LiveSink, RecordSink, SimulatedSink};
use crate::io::RecordParser;
use crate::types::LoaderError;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Device types loaded by default
pub const DEFAULT_CATEGORIES: [&str; 4] = ["idfa", "gaid", "adid", "dvid"];

/// Memcached address used when a device type has none configured
pub const DEFAULT_MEMC_ADDR: &str = "127.0.0.1:33013";

/// Files with an error rate at or above this are left for retry
pub const DEFAULT_MAX_ERROR_RATE: f64 = 0.01;

/// Prefix that marks a file as processed
pub const DEFAULT_PROCESSED_PREFIX: &str = ".";

/// Complete configuration of one loader run
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    /// Glob selecting the input files
    pub pattern: String,
    /// Simulate writes instead of talking to memcached
    pub dry_run: bool,
    /// Number of concurrent write units
    pub workers: usize,
    /// `(device type, memcached address)` pairs
    pub destinations: Vec<(String, String)>,
    /// Connect and I/O timeout for each memcached operation
    pub timeout: Duration,
    /// Error rate from which a file is left for retry
    pub max_error_rate: f64,
    /// Prefix added to the name of a processed file
    pub processed_prefix: String,
}

impl LoaderConfig {
    /// Create a configuration with default settings for `pattern`
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            dry_run: false,
            workers: DEFAULT_WORKERS,
            destinations: DEFAULT_CATEGORIES
                .iter()
                .map(|c| (c.to_string(), DEFAULT_MEMC_ADDR.to_string()))
                .collect(),
            timeout: DEFAULT_TIMEOUT,
            max_error_rate: DEFAULT_MAX_ERROR_RATE,
            processed_prefix: DEFAULT_PROCESSED_PREFIX.to_string(),
        }
    }

    /// Set the worker count, falling back to the default for zero
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = if workers == 0 {
            warn!(
                "Invalid workers ({}), using default ({})",
                workers, DEFAULT_WORKERS
            );
            DEFAULT_WORKERS
        } else {
            workers
        };
        self
    }

    /// Set the error rate threshold, falling back to the default when it is
    /// not in `(0, 1]`
    pub fn with_max_error_rate(mut self, rate: f64) -> Self {
        self.max_error_rate = if rate > 0.0 && rate <= 1.0 {
            rate
        } else {
            warn!(
                "Invalid max error rate ({}), using default ({})",
                rate, DEFAULT_MAX_ERROR_RATE
            );
            DEFAULT_MAX_ERROR_RATE
        };
        self
    }

    /// Configured device types
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.destinations.iter().map(|(category, _)| category.as_str())
    }

    /// Parser accepting exactly the configured device types
    pub fn parser(&self) -> RecordParser {
        RecordParser::new(self.categories())
    }

    /// One memcached client per configured device type
    pub fn router(&self) -> DestinationRouter {
        DestinationRouter::new(self.destinations.iter().map(|(category, addr)| {
            let store: Arc<dyn KeyValueStore> =
                Arc::new(MemcacheStore::new(addr.clone(), self.timeout, self.workers));
            (category.clone(), store)
        }))
    }

    /// Live sink over `router`, or the simulated sink for dry runs
    pub fn sink(&self, router: DestinationRouter) -> Arc<dyn RecordSink> {
        if self.dry_run {
            Arc::new(SimulatedSink)
        } else {
            Arc::new(LiveSink::new(Arc::new(router)))
        }
    }

    /// Multi-threaded runtime for the write units
    pub fn runtime(&self) -> Result<tokio::runtime::Runtime, LoaderError> {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.workers.min(num_cpus::get()).max(1))
            .enable_all()
            .build()
            .map_err(|e| LoaderError::Runtime {
                message: format!("Failed to create tokio runtime: {}", e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::new("/data/appsinstalled/*.tsv.gz");
        assert!(!config.dry_run);
        assert_eq!(config.workers, 16);
        assert_eq!(config.max_error_rate, 0.01);
        assert_eq!(config.processed_prefix, ".");
        assert_eq!(
            config.categories().collect::<Vec<_>>(),
            vec!["idfa", "gaid", "adid", "dvid"]
        );
        assert!(config
            .destinations
            .iter()
            .all(|(_, addr)| addr == "127.0.0.1:33013"));
    }

    #[rstest]
    #[case::custom(8, 8)]
    #[case::zero_falls_back(0, 16)]
    fn test_with_workers(#[case] workers: usize, #[case] expected: usize) {
        assert_eq!(LoaderConfig::new("*").with_workers(workers).workers, expected);
    }

    #[rstest]
    #[case::custom(0.05, 0.05)]
    #[case::zero(0.0, 0.01)]
    #[case::negative(-1.0, 0.01)]
    #[case::above_one(1.5, 0.01)]
    #[case::nan(f64::NAN, 0.01)]
    fn test_with_max_error_rate(#[case] rate: f64, #[case] expected: f64) {
        assert_eq!(LoaderConfig::new("*").with_max_error_rate(rate).max_error_rate, expected);
    }

    #[test]
    fn test_parser_and_router_follow_destinations() {
        let mut config = LoaderConfig::new("*");
        config.destinations = vec![("idfa".to_string(), "10.0.0.1:11211".to_string())];

        assert!(config.parser().accepts("idfa"));
        assert!(!config.parser().accepts("gaid"));

        let router = config.router();
        assert_eq!(router.categories().collect::<Vec<_>>(), vec!["idfa"]);
        assert!(router.resolve("gaid").is_err());
    }

    #[test]
    fn test_runtime_builds() {
        let runtime = LoaderConfig::new("*").with_workers(2).runtime().unwrap();
        assert_eq!(runtime.block_on(async { 40 + 2 }), 42);
    }
}
