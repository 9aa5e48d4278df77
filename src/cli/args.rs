use crate::core::dispatcher::DEFAULT_WORKERS;
use crate::pipeline::config::{LoaderConfig, DEFAULT_MAX_ERROR_RATE, DEFAULT_MEMC_ADDR};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Load installed-apps logs into memcached
#[derive(Parser, Debug)]
#[command(name = "appsinstalled-loader")]
#[command(about = "Load device installed-apps logs into memcached", long_about = None)]
pub struct CliArgs {
    /// Glob selecting the input files
    #[arg(long, value_name = "GLOB", help = "Input file pattern, e.g. '/data/appsinstalled/*.tsv.gz'")]
    pub pattern: String,

    /// Parse and encode without writing to memcached
    #[arg(long = "dry", help = "Dry run: validate and log records, never write")]
    pub dry: bool,

    /// Number of concurrent writes
    #[arg(
        long,
        value_name = "COUNT",
        default_value_t = DEFAULT_WORKERS,
        help = "Number of concurrent memcached writes"
    )]
    pub workers: usize,

    /// Log file (stderr if omitted)
    #[arg(long, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Memcached address for idfa devices
    #[arg(long, value_name = "ADDR", default_value = DEFAULT_MEMC_ADDR)]
    pub idfa: String,

    /// Memcached address for gaid devices
    #[arg(long, value_name = "ADDR", default_value = DEFAULT_MEMC_ADDR)]
    pub gaid: String,

    /// Memcached address for adid devices
    #[arg(long, value_name = "ADDR", default_value = DEFAULT_MEMC_ADDR)]
    pub adid: String,

    /// Memcached address for dvid devices
    #[arg(long, value_name = "ADDR", default_value = DEFAULT_MEMC_ADDR)]
    pub dvid: String,

    /// Memcached operation timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 3.0)]
    pub timeout: f64,

    /// Error rate from which a file is left for retry
    #[arg(long = "max-error-rate", value_name = "RATE", default_value_t = DEFAULT_MAX_ERROR_RATE)]
    pub max_error_rate: f64,
}

impl CliArgs {
    /// Build a LoaderConfig from CLI arguments
    ///
    /// Out-of-range values fall back to the defaults with a logged warning,
    /// so call this after logging is set up.
    pub fn to_loader_config(&self) -> LoaderConfig {
        let mut config = LoaderConfig::new(self.pattern.clone())
            .with_workers(self.workers)
            .with_max_error_rate(self.max_error_rate);

        config.dry_run = self.dry;
        config.destinations = vec![
            ("idfa".to_string(), self.idfa.clone()),
            ("gaid".to_string(), self.gaid.clone()),
            ("adid".to_string(), self.adid.clone()),
            ("dvid".to_string(), self.dvid.clone()),
        ];
        if self.timeout.is_finite() && self.timeout > 0.0 {
            config.timeout = Duration::from_secs_f64(self.timeout);
        }

        config
    }
}
