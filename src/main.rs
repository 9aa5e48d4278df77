//! Appsinstalled loader CLI
//!
//! Loads tab-separated device installed-apps logs into memcached.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --pattern '/data/appsinstalled/*.tsv.gz'
//! cargo run -- --pattern '/data/appsinstalled/*.tsv.gz' --dry
//! cargo run -- --pattern '/data/appsinstalled/*.tsv.gz' --workers 32 --log loader.log \
//!     --idfa 127.0.0.1:33013 --gaid 127.0.0.1:33014 --adid 127.0.0.1:33015 --dvid 127.0.0.1:33016
//! ```
//!
//! Every matching file is loaded in path order. Files with an error rate
//! under the threshold are renamed to `.<name>` so the next run skips them.
//!
//! # Exit Codes
//!
//! - 0: Success, or interrupted by SIGINT/SIGTERM
//! - 1: Fatal error (logging setup, runtime, invalid pattern, internal error)

use appsinstalled_loader::cli;
use appsinstalled_loader::pipeline::{BatchDriver, RunOutcome};
use std::future::Future;
use std::path::Path;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tokio::signal;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = cli::parse_args();

    // Dry runs log every record at debug level
    let guard = match init_logging(args.log.as_deref(), args.dry) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let config = args.to_loader_config();
    let runtime = match config.runtime() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    // Listen before any file is touched
    let shutdown = match shutdown_signal(&runtime) {
        Ok(shutdown) => shutdown,
        Err(e) => {
            error!("Failed to install signal handlers: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(?config, "Memc loader started");
    let driver = BatchDriver::from_config(&config, runtime.handle().clone());
    match driver.run_until(&config.pattern, runtime.handle(), shutdown) {
        RunOutcome::Finished(Ok(_)) => ExitCode::SUCCESS,
        RunOutcome::Finished(Err(e)) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
        RunOutcome::Interrupted => {
            info!("Interrupted, exiting");
            // Flush buffered log lines; in-flight writes are not awaited
            drop(guard);
            std::process::exit(0);
        }
    }
}

/// Install the tracing subscriber, writing to `log` or stderr
///
/// `RUST_LOG` overrides the default level.
fn init_logging(log: Option<&Path>, dry: bool) -> Result<Option<WorkerGuard>, String> {
    let level = if dry { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let Some(path) = log else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .ok_or_else(|| format!("Invalid log file '{}'", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(dir)
        .map_err(|e| format!("Failed to open log file '{}': {}", path.display(), e))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(Some(guard))
}

/// Resolves on SIGINT or SIGTERM
///
/// Handlers are registered immediately, not on first poll.
#[cfg(unix)]
fn shutdown_signal(runtime: &Runtime) -> std::io::Result<impl Future<Output = ()>> {
    use signal::unix::{signal, SignalKind};

    let _enter = runtime.enter();
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => {},
            _ = terminate.recv() => {},
        }
    })
}

/// Resolves on Ctrl+C
#[cfg(not(unix))]
fn shutdown_signal(_runtime: &Runtime) -> std::io::Result<impl Future<Output = ()>> {
    Ok(async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    })
}
