//! Batch driver
//!
//! Expands the input pattern, sorts the matches and runs the ingestion
//! controller over each file in turn. A file that cannot be opened, read or
//! renamed is reported and skipped; it never affects the other files.

use super::config::LoaderConfig;
use super::ingest::FileIngestor;
use crate::core::WriteDispatcher;
use crate::types::{BatchSummary, FileOutcome, LoaderError};
use glob::MatchOptions;
use std::future::Future;
use std::path::PathBuf;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Files matching `pattern`, sorted lexicographically by path
///
/// Wildcards do not match a leading dot, so files already marked as
/// processed are not picked up again. Directories are ignored.
pub fn find_input_files(pattern: &str) -> Result<Vec<PathBuf>, LoaderError> {
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: true,
    };

    let entries = glob::glob_with(pattern, options).map_err(|e| LoaderError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping unreadable path: {}", e);
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    Ok(files)
}

/// How a run started with `BatchDriver::run_until` ended
#[derive(Debug)]
pub enum RunOutcome {
    /// Every file was visited, or the run failed
    Finished(Result<BatchSummary, LoaderError>),
    /// The shutdown future completed first; the run was abandoned
    Interrupted,
}

/// Sequential driver over all input files
#[derive(Debug, Clone)]
pub struct BatchDriver {
    ingestor: FileIngestor,
}

impl BatchDriver {
    /// Create a driver around an ingestion controller
    pub fn new(ingestor: FileIngestor) -> Self {
        Self { ingestor }
    }

    /// Wire parser, router, sink and dispatcher from a configuration
    pub fn from_config(config: &LoaderConfig, handle: Handle) -> Self {
        let router = config.router();
        info!(
            categories = ?router.categories().collect::<Vec<_>>(),
            dry_run = config.dry_run,
            "Destinations configured"
        );
        let sink = config.sink(router);
        let dispatcher = WriteDispatcher::new(sink, config.workers);
        let ingestor = FileIngestor::new(
            config.parser(),
            dispatcher,
            handle,
            config.max_error_rate,
            config.processed_prefix.clone(),
        );
        Self::new(ingestor)
    }

    /// Process every file matching `pattern`
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid pattern or an internal failure.
    /// File-level errors are logged and counted in the summary instead.
    pub fn run(&self, pattern: &str) -> Result<BatchSummary, LoaderError> {
        let files = find_input_files(pattern)?;
        if files.is_empty() {
            info!("No files match {}", pattern);
        }

        let mut summary = BatchSummary {
            files: files.len(),
            ..BatchSummary::default()
        };

        for path in &files {
            match self.ingestor.ingest(path) {
                Ok(FileOutcome::Processed { .. }) => summary.processed += 1,
                Ok(FileOutcome::LeftForRetry { .. }) => summary.left_for_retry += 1,
                Err(e) if e.is_file_local() => {
                    error!("Skipping {}: {}", path.display(), e);
                    summary.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            files = summary.files,
            processed = summary.processed,
            left_for_retry = summary.left_for_retry,
            failed = summary.failed,
            "Batch finished"
        );
        Ok(summary)
    }

    /// Process `pattern` on a background thread until it finishes or
    /// `shutdown` completes
    ///
    /// On interrupt the background thread keeps running, so the caller is
    /// expected to exit right away.
    pub fn run_until<S>(self, pattern: &str, handle: &Handle, shutdown: S) -> RunOutcome
    where
        S: Future<Output = ()>,
    {
        let pattern = pattern.to_string();
        let (done_tx, done_rx) = oneshot::channel();
        std::thread::spawn(move || {
            let _ = done_tx.send(self.run(&pattern));
        });

        handle.block_on(async move {
            tokio::select! {
                biased;
                _ = shutdown => RunOutcome::Interrupted,
                result = done_rx => RunOutcome::Finished(result.unwrap_or_else(|_| {
                    Err(LoaderError::Runtime {
                        message: "batch thread stopped before reporting".to_string(),
                    })
                })),
            }
        })
    }
}
