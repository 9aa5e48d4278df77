//! File ingestion controller
//!
//! Drives one input file end-to-end:
//!
//! ```text
//! Opening ──> Streaming ──> Finalizing ──> Done
//!   │            │              │            ├── rate < threshold: rename to .<name>
//!   │            │              │            └── otherwise: leave for retry
//!   │            │              └── wait for every write unit, count failures
//!   │            └── parse each row, submit valid records, count rejections
//!   └── open plain or gzip stream (failure skips the file)
//! ```
//!
//! Reading and tallying happen on the calling thread; only the write units
//! run on the runtime. The controller owns no state beyond the per-file
//! tally, so separate controllers may process different files concurrently.

use crate::core::WriteDispatcher;
use crate::io::{RawRow, RecordParser, RowReader};
use crate::types::{FileOutcome, IngestionResult, LoaderError};
use std::path::{Path, PathBuf};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// Runs the ingestion state machine over single files
#[derive(Debug, Clone)]
pub struct FileIngestor {
    parser: RecordParser,
    dispatcher: WriteDispatcher,
    handle: Handle,
    max_error_rate: f64,
    processed_prefix: String,
}

impl FileIngestor {
    /// Create a controller
    ///
    /// `handle` must belong to a multi-threaded runtime that is not driving
    /// the calling thread.
    pub fn new(
        parser: RecordParser,
        dispatcher: WriteDispatcher,
        handle: Handle,
        max_error_rate: f64,
        processed_prefix: impl Into<String>,
    ) -> Self {
        Self {
            parser,
            dispatcher,
            handle,
            max_error_rate,
            processed_prefix: processed_prefix.into(),
        }
    }

    /// Load one file and apply the post-processing decision
    ///
    /// # Errors
    ///
    /// - `FileOpen` / `FileRead` / `Rename`: only this file is affected and
    ///   it is left unmarked
    /// - anything else is an internal failure
    pub fn ingest(&self, path: &Path) -> Result<FileOutcome, LoaderError> {
        info!("Processing {}", path.display());

        let reader = RowReader::open(path)?;
        let result = self.load(reader)?;

        info!(
            total = result.total,
            errors = result.errors,
            "Processed {}: {} rows, {} errors ({:.2}%)",
            path.display(),
            result.total,
            result.errors,
            result.error_rate() * 100.0
        );

        if result.is_acceptable(self.max_error_rate) {
            let renamed_to = mark_processed(path, &self.processed_prefix)?;
            info!("Renamed {} -> {}", path.display(), renamed_to.display());
            Ok(FileOutcome::Processed { result, renamed_to })
        } else {
            warn!("Too many errors in {}: not renamed", path.display());
            Ok(FileOutcome::LeftForRetry { result })
        }
    }

    /// Stream rows into the dispatcher and collect the final tally
    ///
    /// A read error drops the pending units and returns immediately.
    pub fn load<I>(&self, rows: I) -> Result<IngestionResult, LoaderError>
    where
        I: IntoIterator<Item = Result<RawRow, LoaderError>>,
    {
        let mut result = IngestionResult::new();
        let mut batch = self.dispatcher.begin(self.handle.clone());

        for row in rows {
            match row? {
                RawRow::Row(row) => match self.parser.parse(&row) {
                    Ok(record) => {
                        batch.submit(record);
                        result.record_dispatched();
                    }
                    Err(rejection) => {
                        debug!(line = ?row.position().map(|p| p.line()), "{}", rejection);
                        result.record_error();
                    }
                },
                RawRow::Undecodable { line } => {
                    debug!(line, "Row is not valid UTF-8");
                    result.record_error();
                }
            }
        }

        debug!(pending = batch.pending(), "Waiting for writes");
        let writes = batch.finish()?;
        result.errors += writes.failed;

        Ok(result)
    }
}

/// Path a processed file is renamed to: same directory, prefixed name
pub fn processed_path(path: &Path, prefix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}{}", prefix, name))
}

/// Rename a file to its processed name
pub fn mark_processed(path: &Path, prefix: &str) -> Result<PathBuf, LoaderError> {
    let target = processed_path(path, prefix);
    std::fs::rename(path, &target).map_err(|e| LoaderError::Rename {
        from: path.display().to_string(),
        to: target.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SimulatedSink;
    use csv::StringRecord;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap()
    }

    fn ingestor(handle: Handle) -> FileIngestor {
        FileIngestor::new(
            RecordParser::new(["idfa", "gaid", "adid", "dvid"]),
            WriteDispatcher::new(Arc::new(SimulatedSink), 4),
            handle,
            0.01,
            ".",
        )
    }

    fn row(fields: &[&str]) -> Result<RawRow, LoaderError> {
        Ok(RawRow::Row(StringRecord::from(fields.to_vec())))
    }

    #[test]
    fn test_processed_path() {
        assert_eq!(
            processed_path(Path::new("/data/appsinstalled/20170929000000.tsv.gz"), "."),
            PathBuf::from("/data/appsinstalled/.20170929000000.tsv.gz")
        );
        assert_eq!(processed_path(Path::new("a.tsv"), "done_"), PathBuf::from("done_a.tsv"));
    }

    #[test]
    fn test_load_counts_rejections_and_dispatches() {
        let rt = runtime();
        let rows = vec![
            row(&["idfa", "a", "1", "2", "3"]),
            row(&["gaid", "b", "1", "2", ""]),
            row(&["imei", "c", "1", "2", "3"]),
            row(&["idfa", "d", "x", "2", "3"]),
            row(&["idfa", "e"]),
            Ok(RawRow::Undecodable { line: 6 }),
        ];

        let result = ingestor(rt.handle().clone()).load(rows).unwrap();
        assert_eq!(result, IngestionResult { total: 2, errors: 4 });
    }

    #[test]
    fn test_load_stops_on_read_error() {
        let rt = runtime();
        let rows = vec![
            row(&["idfa", "a", "1", "2", "3"]),
            Err(LoaderError::file_read(Path::new("f.gz"), "unexpected end of file")),
            row(&["idfa", "b", "1", "2", "3"]),
        ];

        let err = ingestor(rt.handle().clone()).load(rows).unwrap_err();
        assert!(matches!(err, LoaderError::FileRead { .. }));
    }

    #[test]
    fn test_ingest_renames_clean_file() {
        let rt = runtime();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("20170929000000.tsv");
        std::fs::write(&path, "idfa\ta\t1\t2\t3\ngaid\tb\t4\t5\t6\n").unwrap();

        let outcome = ingestor(rt.handle().clone()).ingest(&path).unwrap();

        let expected = dir.path().join(".20170929000000.tsv");
        assert_eq!(
            outcome,
            FileOutcome::Processed {
                result: IngestionResult { total: 2, errors: 0 },
                renamed_to: expected.clone(),
            }
        );
        assert!(!path.exists());
        assert!(expected.exists());
    }

    #[test]
    fn test_ingest_leaves_noisy_file() {
        let rt = runtime();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("noisy.tsv");
        std::fs::write(&path, "idfa\ta\t1\t2\t3\nbroken row\n").unwrap();

        let outcome = ingestor(rt.handle().clone()).ingest(&path).unwrap();

        assert_eq!(
            outcome,
            FileOutcome::LeftForRetry {
                result: IngestionResult { total: 1, errors: 1 }
            }
        );
        assert!(path.exists());
    }

    #[test]
    fn test_ingest_empty_file_is_processed() {
        let rt = runtime();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.tsv");
        std::fs::write(&path, "").unwrap();

        let outcome = ingestor(rt.handle().clone()).ingest(&path).unwrap();
        assert!(matches!(outcome, FileOutcome::Processed { .. }));
        assert_eq!(outcome.result(), IngestionResult::default());
    }

    #[test]
    fn test_ingest_counts_blank_lines_as_errors() {
        let rt = runtime();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.tsv");
        let half: String = (0..50)
            .map(|i| format!("idfa\tdev-{}\t1\t2\t3\n", i))
            .collect();
        std::fs::write(&path, format!("{}\n\n{}", half, half)).unwrap();

        let outcome = ingestor(rt.handle().clone()).ingest(&path).unwrap();

        // 2 errors over 100 dispatched rows is a 2% error rate
        assert_eq!(
            outcome,
            FileOutcome::LeftForRetry {
                result: IngestionResult { total: 100, errors: 2 }
            }
        );
        assert!(path.exists());
    }

    #[test]
    fn test_ingest_zero_byte_gzip_is_processed() {
        let rt = runtime();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("20170929000000.tsv.gz");
        std::fs::write(&path, b"").unwrap();

        let outcome = ingestor(rt.handle().clone()).ingest(&path).unwrap();
        assert_eq!(outcome.result(), IngestionResult::default());
        assert!(dir.path().join(".20170929000000.tsv.gz").exists());
    }

    #[test]
    fn test_ingest_missing_file_is_file_local_error() {
        let rt = runtime();
        let dir = TempDir::new().unwrap();
        let err = ingestor(rt.handle().clone())
            .ingest(&dir.path().join("missing.tsv"))
            .unwrap_err();
        assert!(err.is_file_local());
    }
}
