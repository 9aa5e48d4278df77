//! Per-file and per-batch outcome types
//!
//! `IngestionResult` is the only mutable state of a file run: it is created
//! when the file is opened, updated as rows and write outcomes arrive, and
//! dropped once the post-processing decision has been made.

use std::path::PathBuf;

/// Running tally for one input file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionResult {
    /// Records handed to the write dispatcher
    pub total: u64,

    /// Rows rejected by the parser plus writes that failed
    pub errors: u64,
}

impl IngestionResult {
    /// Create an empty tally
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a record submitted for writing
    pub fn record_dispatched(&mut self) {
        self.total += 1;
    }

    /// Count a parse rejection or a failed write
    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    /// `errors / total`, defined as `0.0` when nothing was dispatched
    pub fn error_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.errors as f64 / self.total as f64
        }
    }

    /// Whether the file may be marked as processed
    pub fn is_acceptable(&self, max_error_rate: f64) -> bool {
        self.error_rate() < max_error_rate
    }
}

/// What happened to a file after its rows were loaded
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// Error rate under the threshold; file renamed to `renamed_to`
    Processed {
        /// Final tally
        result: IngestionResult,
        /// New location of the file
        renamed_to: PathBuf,
    },

    /// Error rate at or above the threshold; file left in place for retry
    LeftForRetry {
        /// Final tally
        result: IngestionResult,
    },
}

impl FileOutcome {
    /// The final tally of the file
    pub fn result(&self) -> IngestionResult {
        match self {
            FileOutcome::Processed { result, .. } | FileOutcome::LeftForRetry { result } => *result,
        }
    }
}

/// Counts over a whole batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Files matched by the pattern
    pub files: usize,
    /// Files marked as processed
    pub processed: usize,
    /// Files left for retry because of their error rate
    pub left_for_retry: usize,
    /// Files skipped because they could not be opened, read or renamed
    pub failed: usize,
}
