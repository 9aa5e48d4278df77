//! Error types for the appsinstalled loader
//!
//! This module defines all error types that can occur while loading files.
//! Errors are designed to be descriptive enough to identify the offending
//! file, row field or storage key from a single log line.
//!
//! # Error Categories
//!
//! - **Row Rejections**: Malformed rows, unknown device types, bad numbers
//! - **File Errors**: File cannot be opened, read or renamed
//! - **Backend Errors**: Connection failures, timeouts, protocol errors
//! - **Internal Errors**: Contract violations that abort the whole run

use thiserror::Error;

/// Reason a single input row was rejected by the parser
///
/// Rejections are always recoverable: the row is counted as an error in the
/// file's tally and reading continues with the next row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowRejection {
    /// The row did not split into exactly five tab-separated fields
    #[error("Malformed row: expected 5 fields, got {fields}")]
    MalformedRow {
        /// Number of fields found in the row
        fields: usize,
    },

    /// The device type column is not one of the configured categories
    #[error("Unknown device type '{category}'")]
    UnknownCategory {
        /// The unrecognised device type
        category: String,
    },

    /// A coordinate or application id failed to parse
    #[error("Invalid {field} value '{value}'")]
    InvalidNumeric {
        /// Name of the offending column
        field: &'static str,
        /// The raw text that failed to parse
        value: String,
    },
}

/// Main error type for the loader
///
/// Everything that is not a per-row rejection ends up here. Use
/// [`LoaderError::is_file_local`] to decide whether the batch may continue
/// with the next file.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoaderError {
    /// Input file could not be opened
    #[error("Failed to open file '{path}': {message}")]
    FileOpen {
        /// Path of the file
        path: String,
        /// Description of the underlying error
        message: String,
    },

    /// Input stream failed in the middle of a file (e.g. truncated gzip)
    #[error("Failed to read file '{path}': {message}")]
    FileRead {
        /// Path of the file
        path: String,
        /// Description of the underlying error
        message: String,
    },

    /// Processed file could not be renamed
    #[error("Failed to rename '{from}' to '{to}': {message}")]
    Rename {
        /// Original path
        from: String,
        /// Target path
        to: String,
        /// Description of the underlying error
        message: String,
    },

    /// The input selection pattern is not a valid glob
    #[error("Invalid file pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The pattern as given on the command line
        pattern: String,
        /// Description of the glob error
        message: String,
    },

    /// Could not connect to a backend destination
    #[error("Failed to connect to {addr}: {message}")]
    Connect {
        /// Destination address
        addr: String,
        /// Description of the underlying error
        message: String,
    },

    /// Backend operation exceeded the configured timeout
    #[error("Timed out talking to {addr}")]
    Timeout {
        /// Destination address
        addr: String,
    },

    /// Backend replied with an error or an unexpected response
    #[error("Unexpected response from {addr}: {response}")]
    Protocol {
        /// Destination address
        addr: String,
        /// The response line as received
        response: String,
    },

    /// Storage key cannot be sent to the backend
    #[error("Invalid storage key '{key}'")]
    InvalidKey {
        /// The rejected key
        key: String,
    },

    /// I/O error on an established backend connection
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
    },

    /// Payload bytes could not be decoded
    #[error("Failed to decode payload: {message}")]
    Decode {
        /// Description of the decode error
        message: String,
    },

    /// A record reached the router with a category that has no destination
    ///
    /// The parser filters categories first, so this is a contract violation.
    #[error("No destination configured for device type '{category}'")]
    UnroutableCategory {
        /// The category that could not be routed
        category: String,
    },

    /// Async runtime failure (runtime construction, task join)
    #[error("Runtime error: {message}")]
    Runtime {
        /// Description of the runtime error
        message: String,
    },
}

// Conversion from io::Error to LoaderError
impl From<std::io::Error> for LoaderError {
    fn from(error: std::io::Error) -> Self {
        LoaderError::Io {
            message: error.to_string(),
        }
    }
}

impl From<prost::DecodeError> for LoaderError {
    fn from(error: prost::DecodeError) -> Self {
        LoaderError::Decode {
            message: error.to_string(),
        }
    }
}

impl LoaderError {
    /// Create a FileOpen error
    pub fn file_open(path: &std::path::Path, error: impl std::fmt::Display) -> Self {
        LoaderError::FileOpen {
            path: path.display().to_string(),
            message: error.to_string(),
        }
    }

    /// Create a FileRead error
    pub fn file_read(path: &std::path::Path, error: impl std::fmt::Display) -> Self {
        LoaderError::FileRead {
            path: path.display().to_string(),
            message: error.to_string(),
        }
    }

    /// Create a Timeout error
    pub fn timeout(addr: &str) -> Self {
        LoaderError::Timeout {
            addr: addr.to_string(),
        }
    }

    /// Create an UnroutableCategory error
    pub fn unroutable_category(category: &str) -> Self {
        LoaderError::UnroutableCategory {
            category: category.to_string(),
        }
    }

    /// Whether this error only affects the file being processed
    ///
    /// File-local errors leave the file unmarked and let the batch move on.
    /// Everything else is an internal failure that stops the run.
    pub fn is_file_local(&self) -> bool {
        matches!(
            self,
            LoaderError::FileOpen { .. } | LoaderError::FileRead { .. } | LoaderError::Rename { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::Path;

    #[rstest]
    #[case::malformed(
        RowRejection::MalformedRow { fields: 3 },
        "Malformed row: expected 5 fields, got 3"
    )]
    #[case::unknown_category(
        RowRejection::UnknownCategory { category: "imei".to_string() },
        "Unknown device type 'imei'"
    )]
    #[case::invalid_numeric(
        RowRejection::InvalidNumeric { field: "lat", value: "north".to_string() },
        "Invalid lat value 'north'"
    )]
    fn test_rejection_display(#[case] rejection: RowRejection, #[case] expected: &str) {
        assert_eq!(rejection.to_string(), expected);
    }

    #[rstest]
    #[case::file_open(
        LoaderError::file_open(Path::new("a.tsv.gz"), "No such file or directory"),
        "Failed to open file 'a.tsv.gz': No such file or directory"
    )]
    #[case::timeout(LoaderError::timeout("127.0.0.1:33013"), "Timed out talking to 127.0.0.1:33013")]
    #[case::protocol(
        LoaderError::Protocol {
            addr: "127.0.0.1:33013".to_string(),
            response: "SERVER_ERROR out of memory".to_string(),
        },
        "Unexpected response from 127.0.0.1:33013: SERVER_ERROR out of memory"
    )]
    #[case::unroutable(
        LoaderError::unroutable_category("imei"),
        "No destination configured for device type 'imei'"
    )]
    fn test_error_display(#[case] error: LoaderError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::open(LoaderError::file_open(Path::new("x"), "gone"), true)]
    #[case::read(LoaderError::file_read(Path::new("x"), "corrupt deflate stream"), true)]
    #[case::rename(
        LoaderError::Rename { from: "a".into(), to: ".a".into(), message: "busy".into() },
        true
    )]
    #[case::unroutable(LoaderError::unroutable_category("imei"), false)]
    #[case::runtime(LoaderError::Runtime { message: "join".into() }, false)]
    fn test_is_file_local(#[case] error: LoaderError, #[case] expected: bool) {
        assert_eq!(error.is_file_local(), expected);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let error: LoaderError = io_error.into();
        assert!(matches!(error, LoaderError::Io { .. }));
        assert_eq!(error.to_string(), "I/O error: reset by peer");
    }
}
