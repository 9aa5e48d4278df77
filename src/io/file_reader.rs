//! Streaming reader over appsinstalled input files
//!
//! Provides an iterator over raw tab-separated rows from a plain or gzip
//! compressed file. Delegates validation to the `row_format` module.
//!
//! # Design
//!
//! The RowReader wraps either the file itself or a gzip decoder, chosen by
//! file name suffix. Lines are read one at a time as bytes and decoded to
//! UTF-8 individually, so a single undecodable line does not stop the file.
//! Every line, blank ones included, becomes one row: a blank line is a row
//! with no fields and is rejected by the parser like any other short row.
//!
//! # Error Handling
//!
//! - Open errors (missing file, bad gzip header) are returned from `open()`
//! - A zero-byte `.gz` file reads as an empty stream
//! - Undecodable rows are yielded as `RawRow::Undecodable`
//! - Stream errors mid-file are yielded as `Err(LoaderError::FileRead)`;
//!   callers should stop reading the file at that point

use crate::io::row_format::split_row;
use crate::types::LoaderError;
use csv::{Position, StringRecord};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// File name suffix that marks gzip compressed input
pub const GZIP_SUFFIX: &str = ".gz";

/// A row as read from the file, before validation
#[derive(Debug, Clone)]
pub enum RawRow {
    /// Row decoded as UTF-8 and split into fields
    Row(StringRecord),

    /// Row contained invalid UTF-8
    Undecodable {
        /// 1-based line number of the row
        line: u64,
    },
}

/// Whether a path is read through the gzip decoder
pub fn is_gzip(path: &Path) -> bool {
    path.to_string_lossy().ends_with(GZIP_SUFFIX)
}

/// Streaming row reader
///
/// Memory usage is constant per row, not proportional to the file size.
pub struct RowReader {
    path: PathBuf,
    input: Box<dyn BufRead + Send>,
    buf: Vec<u8>,
    line: u64,
}

impl std::fmt::Debug for RowReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowReader")
            .field("path", &self.path)
            .field("line", &self.line)
            .finish()
    }
}

impl RowReader {
    /// Open a file for reading, decompressing it if it ends in `.gz`
    ///
    /// The first chunk of the stream is read eagerly so that a corrupt gzip
    /// header is reported here as `FileOpen` rather than on the first row.
    pub fn open(path: &Path) -> Result<Self, LoaderError> {
        let file = File::open(path).map_err(|e| LoaderError::file_open(path, e))?;
        let empty = file
            .metadata()
            .map_err(|e| LoaderError::file_open(path, e))?
            .len()
            == 0;

        let mut input: Box<dyn BufRead + Send> = if is_gzip(path) && !empty {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        input.fill_buf().map_err(|e| LoaderError::file_open(path, e))?;

        Ok(Self::from_reader(path, input))
    }

    /// Build a reader over any buffered byte source
    pub fn from_reader<R: BufRead + Send + 'static>(path: &Path, input: R) -> Self {
        Self {
            path: path.to_path_buf(),
            input: Box::new(input),
            buf: Vec::new(),
            line: 0,
        }
    }
}

impl Iterator for RowReader {
    type Item = Result<RawRow, LoaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.input.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                self.line += 1;
                match std::str::from_utf8(&self.buf) {
                    Ok(text) => {
                        let mut row = split_row(text);
                        let mut position = Position::new();
                        position.set_line(self.line);
                        row.set_position(Some(position));
                        Some(Ok(RawRow::Row(row)))
                    }
                    Err(_) => Some(Ok(RawRow::Undecodable { line: self.line })),
                }
            }
            Err(e) => Some(Err(LoaderError::file_read(&self.path, e))),
        }
    }
}
