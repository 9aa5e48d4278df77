//! Row format handling for appsinstalled input
//!
//! This module centralizes the input row format, providing:
//! - `RecordParser`, which validates one tab-separated row into a `DeviceRecord`
//! - `split_row`, which turns one line of text into raw fields
//! - Column layout constants
//!
//! All functions are pure (no I/O) for easy testing.
//!
//! # Row Layout
//!
//! ```text
//! dev_type \t dev_id \t lat \t lon \t app_id,app_id,...
//! ```
//!
//! The application id column may be empty, which yields an empty list.

use crate::types::{AppId, DeviceRecord, RowRejection};
use csv::StringRecord;
use std::collections::BTreeSet;

/// Number of columns in a valid row
pub const FIELD_COUNT: usize = 5;

/// Column delimiter
pub const FIELD_DELIMITER: u8 = b'\t';

/// Separator inside the application id column
pub const APP_ID_SEPARATOR: char = ',';

/// Validates raw rows against the configured category set
///
/// The parser owns a copy of the category names so it can be shared
/// read-only for the whole run.
#[derive(Debug, Clone)]
pub struct RecordParser {
    categories: BTreeSet<String>,
}

impl RecordParser {
    /// Create a parser accepting the given device types
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            categories: categories.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether a device type is in the configured set
    pub fn accepts(&self, category: &str) -> bool {
        self.categories.contains(category)
    }

    /// Parse one row that has already been split into fields
    ///
    /// # Returns
    ///
    /// - `Ok(DeviceRecord)` if the row is valid
    /// - `Err(RowRejection::MalformedRow)` if the row does not have exactly 5 fields
    /// - `Err(RowRejection::UnknownCategory)` if the device type is not configured
    /// - `Err(RowRejection::InvalidNumeric)` if a coordinate or app id does not parse
    pub fn parse(&self, row: &StringRecord) -> Result<DeviceRecord, RowRejection> {
        if row.len() != FIELD_COUNT {
            return Err(RowRejection::MalformedRow { fields: row.len() });
        }

        let category = &row[0];
        if !self.accepts(category) {
            return Err(RowRejection::UnknownCategory {
                category: category.to_string(),
            });
        }

        let latitude = parse_coordinate("lat", &row[2])?;
        let longitude = parse_coordinate("lon", &row[3])?;
        let app_ids = parse_app_ids(&row[4])?;

        Ok(DeviceRecord {
            category: category.to_string(),
            device_id: row[1].to_string(),
            latitude,
            longitude,
            app_ids,
        })
    }

    /// Parse one raw line of text
    ///
    /// Trailing line terminators are ignored.
    pub fn parse_line(&self, line: &str) -> Result<DeviceRecord, RowRejection> {
        self.parse(&split_row(line))
    }
}

/// Split one line into tab-separated fields
///
/// Trailing line terminators are dropped first. A blank line has no fields
/// at all. There are no quoting rules: every tab starts a new field.
pub fn split_row(line: &str) -> StringRecord {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return StringRecord::new();
    }
    line.split(FIELD_DELIMITER as char).collect()
}

fn parse_coordinate(field: &'static str, raw: &str) -> Result<f64, RowRejection> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| RowRejection::InvalidNumeric {
            field,
            value: raw.to_string(),
        })
}

fn parse_app_ids(raw: &str) -> Result<Vec<AppId>, RowRejection> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    raw.split(APP_ID_SEPARATOR)
        .map(|app| {
            app.trim()
                .parse::<AppId>()
                .map_err(|_| RowRejection::InvalidNumeric {
                    field: "apps",
                    value: app.to_string(),
                })
        })
        .collect()
}
