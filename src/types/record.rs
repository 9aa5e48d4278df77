//! Device record types for the appsinstalled loader
//!
//! This module defines the validated record produced by the row parser and
//! consumed by the write dispatcher.

/// Application identifier as stored in the `UserApps` payload
pub type AppId = u32;

/// Separator between device type and device id in storage keys
pub const KEY_SEPARATOR: char = ':';

/// One validated input row
///
/// A `DeviceRecord` only exists once all five columns were present, both
/// coordinates parsed, every application id parsed and the device type was
/// found in the configured category set.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    /// Device identifier type (idfa, gaid, ...), one of the configured categories
    pub category: String,

    /// Opaque device identifier, used verbatim in the storage key
    pub device_id: String,

    /// Device latitude
    pub latitude: f64,

    /// Device longitude
    pub longitude: f64,

    /// Installed application ids in input order (may be empty)
    pub app_ids: Vec<AppId>,
}

impl DeviceRecord {
    /// Storage key for this record: `<category>:<device_id>`
    ///
    /// The device id is not escaped. An id that itself contains the
    /// separator can collide with another category/id pair.
    pub fn storage_key(&self) -> String {
        format!("{}{}{}", self.category, KEY_SEPARATOR, self.device_id)
    }
}
