//! `UserApps` payload codec
//!
//! The stored value is the protobuf message defined by `appsinstalled.proto`:
//!
//! ```text
//! message UserApps {
//!     repeated uint32 apps = 1 [packed=true];
//!     optional double lat = 2;
//!     optional double lon = 3;
//! }
//! ```
//!
//! The message is declared by hand with the prost derive so no build script
//! or `protoc` is required.

use crate::types::{AppId, LoaderError};
use prost::Message;

/// Installed applications and coordinates of one device
#[derive(Clone, PartialEq, Message)]
pub struct UserApps {
    #[prost(uint32, repeated, packed = "true", tag = "1")]
    pub apps: Vec<AppId>,
    #[prost(double, optional, tag = "2")]
    pub lat: Option<f64>,
    #[prost(double, optional, tag = "3")]
    pub lon: Option<f64>,
}

/// Encode coordinates and application ids into the stored payload
pub fn encode_user_apps(latitude: f64, longitude: f64, app_ids: &[AppId]) -> Vec<u8> {
    UserApps {
        apps: app_ids.to_vec(),
        lat: Some(latitude),
        lon: Some(longitude),
    }
    .encode_to_vec()
}

/// Decode a stored payload
pub fn decode_user_apps(bytes: &[u8]) -> Result<UserApps, LoaderError> {
    Ok(UserApps::decode(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_round_trip_is_exact() {
        let bytes = encode_user_apps(12.34, 56.78, &[1, 2, 3]);
        let decoded = decode_user_apps(&bytes).unwrap();

        assert_eq!(decoded.apps, vec![1, 2, 3]);
        assert_eq!(decoded.lat, Some(12.34));
        assert_eq!(decoded.lon, Some(56.78));
    }

    #[test]
    fn test_payload_keeps_extreme_values() {
        let apps = [u32::MAX, 0, 7];
        let bytes = encode_user_apps(-90.0, f64::MIN_POSITIVE, &apps);
        let decoded = decode_user_apps(&bytes).unwrap();

        assert_eq!(decoded.apps, apps.to_vec());
        assert_eq!(decoded.lat.map(f64::to_bits), Some((-90.0f64).to_bits()));
        assert_eq!(decoded.lon, Some(f64::MIN_POSITIVE));
    }

    #[test]
    fn test_apps_are_packed() {
        // field 1, wire type 2 (length delimited) => tag byte 0x0a
        let bytes = encode_user_apps(0.0, 0.0, &[1, 2, 3]);
        assert_eq!(&bytes[..5], &[0x0a, 0x03, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = decode_user_apps(&[0x0a, 0xff]).unwrap_err();
        assert!(matches!(err, LoaderError::Decode { .. }));
    }
}
