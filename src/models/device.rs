//! Scanner device models and API request/response types.
//!
//! Devices authenticate with an opaque key sent in the `X-Device-Key`
//! header. Keys are stored in the database as SHA-256 hashes; the plaintext
//! is shown exactly once, when the device is created or its key is rotated.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a device record from the database.
///
/// # Database Table
///
/// Maps to the `devices` table with columns:
/// - `id`: Unique identifier (UUID)
/// - `name`: Human-readable device name
/// - `location`: Free-text placement note (e.g. "Lecture Hall B, door 2")
/// - `key_hash`: SHA-256 hash of the device key (64 hex characters)
/// - `last_seen_at`: Timestamp of the most recent scan from this device
/// - `created_at`: When the device was registered
///
/// Note that there is no stored online/offline column: online status is a
/// projection computed from `last_seen_at` at read time.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Device {
    /// Unique identifier for this device
    pub id: Uuid,

    /// Human-readable device name
    pub name: String,

    /// Free-text location of the scanner
    pub location: Option<String>,

    /// SHA-256 hash of the device key (64 hex characters)
    ///
    /// When a scan comes in with `X-Device-Key: abc123`, we:
    /// 1. Hash "abc123" with SHA-256
    /// 2. Look up this hash in the database
    /// 3. Confirm the match with a constant-time comparison
    pub key_hash: String,

    /// Timestamp of the most recent scan, accepted or rejected
    ///
    /// A badly-matched scan still proves the device is alive, so this is
    /// updated for every authenticated request.
    pub last_seen_at: Option<DateTime<Utc>>,

    /// Timestamp when this device was registered
    pub created_at: DateTime<Utc>,
}

impl Device {
    /// Whether this device counts as online at `now`.
    ///
    /// A device is online iff it was seen within the configured threshold.
    /// The status is derived on every read and never persisted.
    pub fn is_online(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        match self.last_seen_at {
            Some(seen) => now - seen < threshold,
            None => false,
        }
    }
}

/// Request body for registering a new device.
///
/// # JSON Example
///
/// ```json
/// {
///   "name": "scanner-hall-b",
///   "location": "Lecture Hall B, door 2"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateDeviceRequest {
    /// Human-readable device name
    pub name: String,

    /// Optional free-text location
    pub location: Option<String>,
}

/// Response returned when a device is created or its key is rotated.
///
/// The `device_key` is the plaintext credential and is shown exactly once.
/// Only its hash is stored, so it can never be retrieved again.
#[derive(Debug, Serialize)]
pub struct DeviceKeyResponse {
    pub id: Uuid,
    pub name: String,

    /// Plaintext device key. Shown once, never retrievable thereafter.
    pub device_key: String,
}

/// Device representation returned by list/read endpoints.
///
/// The stored key hash is never exposed; `status` is the derived
/// online/offline projection.
#[derive(Debug, Serialize)]
pub struct DeviceResponse {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,

    /// `"online"` or `"offline"`, derived from `last_seen_at`
    pub status: &'static str,

    pub last_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DeviceResponse {
    /// Project a device row into its API shape at a given instant.
    pub fn project(device: Device, now: DateTime<Utc>, threshold: Duration) -> Self {
        let status = if device.is_online(now, threshold) {
            "online"
        } else {
            "offline"
        };

        Self {
            id: device.id,
            name: device.name,
            location: device.location,
            status,
            last_seen_at: device.last_seen_at,
            created_at: device.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(last_seen_at: Option<DateTime<Utc>>) -> Device {
        Device {
            id: Uuid::new_v4(),
            name: "scanner-hall-b".to_string(),
            location: None,
            key_hash: "0".repeat(64),
            last_seen_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn never_seen_device_is_offline() {
        let now = Utc::now();
        assert!(!device(None).is_online(now, Duration::seconds(60)));
    }

    #[test]
    fn online_threshold_is_exclusive() {
        let now = Utc::now();
        let threshold = Duration::seconds(60);

        let recent = device(Some(now - Duration::seconds(59)));
        assert!(recent.is_online(now, threshold));

        // Exactly at the threshold counts as offline.
        let boundary = device(Some(now - Duration::seconds(60)));
        assert!(!boundary.is_online(now, threshold));
    }
}
