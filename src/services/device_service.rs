//! Device registry - identity, credentials, and liveness of scanners.
//!
//! Scanners are physically exposed appliances, so their credentials get the
//! same treatment as API keys: only SHA-256 hashes are stored, the plaintext
//! is shown once at creation/rotation, and authentication confirms the hash
//! match with a constant-time comparison.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::{db::DbPool, error::AppError, models::device::Device};

/// Hash a device key for storage or lookup.
///
/// # Output
///
/// 64 hex characters (SHA-256 digest).
pub fn hash_device_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a cryptographically secure random device key.
///
/// # Output
///
/// 64 hex characters (32 bytes of randomness).
pub fn generate_device_key() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Authenticate a device by its presented key.
///
/// # Process
///
/// 1. Hash the presented key with SHA-256
/// 2. Look the hash up in the `devices` table
/// 3. Confirm the match with a constant-time digest comparison
///
/// The lookup and comparison operate on digests only, so the timing of a
/// rejection reveals nothing useful about stored credentials.
///
/// # Errors
///
/// - `DeviceAuth`: no device holds that key
/// - `Database`: lookup failed
pub async fn authenticate(pool: &DbPool, presented_key: &str) -> Result<Device, AppError> {
    let key_hash = hash_device_key(presented_key);

    let device = sqlx::query_as::<_, Device>(
        "SELECT id, name, location, key_hash, last_seen_at, created_at
         FROM devices
         WHERE key_hash = $1",
    )
    .bind(&key_hash)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::DeviceAuth)?;

    // The indexed lookup already matched; this re-check keeps the final
    // accept/reject decision constant-time over the digest bytes.
    if !bool::from(key_hash.as_bytes().ct_eq(device.key_hash.as_bytes())) {
        return Err(AppError::DeviceAuth);
    }

    Ok(device)
}

/// Record a liveness heartbeat for a device.
///
/// Called for every authenticated scan, accepted or rejected, since a
/// badly-matched scan still proves the device is alive. This is a side
/// effect only: failures are logged and never propagated, so a heartbeat
/// problem can never fail the scan that triggered it.
pub async fn touch(pool: &DbPool, device_id: Uuid, at: DateTime<Utc>) {
    let result = sqlx::query("UPDATE devices SET last_seen_at = $2 WHERE id = $1")
        .bind(device_id)
        .bind(at)
        .execute(pool)
        .await;

    if let Err(e) = result {
        tracing::warn!("Failed to record heartbeat for device {device_id}: {e}");
    }
}

/// Register a new device and issue its initial key.
///
/// Returns the created row and the plaintext key. The plaintext is shown
/// exactly once; only its hash is stored.
pub async fn create_device(
    pool: &DbPool,
    name: String,
    location: Option<String>,
) -> Result<(Device, String), AppError> {
    let device_key = generate_device_key();
    let key_hash = hash_device_key(&device_key);

    let device = sqlx::query_as::<_, Device>(
        r#"
        INSERT INTO devices (name, location, key_hash)
        VALUES ($1, $2, $3)
        RETURNING id, name, location, key_hash, last_seen_at, created_at
        "#,
    )
    .bind(name)
    .bind(location)
    .bind(&key_hash)
    .fetch_one(pool)
    .await?;

    Ok((device, device_key))
}

/// Rotate a device's key.
///
/// The old key is invalidated atomically with the new one taking effect:
/// the hash is replaced in a single UPDATE, so there is no window in which
/// both keys (or neither key) authenticate.
///
/// # Errors
///
/// - `DeviceNotFound`: no device with that id
/// - `Database`: update failed
pub async fn rotate_key(pool: &DbPool, device_id: Uuid) -> Result<String, AppError> {
    let device_key = generate_device_key();
    let key_hash = hash_device_key(&device_key);

    let updated = sqlx::query("UPDATE devices SET key_hash = $1 WHERE id = $2")
        .bind(&key_hash)
        .bind(device_id)
        .execute(pool)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(AppError::DeviceNotFound);
    }

    Ok(device_key)
}

/// Get a device by ID.
pub async fn get_device(pool: &DbPool, device_id: Uuid) -> Result<Device, AppError> {
    let device = sqlx::query_as::<_, Device>(
        "SELECT id, name, location, key_hash, last_seen_at, created_at
         FROM devices
         WHERE id = $1",
    )
    .bind(device_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::DeviceNotFound)?;

    Ok(device)
}

/// List all registered devices, most recently created first.
pub async fn list_devices(pool: &DbPool) -> Result<Vec<Device>, AppError> {
    let devices = sqlx::query_as::<_, Device>(
        "SELECT id, name, location, key_hash, last_seen_at, created_at
         FROM devices
         ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_64_hex_chars() {
        let key = generate_device_key();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_keys_differ() {
        assert_ne!(generate_device_key(), generate_device_key());
    }

    #[test]
    fn hashing_is_deterministic() {
        let key = "test-device-key";
        assert_eq!(hash_device_key(key), hash_device_key(key));
        assert_eq!(hash_device_key(key).len(), 64);
    }

    #[test]
    fn different_keys_hash_differently() {
        assert_ne!(hash_device_key("key-a"), hash_device_key("key-b"));
    }
}
