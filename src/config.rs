//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `GRACE_WINDOW_MINUTES` (optional): minutes after session start during
///   which a scan still classifies as `present`, defaults to 10
/// - `SCHEDULER_TICK_SECONDS` (optional): session lifecycle tick interval,
///   defaults to 15
/// - `DEVICE_ONLINE_THRESHOLD_SECONDS` (optional): how recently a device
///   must have been seen to report as online, defaults to 60
/// - `INGEST_TIMEOUT_SECONDS` (optional): upper bound on one scan's
///   processing time, defaults to 3
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_grace_window_minutes")]
    pub grace_window_minutes: u32,

    #[serde(default = "default_scheduler_tick_seconds")]
    pub scheduler_tick_seconds: u64,

    #[serde(default = "default_device_online_threshold_seconds")]
    pub device_online_threshold_seconds: u32,

    #[serde(default = "default_ingest_timeout_seconds")]
    pub ingest_timeout_seconds: u64,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_grace_window_minutes() -> u32 {
    10
}

fn default_scheduler_tick_seconds() -> u64 {
    15
}

fn default_device_online_threshold_seconds() -> u32 {
    60
}

fn default_ingest_timeout_seconds() -> u64 {
    3
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Parse environment variables into Config struct
        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }

    /// Grace window as a chrono duration, for check-in classification.
    pub fn grace_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.grace_window_minutes))
    }

    /// Online threshold as a chrono duration, for the device status projection.
    pub fn device_online_threshold(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.device_online_threshold_seconds))
    }

    /// Scheduler tick interval as a std duration, for `tokio::time::interval`.
    pub fn scheduler_tick(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.scheduler_tick_seconds)
    }

    /// Ingest processing bound as a std duration, for `tokio::time::timeout`.
    pub fn ingest_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.ingest_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config: Config = envy::from_iter(vec![(
            "DATABASE_URL".to_string(),
            "postgres://localhost/attendance".to_string(),
        )])
        .expect("config should deserialize");

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.grace_window_minutes, 10);
        assert_eq!(config.scheduler_tick_seconds, 15);
        assert_eq!(config.device_online_threshold_seconds, 60);
        assert_eq!(config.ingest_timeout_seconds, 3);
    }

    #[test]
    fn durations_reflect_configured_values() {
        let config: Config = envy::from_iter(vec![
            (
                "DATABASE_URL".to_string(),
                "postgres://localhost/attendance".to_string(),
            ),
            ("GRACE_WINDOW_MINUTES".to_string(), "5".to_string()),
            ("SCHEDULER_TICK_SECONDS".to_string(), "30".to_string()),
        ])
        .expect("config should deserialize");

        assert_eq!(config.grace_window(), chrono::Duration::minutes(5));
        assert_eq!(config.scheduler_tick(), std::time::Duration::from_secs(30));
    }
}
