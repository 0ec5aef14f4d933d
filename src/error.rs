//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// This enum represents all possible errors that can occur in the application.
/// Each variant maps to a specific HTTP status code and a stable machine-usable
/// error code. Scanning devices have a very limited ability to act on anything
/// beyond "succeeded / retry / stop", so the codes are short and stable rather
/// than descriptive.
///
/// Note that a repeated scan is *not* an error: it is the `Duplicate` variant
/// of [`crate::services::attendance_service::RecordOutcome`] and returns 200.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// This wraps any sqlx::Error using the `#[from]` attribute, which
    /// automatically implements `From<sqlx::Error> for AppError`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Presented device key is missing or matches no registered device.
    ///
    /// The caller is unverified, so this is never logged against a device
    /// identity and never broadcast to dashboards.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid device key")]
    DeviceAuth,

    /// Scanned registration number resolves to no enrolled student.
    ///
    /// A data-entry or wrong-device-for-cohort issue; the operator should
    /// investigate, the device should not retry.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("No student with that registration number")]
    UnknownStudent,

    /// No live session matches the student's cohort right now.
    ///
    /// A timing mismatch; transient, the device may retry.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("No live session for this student's cohort")]
    NoLiveSession,

    /// More than one live session matches the student's cohort.
    ///
    /// An administrative misconfiguration. It is surfaced loudly with its
    /// own code rather than silently resolved by picking a candidate.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Multiple live sessions match this student's cohort")]
    AmbiguousSession,

    /// Requested session does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Session not found")]
    SessionNotFound,

    /// Requested device does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Device not found")]
    DeviceNotFound,

    /// Scan processing exceeded the configured bound.
    ///
    /// The device is expected to retry; retries are safe because recording
    /// attendance is idempotent per (session, student).
    ///
    /// Returns HTTP 503 Service Unavailable.
    #[error("Scan processing timed out")]
    IngestTimeout,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),
}

impl AppError {
    /// Stable machine-usable error code.
    ///
    /// Used both in HTTP error bodies and as the reason string carried by
    /// `scan.error` broadcast events.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "internal_error",
            AppError::DeviceAuth => "invalid_device_key",
            AppError::UnknownStudent => "unknown_student",
            AppError::NoLiveSession => "no_live_session",
            AppError::AmbiguousSession => "ambiguous_session",
            AppError::SessionNotFound => "session_not_found",
            AppError::DeviceNotFound => "device_not_found",
            AppError::IngestTimeout => "ingest_timeout",
            AppError::InvalidRequest(_) => "invalid_request",
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// This implementation allows Axum handlers to return `Result<T, AppError>`
/// and have errors automatically converted to proper HTTP responses.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "success": false,
///   "code": "no_live_session",
///   "message": "No live session for this student's cohort"
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `DeviceAuth` → 401 Unauthorized
/// - `UnknownStudent` / `SessionNotFound` / `DeviceNotFound` → 404 Not Found
/// - `NoLiveSession` / `AmbiguousSession` → 409 Conflict
/// - `InvalidRequest` → 400 Bad Request
/// - `IngestTimeout` → 503 Service Unavailable
/// - `Database` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::DeviceAuth => StatusCode::UNAUTHORIZED,
            AppError::UnknownStudent | AppError::SessionNotFound | AppError::DeviceNotFound => {
                StatusCode::NOT_FOUND
            }
            AppError::NoLiveSession | AppError::AmbiguousSession => StatusCode::CONFLICT,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::IngestTimeout => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            // Hide database details from clients
            AppError::Database(_) => "An internal error occurred".to_string(),
            AppError::InvalidRequest(msg) => msg.clone(),
            other => other.to_string(),
        };

        // Build JSON response body
        let body = Json(json!({
            "success": false,
            "code": self.code(),
            "message": message
        }));

        // Return the response with status code and JSON body
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(AppError::DeviceAuth.code(), "invalid_device_key");
        assert_eq!(AppError::UnknownStudent.code(), "unknown_student");
        assert_eq!(AppError::NoLiveSession.code(), "no_live_session");
        assert_eq!(AppError::AmbiguousSession.code(), "ambiguous_session");
    }

    #[test]
    fn database_errors_hide_details() {
        let response = AppError::Database(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
