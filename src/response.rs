//! Success response envelope.
//!
//! Scanning devices and the dashboard both consume the same envelope:
//! successful responses wrap their payload in `{ "success": true, "data": … }`,
//! mirroring the error shape produced by [`crate::error::AppError`].

use serde::Serialize;

/// Wrapper for all successful JSON responses.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Wrap a payload in the success envelope.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_shape() {
        let json = serde_json::to_value(ApiResponse::ok(serde_json::json!({"n": 1}))).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["n"], 1);
    }
}
