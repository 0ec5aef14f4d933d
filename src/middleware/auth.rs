//! Device key authentication middleware.
//!
//! This middleware intercepts every scan request to:
//! 1. Extract the device key from the `X-Device-Key` header
//! 2. Hash it and verify it against the device registry
//! 3. Inject the device's identity into the request
//! 4. Reject unauthenticated requests with HTTP 401
//!
//! An unauthenticated caller is untrusted: the rejection is not logged
//! against any device identity (there is none to trust) and nothing is
//! broadcast to dashboards.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{error::AppError, services::device_service, state::AppState};

/// Header carrying the device credential.
pub const DEVICE_KEY_HEADER: &str = "X-Device-Key";

/// Identity of the authenticated scanner, attached to the request.
///
/// This struct is inserted into the request's extension map and extracted
/// by the scan handler to know which device captured the scan.
#[derive(Debug, Clone)]
pub struct DeviceContext {
    /// ID of the authenticated device
    pub device_id: Uuid,

    /// Device name, carried into broadcast events
    pub name: String,
}

/// Device key authentication middleware function.
///
/// # Flow
///
/// 1. Extract the `X-Device-Key` header
/// 2. Authenticate it against stored credential hashes (constant-time
///    digest comparison in the device registry)
/// 3. If valid: inject [`DeviceContext`], call the next handler
/// 4. If not: return 401 Unauthorized
///
/// # Headers
///
/// Expected header format:
/// ```text
/// X-Device-Key: 4f2a...c9
/// ```
pub async fn device_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let presented_key = request
        .headers()
        .get(DEVICE_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::DeviceAuth)?;

    let device = device_service::authenticate(&state.pool, presented_key).await?;

    request.extensions_mut().insert(DeviceContext {
        device_id: device.id,
        name: device.name,
    });

    Ok(next.run(request).await)
}
