//! Scan ingestion HTTP handler.
//!
//! This module implements the one endpoint scanning devices call:
//! - POST /scans/ingest - record one scan
//!
//! Device authentication happens in the middleware before this handler
//! runs; by the time we are here the request carries a [`DeviceContext`].

use axum::{Extension, Json, extract::State};
use chrono::Utc;

use crate::{
    error::AppError,
    middleware::auth::DeviceContext,
    models::attendance::{ScanRequest, ScanResponseData},
    response::ApiResponse,
    services::scan_service,
    state::AppState,
};

/// Ingest one scan.
///
/// # Request
///
/// ```text
/// POST /scans/ingest
/// X-Device-Key: <credential>
/// { "registrationNo": "2019/ICTS/05" }
/// ```
///
/// # Responses
///
/// - `200 { success: true, data: { session, status } }` on a fresh record
/// - `200 { success: true, data: { session, status, duplicate: true } }` when
///   already recorded; the original classification is returned
/// - `401` invalid device key, `404` unknown student, `409` no live /
///   ambiguous session
///
/// # Timeout
///
/// The whole call is bounded by the configured ingest timeout (default
/// 3 s): the scanners are embedded devices with a small retry budget, and
/// retrying is safe because recording is idempotent per (session, student).
pub async fn ingest(
    State(state): State<AppState>,
    Extension(device): Extension<DeviceContext>,
    Json(request): Json<ScanRequest>,
) -> Result<Json<ApiResponse<ScanResponseData>>, AppError> {
    let received_at = Utc::now();

    let success = tokio::time::timeout(
        state.config.ingest_timeout(),
        scan_service::ingest(&state, &device, &request.registration_no, received_at),
    )
    .await
    .map_err(|_| AppError::IngestTimeout)??;

    Ok(Json(ApiResponse::ok(ScanResponseData {
        session: success.session,
        status: success.record.status,
        duplicate: success.duplicate.then_some(true),
    })))
}
