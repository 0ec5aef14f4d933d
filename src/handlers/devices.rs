//! Device registry HTTP handlers.
//!
//! This module implements the administrative device endpoints:
//! - POST /api/v1/devices - register a device, returns its key once
//! - GET /api/v1/devices - list devices with derived online status
//! - POST /api/v1/devices/:id/rotate-key - atomic credential rotation

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::device::{CreateDeviceRequest, DeviceKeyResponse, DeviceResponse},
    response::ApiResponse,
    services::device_service,
    state::AppState,
};

/// Register a new scanner device.
///
/// # Response
///
/// Includes `device_key`, the plaintext credential the device must send in
/// `X-Device-Key`. This is the only time it is ever shown; only its hash
/// is stored.
pub async fn create_device(
    State(state): State<AppState>,
    Json(request): Json<CreateDeviceRequest>,
) -> Result<Json<ApiResponse<DeviceKeyResponse>>, AppError> {
    let (device, device_key) =
        device_service::create_device(&state.pool, request.name, request.location).await?;

    Ok(Json(ApiResponse::ok(DeviceKeyResponse {
        id: device.id,
        name: device.name,
        device_key,
    })))
}

/// List all devices.
///
/// Each device carries its derived status: `online` iff it was seen within
/// the configured threshold of the request time. The status is computed
/// here, on read, and never stored.
pub async fn list_devices(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<DeviceResponse>>>, AppError> {
    let now = Utc::now();
    let threshold = state.config.device_online_threshold();

    let devices = device_service::list_devices(&state.pool)
        .await?
        .into_iter()
        .map(|device| DeviceResponse::project(device, now, threshold))
        .collect();

    Ok(Json(ApiResponse::ok(devices)))
}

/// Rotate a device's key.
///
/// The old key stops authenticating atomically with the new one taking
/// effect: the hash is replaced in a single update, so no request can
/// observe both (or neither) being valid. Returns the new plaintext key
/// exactly once.
pub async fn rotate_key(
    State(state): State<AppState>,
    Path(device_id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeviceKeyResponse>>, AppError> {
    let device = device_service::get_device(&state.pool, device_id).await?;
    let device_key = device_service::rotate_key(&state.pool, device_id).await?;

    Ok(Json(ApiResponse::ok(DeviceKeyResponse {
        id: device.id,
        name: device.name,
        device_key,
    })))
}
