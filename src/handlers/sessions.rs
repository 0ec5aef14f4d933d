//! Session HTTP handlers.
//!
//! This module implements session lifecycle and read endpoints:
//! - POST /api/v1/sessions - create a session (starts `scheduled`)
//! - GET /api/v1/sessions - list sessions
//! - GET /api/v1/sessions/:id - session detail
//! - PUT /api/v1/sessions/:id/status - manual lifecycle override
//! - GET /api/v1/sessions/:id/attendance - records plus tallies
//! - GET /api/v1/sessions/:id/absentees - virtual absents, computed on read
//!
//! These are the read/write contracts the admin dashboard consumes. They
//! are deliberately cache-free; any caching belongs to the presentation
//! layer.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        attendance::{AttendanceCounts, AttendanceRow},
        session::{CreateSessionRequest, ForceStatusRequest, Session},
        student::Student,
    },
    response::ApiResponse,
    services::{attendance_service, session_service},
    state::AppState,
};

/// Create a new session.
///
/// The session starts in the `scheduled` state; the background scheduler
/// takes it live and closes it as its window passes. Windows where
/// `start_time >= end_time` are rejected; overnight sessions are not
/// modeled.
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<ApiResponse<Session>>, AppError> {
    let session = session_service::create_session(&state.pool, request).await?;
    Ok(Json(ApiResponse::ok(session)))
}

/// List all sessions, most recent meeting first.
pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Session>>>, AppError> {
    let sessions = session_service::list_sessions(&state.pool).await?;
    Ok(Json(ApiResponse::ok(sessions)))
}

/// Get a session by ID.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Session>>, AppError> {
    let session = session_service::get_session(&state.pool, session_id).await?;
    Ok(Json(ApiResponse::ok(session)))
}

/// Manually override a session's lifecycle state.
///
/// Only the forward arrows are allowed (`scheduled → live`,
/// `live → closed`). The override pre-empts the scheduler but is never
/// reverted by it. The acting operator is carried into the broadcast
/// `session.status` event.
pub async fn force_status(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ForceStatusRequest>,
) -> Result<Json<ApiResponse<Session>>, AppError> {
    let session = session_service::force_status(
        &state.pool,
        &state.broadcaster,
        session_id,
        request.status,
        request.actor,
    )
    .await?;

    Ok(Json(ApiResponse::ok(session)))
}

/// A session's attendance listing plus its tallies.
#[derive(Debug, Serialize)]
pub struct SessionAttendance {
    pub records: Vec<AttendanceRow>,
    pub counts: AttendanceCounts,
}

/// List a session's attendance records with present/late counts.
pub async fn get_attendance(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<SessionAttendance>>, AppError> {
    // 404 for unknown sessions rather than an empty listing
    session_service::get_session(&state.pool, session_id).await?;

    let records = attendance_service::attendance_of(&state.pool, session_id).await?;
    let counts = attendance_service::counts_of(&state.pool, session_id).await?;

    Ok(Json(ApiResponse::ok(SessionAttendance { records, counts })))
}

/// List the session's virtual absents.
///
/// Cohort members with no attendance record at the time of the query.
/// Nothing is materialized: the same request during a live session shows
/// who has not arrived *yet*.
pub async fn get_absentees(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Student>>>, AppError> {
    let session = session_service::get_session(&state.pool, session_id).await?;
    let absentees = attendance_service::absentees_of(&state.pool, &session).await?;

    Ok(Json(ApiResponse::ok(absentees)))
}
