//! Session store - the live/closed state machine and eligible-session lookup.
//!
//! Session liveness is time-driven state, not something a client catches up
//! on when it happens to look: the background scheduler task calls
//! [`evaluate`] on a fixed tick and applies due transitions whether or not
//! any dashboard is open. Only `live` sessions accept scans, so the
//! transition into `live` must never depend on a request arriving.
//!
//! # State Machine
//!
//! ```text
//! scheduled --(now >= start)--> live --(now > end)--> closed
//! scheduled --(operator)-----> live
//! live      --(operator)-----> closed
//! ```
//!
//! `closed` is terminal. A session whose whole window elapsed while it was
//! still `scheduled` passes through `live` and on to `closed` within a
//! single evaluation. The `live` state gates scan eligibility and is never
//! skipped. Operator overrides pre-empt the scheduler but are not fought by
//! it: the clock-driven rules only fire forward, so a manually-closed
//! session stays closed and a manually-opened one is still closed once its
//! end time passes.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    broadcast::{self, EventBroadcaster, SessionStatusPayload},
    db::DbPool,
    error::AppError,
    models::session::{CreateSessionRequest, Session, SessionStatus},
};

/// Whether an operator may force a session from `current` to `requested`.
///
/// Only the forward arrows of the state machine are overridable. In
/// particular nothing ever leaves `closed`, and a session cannot be pushed
/// backwards to `scheduled`.
pub fn override_allowed(current: SessionStatus, requested: SessionStatus) -> bool {
    matches!(
        (current, requested),
        (SessionStatus::Scheduled, SessionStatus::Live)
            | (SessionStatus::Live, SessionStatus::Closed)
    )
}

/// Create a session in the `scheduled` state.
///
/// # Validation
///
/// Rejects windows where `start_time >= end_time`. Sessions never span
/// midnight in this model; an overnight meeting must be entered as two
/// sessions rather than silently rolling over to the next day.
pub async fn create_session(
    pool: &DbPool,
    request: CreateSessionRequest,
) -> Result<Session, AppError> {
    if request.start_time >= request.end_time {
        return Err(AppError::InvalidRequest(
            "start_time must be before end_time on the same date".to_string(),
        ));
    }

    let session = sqlx::query_as::<_, Session>(
        r#"
        INSERT INTO sessions
            (course_code, department, academic_year, semester,
             session_date, start_time, end_time, room)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(request.course_code)
    .bind(request.department)
    .bind(request.academic_year)
    .bind(request.semester)
    .bind(request.session_date)
    .bind(request.start_time)
    .bind(request.end_time)
    .bind(request.room)
    .fetch_one(pool)
    .await?;

    Ok(session)
}

/// List all sessions, most recent meeting first.
pub async fn list_sessions(pool: &DbPool) -> Result<Vec<Session>, AppError> {
    let sessions = sqlx::query_as::<_, Session>(
        "SELECT * FROM sessions ORDER BY session_date DESC, start_time DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(sessions)
}

/// Get a session by ID.
pub async fn get_session(pool: &DbPool, session_id: Uuid) -> Result<Session, AppError> {
    let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1")
        .bind(session_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::SessionNotFound)?;

    Ok(session)
}

/// Find the unique live session a student's cohort is eligible for.
///
/// The lookup filters strictly on the *student's own* cohort, never "any
/// currently live session". That is what prevents a student from cohort A
/// being recorded into cohort B's meeting.
///
/// # Errors
///
/// - `NoLiveSession`: nothing live for this cohort right now
/// - `AmbiguousSession`: more than one live session matches; this is an
///   administrative misconfiguration and is surfaced, never resolved by
///   silently picking a candidate
pub async fn find_eligible_live_session(
    pool: &DbPool,
    department: &str,
    academic_year: i32,
    semester: i32,
) -> Result<Session, AppError> {
    // LIMIT 2 is enough to distinguish "unique" from "ambiguous"
    let mut sessions = sqlx::query_as::<_, Session>(
        r#"
        SELECT * FROM sessions
        WHERE status = 'live'
          AND department = $1
          AND academic_year = $2
          AND semester = $3
        LIMIT 2
        "#,
    )
    .bind(department)
    .bind(academic_year)
    .bind(semester)
    .fetch_all(pool)
    .await?;

    match sessions.len() {
        0 => Err(AppError::NoLiveSession),
        1 => Ok(sessions.remove(0)),
        _ => Err(AppError::AmbiguousSession),
    }
}

/// Force a session into a new state by operator action.
///
/// The update is guarded on the state the operator saw, so a scheduler tick
/// racing this call cannot be silently overwritten; if the state moved
/// underneath the operator the override is rejected and must be re-issued.
/// The applied transition is broadcast as a `session.status` event carrying
/// the acting operator.
pub async fn force_status(
    pool: &DbPool,
    broadcaster: &EventBroadcaster,
    session_id: Uuid,
    requested: SessionStatus,
    actor: String,
) -> Result<Session, AppError> {
    let current = get_session(pool, session_id).await?;

    if !override_allowed(current.status, requested) {
        return Err(AppError::InvalidRequest(format!(
            "cannot force session from '{}' to '{}'",
            current.status.as_str(),
            requested.as_str()
        )));
    }

    let session = sqlx::query_as::<_, Session>(
        "UPDATE sessions SET status = $1 WHERE id = $2 AND status = $3 RETURNING *",
    )
    .bind(requested)
    .bind(session_id)
    .bind(current.status)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| {
        AppError::InvalidRequest("session status changed concurrently; retry".to_string())
    })?;

    tracing::info!(
        "Session {} forced {} -> {} by {}",
        session_id,
        current.status.as_str(),
        requested.as_str(),
        actor
    );

    broadcaster.publish(
        broadcast::SESSION_STATUS,
        SessionStatusPayload {
            session_id: session.id,
            course_code: session.course_code.clone(),
            status: session.status,
            changed_by: actor,
        },
    );

    Ok(session)
}

/// Apply all clock-due lifecycle transitions.
///
/// Called by the scheduler task on every tick (and safe to call on demand).
/// Promotions run before closures so a session whose whole window has
/// already elapsed still passes through `live`; both transitions are
/// applied, and broadcast, in order within one call.
///
/// Each due session is transitioned by its own status-guarded UPDATE:
/// - calling `evaluate` twice with the same `now` applies nothing the
///   second time and emits no duplicate events, and
/// - one session's failure is logged and skipped without blocking the
///   rest of the tick.
///
/// Returns the transitions applied, in the order they committed.
pub async fn evaluate(
    pool: &DbPool,
    broadcaster: &EventBroadcaster,
    now: DateTime<Utc>,
) -> Result<Vec<(Uuid, SessionStatus)>, AppError> {
    let wall_clock = now.naive_utc();
    let mut applied = Vec::new();

    // Pass 1: scheduled sessions whose start time has passed go live.
    let due_live = sqlx::query_as::<_, Session>(
        r#"
        SELECT * FROM sessions
        WHERE status = 'scheduled'
          AND (session_date + start_time) <= $1
        ORDER BY session_date, start_time
        "#,
    )
    .bind(wall_clock)
    .fetch_all(pool)
    .await?;

    for session in due_live {
        apply_transition(pool, broadcaster, &session, SessionStatus::Live, &mut applied).await;
    }

    // Pass 2: live sessions (including ones promoted just above) whose end
    // time has passed are closed.
    let due_closed = sqlx::query_as::<_, Session>(
        r#"
        SELECT * FROM sessions
        WHERE status = 'live'
          AND (session_date + end_time) < $1
        ORDER BY session_date, end_time
        "#,
    )
    .bind(wall_clock)
    .fetch_all(pool)
    .await?;

    for session in due_closed {
        apply_transition(
            pool,
            broadcaster,
            &session,
            SessionStatus::Closed,
            &mut applied,
        )
        .await;
    }

    Ok(applied)
}

/// Transition one session, guarded on the state it was selected in.
///
/// The guard makes concurrent evaluations (or a racing operator override)
/// harmless: whoever loses the race simply affects zero rows and emits
/// nothing. Errors are logged and swallowed so the remaining sessions in
/// the tick are still processed.
async fn apply_transition(
    pool: &DbPool,
    broadcaster: &EventBroadcaster,
    session: &Session,
    target: SessionStatus,
    applied: &mut Vec<(Uuid, SessionStatus)>,
) {
    let result = sqlx::query_as::<_, Session>(
        "UPDATE sessions SET status = $1 WHERE id = $2 AND status = $3 RETURNING *",
    )
    .bind(target)
    .bind(session.id)
    .bind(session.status)
    .fetch_optional(pool)
    .await;

    match result {
        Ok(Some(updated)) => {
            tracing::info!(
                "Session {} ({}) {} -> {}",
                updated.id,
                updated.course_code,
                session.status.as_str(),
                target.as_str()
            );

            broadcaster.publish(
                broadcast::SESSION_STATUS,
                SessionStatusPayload {
                    session_id: updated.id,
                    course_code: updated.course_code.clone(),
                    status: updated.status,
                    changed_by: "scheduler".to_string(),
                },
            );

            applied.push((updated.id, target));
        }
        // Lost a race with another evaluation or an override; nothing to do.
        Ok(None) => {}
        Err(e) => {
            tracing::error!(
                "Failed to transition session {} to {}: {e}",
                session.id,
                target.as_str()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_may_open_a_scheduled_session() {
        assert!(override_allowed(
            SessionStatus::Scheduled,
            SessionStatus::Live
        ));
    }

    #[test]
    fn operator_may_close_a_live_session() {
        assert!(override_allowed(SessionStatus::Live, SessionStatus::Closed));
    }

    #[test]
    fn closed_is_terminal() {
        assert!(!override_allowed(
            SessionStatus::Closed,
            SessionStatus::Live
        ));
        assert!(!override_allowed(
            SessionStatus::Closed,
            SessionStatus::Scheduled
        ));
    }

    #[test]
    fn no_backwards_or_skipping_overrides() {
        assert!(!override_allowed(
            SessionStatus::Live,
            SessionStatus::Scheduled
        ));
        assert!(!override_allowed(
            SessionStatus::Scheduled,
            SessionStatus::Closed
        ));
    }

    #[test]
    fn same_state_overrides_are_rejected() {
        assert!(!override_allowed(SessionStatus::Live, SessionStatus::Live));
        assert!(!override_allowed(
            SessionStatus::Scheduled,
            SessionStatus::Scheduled
        ));
        assert!(!override_allowed(
            SessionStatus::Closed,
            SessionStatus::Closed
        ));
    }
}
