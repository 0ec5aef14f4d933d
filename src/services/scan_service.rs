//! Scan ingestion - the orchestrator behind `POST /scans/ingest`.
//!
//! One call authenticates (done upstream by the middleware), records device
//! liveness, resolves the student, matches the single eligible live
//! session, classifies the check-in, writes the attendance record exactly
//! once, and fans the outcome out to dashboards.
//!
//! Everything before the insert is read-only, and the insert itself is
//! idempotent per (session, student), so a device that times out and
//! retries the same scan is always safe.

use chrono::{DateTime, Utc};

use crate::{
    broadcast::{self, AttendanceUpdatedPayload, ScanErrorPayload, ScanPayload},
    error::AppError,
    middleware::auth::DeviceContext,
    models::{attendance::AttendanceRecord, session::Session, student::Student},
    services::{attendance_service, device_service, session_service},
    state::AppState,
};

/// Successful ingestion result.
///
/// `duplicate` distinguishes a fresh record from a repeat scan; in the
/// repeat case `record` is the original row, so the response reports the
/// first scan's classification, not the retry's timing.
#[derive(Debug)]
pub struct ScanSuccess {
    pub session: Session,
    pub record: AttendanceRecord,
    pub duplicate: bool,
}

/// Ingest one scan from an authenticated device.
///
/// # Algorithm
///
/// 1. Record a liveness heartbeat for the device (side effect only; a
///    rejected scan still proves the device is alive)
/// 2. Resolve the student by registration number
/// 3. Resolve the unique live session for the student's own cohort
/// 4. Classify present/late against the session start and grace window
/// 5. Insert-if-absent the attendance record
/// 6. Broadcast `scan.ingested` or `scan.duplicate`
///
/// Any failure after authentication is also broadcast as a `scan.error`
/// event carrying the stable error code, so operators can tell "not
/// enrolled" from "no session right now" without reading server logs.
pub async fn ingest(
    state: &AppState,
    device: &DeviceContext,
    registration_no: &str,
    received_at: DateTime<Utc>,
) -> Result<ScanSuccess, AppError> {
    match ingest_inner(state, device, registration_no, received_at).await {
        Ok(success) => Ok(success),
        Err(error) => {
            state.broadcaster.publish(
                broadcast::SCAN_ERROR,
                ScanErrorPayload {
                    reason: error.code(),
                    registration_no: registration_no.to_string(),
                    device_name: device.name.clone(),
                },
            );
            Err(error)
        }
    }
}

async fn ingest_inner(
    state: &AppState,
    device: &DeviceContext,
    registration_no: &str,
    received_at: DateTime<Utc>,
) -> Result<ScanSuccess, AppError> {
    // Liveness heartbeat, accepted or rejected scan alike.
    device_service::touch(&state.pool, device.device_id, received_at).await;

    let student = find_student(state, registration_no).await?;

    // Strictly the student's own cohort, never "any live session".
    let session = session_service::find_eligible_live_session(
        &state.pool,
        &student.department,
        student.academic_year,
        student.semester,
    )
    .await?;

    let status = attendance_service::classify(
        session.starts_at(),
        received_at,
        state.config.grace_window(),
    );

    let outcome = attendance_service::record_attendance(
        &state.pool,
        session.id,
        student.id,
        device.device_id,
        status,
        received_at,
    )
    .await?;

    let record = outcome.record().clone();
    let duplicate = outcome.is_duplicate();

    tracing::info!(
        "Scan {}: {} in {} ({}{})",
        device.name,
        student.registration_no,
        session.course_code,
        record.status.as_str(),
        if duplicate { ", duplicate" } else { "" }
    );

    let event_type = if duplicate {
        broadcast::SCAN_DUPLICATE
    } else {
        broadcast::SCAN_INGESTED
    };

    state.broadcaster.publish(
        event_type,
        ScanPayload {
            session_id: session.id,
            course_code: session.course_code.clone(),
            registration_no: student.registration_no.clone(),
            student_name: student.full_name.clone(),
            status: record.status,
            check_in_at: record.check_in_at,
        },
    );

    // Refresh the dashboard tallies for a fresh record. The record is
    // already committed at this point, so a failure here must not turn the
    // scan into an error (the device would retry a scan that succeeded).
    if !duplicate {
        match attendance_service::counts_of(&state.pool, session.id).await {
            Ok(counts) => {
                state.broadcaster.publish(
                    broadcast::ATTENDANCE_UPDATED,
                    AttendanceUpdatedPayload {
                        session_id: session.id,
                        present_count: counts.present_count,
                        late_count: counts.late_count,
                    },
                );
            }
            Err(e) => {
                tracing::warn!("Failed to refresh counts for session {}: {e}", session.id);
            }
        }
    }

    Ok(ScanSuccess {
        session,
        record,
        duplicate,
    })
}

/// Resolve a student by the registration number read from their ID card.
async fn find_student(state: &AppState, registration_no: &str) -> Result<Student, AppError> {
    let student =
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE registration_no = $1")
            .bind(registration_no)
            .fetch_optional(&state.pool)
            .await?
            .ok_or(AppError::UnknownStudent)?;

    Ok(student)
}

// Database-backed scenarios. These exercise the uniqueness constraint and
// the state machine against a real PostgreSQL instance and therefore only
// run when one is available:
//
//   DATABASE_URL=postgres://... cargo test -- --ignored
#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::{
        broadcast::EventBroadcaster,
        config::Config,
        db,
        models::session::{CreateSessionRequest, SessionStatus},
    };
    use chrono::{NaiveDate, TimeZone};
    use uuid::Uuid;

    /// `evaluate` sweeps the whole sessions table, so tests sharing the
    /// database must not run it concurrently with each other.
    static DB_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

    async fn test_state() -> AppState {
        let config: Config = envy::from_iter(vec![(
            "DATABASE_URL".to_string(),
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for db tests"),
        )])
        .unwrap();

        let pool = db::create_pool(&config.database_url).await.unwrap();
        db::run_migrations(&pool).await.unwrap();

        AppState {
            pool,
            broadcaster: EventBroadcaster::new(),
            config,
        }
    }

    /// Each run gets its own cohort so tests never collide with existing
    /// rows or with each other.
    fn unique_cohort() -> String {
        format!("TST{}", &Uuid::new_v4().simple().to_string()[..8])
    }

    async fn create_student(state: &AppState, department: &str, suffix: &str) -> Student {
        sqlx::query_as::<_, Student>(
            r#"
            INSERT INTO students (registration_no, full_name, department, academic_year, semester)
            VALUES ($1, $2, $3, 2, 1)
            RETURNING *
            "#,
        )
        .bind(format!("2019/{department}/{suffix}"))
        .bind(format!("Student {suffix}"))
        .bind(department)
        .fetch_one(&state.pool)
        .await
        .unwrap()
    }

    async fn create_session(state: &AppState, department: &str) -> Session {
        session_service::create_session(
            &state.pool,
            CreateSessionRequest {
                course_code: "TICT 2233".to_string(),
                department: department.to_string(),
                academic_year: 2,
                semester: 1,
                session_date: NaiveDate::from_ymd_opt(2026, 8, 4).unwrap(),
                start_time: chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                room: Some("Hall B".to_string()),
            },
        )
        .await
        .unwrap()
    }

    async fn device_context(state: &AppState) -> DeviceContext {
        let (device, _key) =
            device_service::create_device(&state.pool, "test-scanner".to_string(), None)
                .await
                .unwrap();
        DeviceContext {
            device_id: device.id,
            name: device.name,
        }
    }

    fn at(h: u32, m: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 4, h, m, 0).unwrap()
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance (DATABASE_URL)"]
    async fn end_to_end_session_scenario() {
        let _guard = DB_LOCK.lock().await;
        let state = test_state().await;
        let dept = unique_cohort();
        let session = create_session(&state, &dept).await;
        let on_time = create_student(&state, &dept, "01").await;
        let latecomer = create_student(&state, &dept, "02").await;
        let device = device_context(&state).await;

        // 09:05 tick takes the session live.
        let applied = session_service::evaluate(&state.pool, &state.broadcaster, at(9, 5))
            .await
            .unwrap();
        assert!(applied.contains(&(session.id, SessionStatus::Live)));

        // 09:05 scan, inside the 10-minute grace window.
        let first = ingest(&state, &device, &on_time.registration_no, at(9, 5))
            .await
            .unwrap();
        assert!(!first.duplicate);
        assert_eq!(first.record.status, crate::models::attendance::AttendanceStatus::Present);

        // 09:07 repeat scan resolves to the original record.
        let repeat = ingest(&state, &device, &on_time.registration_no, at(9, 7))
            .await
            .unwrap();
        assert!(repeat.duplicate);
        assert_eq!(repeat.record.id, first.record.id);

        // 09:25 scan by a different eligible student is late.
        let second = ingest(&state, &device, &latecomer.registration_no, at(9, 25))
            .await
            .unwrap();
        assert!(!second.duplicate);
        assert_eq!(second.record.status, crate::models::attendance::AttendanceStatus::Late);

        // 10:05 tick closes the session; scans now fail cleanly.
        session_service::evaluate(&state.pool, &state.broadcaster, at(10, 5))
            .await
            .unwrap();
        let rejected = ingest(&state, &device, &on_time.registration_no, at(10, 5)).await;
        assert!(matches!(rejected, Err(AppError::NoLiveSession)));
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance (DATABASE_URL)"]
    async fn concurrent_scans_create_exactly_one_record() {
        let _guard = DB_LOCK.lock().await;
        let state = test_state().await;
        let dept = unique_cohort();
        create_session(&state, &dept).await;
        let student = create_student(&state, &dept, "01").await;
        let device = device_context(&state).await;

        session_service::evaluate(&state.pool, &state.broadcaster, at(9, 5))
            .await
            .unwrap();

        // Two doors, four near-simultaneous scans of the same card.
        let results = futures::future::join_all((0..4).map(|_| {
            let state = state.clone();
            let device = DeviceContext {
                device_id: device.device_id,
                name: device.name.clone(),
            };
            let registration_no = student.registration_no.clone();
            async move { ingest(&state, &device, &registration_no, at(9, 5)).await }
        }))
        .await;

        let created = results
            .iter()
            .filter(|r| matches!(r, Ok(s) if !s.duplicate))
            .count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Ok(s) if s.duplicate))
            .count();

        assert_eq!(created, 1);
        assert_eq!(duplicates, 3);
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance (DATABASE_URL)"]
    async fn scans_never_land_in_another_cohorts_session() {
        let _guard = DB_LOCK.lock().await;
        let state = test_state().await;
        let live_dept = unique_cohort();
        let other_dept = unique_cohort();

        create_session(&state, &live_dept).await;
        let outsider = create_student(&state, &other_dept, "05").await;
        let device = device_context(&state).await;

        session_service::evaluate(&state.pool, &state.broadcaster, at(9, 5))
            .await
            .unwrap();

        // A BIO-cohort card scanned while only the ICTS session is live must
        // be rejected, never recorded against the wrong session.
        let rejected = ingest(&state, &device, &outsider.registration_no, at(9, 5)).await;
        assert!(matches!(rejected, Err(AppError::NoLiveSession)));
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance (DATABASE_URL)"]
    async fn evaluate_is_idempotent_for_the_same_instant() {
        let _guard = DB_LOCK.lock().await;
        let state = test_state().await;
        let dept = unique_cohort();
        let session = create_session(&state, &dept).await;

        let mut events = state.broadcaster.subscribe();

        let first = session_service::evaluate(&state.pool, &state.broadcaster, at(9, 5))
            .await
            .unwrap();
        assert!(first.contains(&(session.id, SessionStatus::Live)));

        let second = session_service::evaluate(&state.pool, &state.broadcaster, at(9, 5))
            .await
            .unwrap();
        assert!(
            !second.iter().any(|(id, _)| *id == session.id),
            "second evaluation must not re-apply the transition"
        );

        // Exactly one session.status event for this session was broadcast.
        let mut seen = 0;
        while let Ok(text) = events.try_recv() {
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            if value["type"] == "session.status"
                && value["payload"]["session_id"] == serde_json::json!(session.id)
            {
                seen += 1;
            }
        }
        assert_eq!(seen, 1);
    }
}
