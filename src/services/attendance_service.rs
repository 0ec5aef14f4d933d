//! Attendance ledger - classification and the at-most-one-record guarantee.
//!
//! The linchpin operation is [`record_attendance`]: a single atomic
//! insert-if-absent against the UNIQUE (session_id, student_id) constraint.
//! Correctness under concurrent scans is delegated entirely to the database,
//! with no application-level locking, so two devices scanning the same
//! student at two doors agree on exactly one winner even if a future
//! deployment runs more than one server process.

use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        attendance::{AttendanceCounts, AttendanceRecord, AttendanceRow, AttendanceStatus},
        session::Session,
        student::Student,
    },
};

/// Outcome of recording a scan.
///
/// A repeat scan is a normal, expected outcome. It is modeled as a
/// variant, not an error, and callers pick the matching broadcast event
/// (`scan.ingested` vs `scan.duplicate`) from it.
#[derive(Debug)]
pub enum RecordOutcome {
    /// First scan for this (session, student) pair; a row was written.
    Created(AttendanceRecord),
    /// The pair already had a record; the original row is returned.
    Duplicate(AttendanceRecord),
}

impl RecordOutcome {
    /// The attendance record, whichever way the scan resolved.
    pub fn record(&self) -> &AttendanceRecord {
        match self {
            RecordOutcome::Created(record) | RecordOutcome::Duplicate(record) => record,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, RecordOutcome::Duplicate(_))
    }
}

/// Classify a check-in against the session start and grace window.
///
/// `present` iff `check_in_at <= start + grace_window`; everything later is
/// `late`. Both boundary instants classify as `present`. Scans before the
/// start (possible when an operator opens a session early) are `present`.
pub fn classify(
    session_start: NaiveDateTime,
    check_in_at: DateTime<Utc>,
    grace_window: chrono::Duration,
) -> AttendanceStatus {
    if check_in_at.naive_utc() <= session_start + grace_window {
        AttendanceStatus::Present
    } else {
        AttendanceStatus::Late
    }
}

/// Record attendance for a (session, student) pair, exactly once.
///
/// # Process
///
/// 1. Attempt an insert that yields nothing on conflict with the
///    (session_id, student_id) uniqueness constraint
/// 2. If the insert won, return `Created` with the new row
/// 3. Otherwise fetch and return the original row as `Duplicate`
///
/// Under N concurrent calls for the same pair the database serializes the
/// inserts: exactly one caller observes `Created`, every other caller
/// observes `Duplicate` with the winner's row. Rows are never updated, so
/// a duplicate scan cannot change an earlier classification.
pub async fn record_attendance(
    pool: &DbPool,
    session_id: Uuid,
    student_id: Uuid,
    device_id: Uuid,
    status: AttendanceStatus,
    check_in_at: DateTime<Utc>,
) -> Result<RecordOutcome, AppError> {
    let inserted = sqlx::query_as::<_, AttendanceRecord>(
        r#"
        INSERT INTO attendance_records (session_id, student_id, device_id, status, check_in_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (session_id, student_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(session_id)
    .bind(student_id)
    .bind(device_id)
    .bind(status)
    .bind(check_in_at)
    .fetch_optional(pool)
    .await?;

    if let Some(record) = inserted {
        return Ok(RecordOutcome::Created(record));
    }

    // Conflict: the pair already has its one record. Return the original.
    let existing = sqlx::query_as::<_, AttendanceRecord>(
        "SELECT * FROM attendance_records WHERE session_id = $1 AND student_id = $2",
    )
    .bind(session_id)
    .bind(student_id)
    .fetch_one(pool)
    .await?;

    Ok(RecordOutcome::Duplicate(existing))
}

/// List a session's attendance records joined with student identity.
pub async fn attendance_of(
    pool: &DbPool,
    session_id: Uuid,
) -> Result<Vec<AttendanceRow>, AppError> {
    let rows = sqlx::query_as::<_, AttendanceRow>(
        r#"
        SELECT ar.student_id, st.registration_no, st.full_name, ar.status, ar.check_in_at
        FROM attendance_records ar
        JOIN students st ON st.id = ar.student_id
        WHERE ar.session_id = $1
        ORDER BY ar.check_in_at
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Present/late tallies for a session.
pub async fn counts_of(pool: &DbPool, session_id: Uuid) -> Result<AttendanceCounts, AppError> {
    let counts = sqlx::query_as::<_, AttendanceCounts>(
        r#"
        SELECT
            COUNT(*) FILTER (WHERE status = 'present') AS present_count,
            COUNT(*) FILTER (WHERE status = 'late') AS late_count
        FROM attendance_records
        WHERE session_id = $1
        "#,
    )
    .bind(session_id)
    .fetch_one(pool)
    .await?;

    Ok(counts)
}

/// Students in the session's cohort with no attendance record.
///
/// Absence is computed on read with an anti-join; there is no row per
/// absent student, and nothing is materialized at session close. This
/// avoids a combinatorial write (every session x every student) and means
/// the projection is always current.
pub async fn absentees_of(pool: &DbPool, session: &Session) -> Result<Vec<Student>, AppError> {
    let students = sqlx::query_as::<_, Student>(
        r#"
        SELECT st.* FROM students st
        WHERE st.department = $1
          AND st.academic_year = $2
          AND st.semester = $3
          AND NOT EXISTS (
              SELECT 1 FROM attendance_records ar
              WHERE ar.session_id = $4 AND ar.student_id = st.id
          )
        ORDER BY st.registration_no
        "#,
    )
    .bind(&session.department)
    .bind(session.academic_year)
    .bind(session.semester)
    .bind(session.id)
    .fetch_all(pool)
    .await?;

    Ok(students)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 4)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 4, h, m, s).unwrap()
    }

    #[test]
    fn check_in_at_start_is_present() {
        let grace = chrono::Duration::minutes(10);
        assert_eq!(
            classify(start(), at(9, 0, 0), grace),
            AttendanceStatus::Present
        );
    }

    #[test]
    fn check_in_at_grace_boundary_is_present() {
        let grace = chrono::Duration::minutes(10);
        assert_eq!(
            classify(start(), at(9, 10, 0), grace),
            AttendanceStatus::Present
        );
    }

    #[test]
    fn check_in_one_second_past_grace_is_late() {
        let grace = chrono::Duration::minutes(10);
        assert_eq!(classify(start(), at(9, 10, 1), grace), AttendanceStatus::Late);
    }

    #[test]
    fn check_in_before_start_is_present() {
        let grace = chrono::Duration::minutes(10);
        assert_eq!(
            classify(start(), at(8, 55, 0), grace),
            AttendanceStatus::Present
        );
    }

    #[test]
    fn zero_grace_window_only_admits_the_start_instant() {
        let grace = chrono::Duration::zero();
        assert_eq!(
            classify(start(), at(9, 0, 0), grace),
            AttendanceStatus::Present
        );
        assert_eq!(classify(start(), at(9, 0, 1), grace), AttendanceStatus::Late);
    }
}
