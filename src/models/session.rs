//! Class session models and API request/response types.
//!
//! A session is one scheduled class meeting. Its lifecycle is a state
//! machine driven by wall-clock time: `scheduled → live → closed`, with
//! manual operator overrides along the same arrows. Only `live` sessions
//! accept scans.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a session.
///
/// Maps to the Postgres enum type `session_status`. A session is in exactly
/// one state at any time; `closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "session_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Created, waiting for its start time
    Scheduled,
    /// Currently accepting scans
    Live,
    /// Past its end time (or manually closed); terminal
    Closed,
}

impl SessionStatus {
    /// Lowercase name, matching the wire and database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Live => "live",
            SessionStatus::Closed => "closed",
        }
    }
}

/// Represents a session record from the database.
///
/// # Database Table
///
/// Maps to the `sessions` table. The cohort columns (`department`,
/// `academic_year`, `semester`) define which students are eligible; the
/// date and time columns define the wall-clock window the scheduler
/// evaluates. `start_time < end_time` is enforced at creation and by a
/// CHECK constraint; sessions never span midnight.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Session {
    /// Unique identifier for this session
    pub id: Uuid,

    /// Course this meeting belongs to (e.g. "TICT 2233")
    pub course_code: String,

    /// Department of the eligible cohort
    pub department: String,

    /// Academic year of the eligible cohort
    pub academic_year: i32,

    /// Semester of the eligible cohort
    pub semester: i32,

    /// Calendar date of the meeting
    pub session_date: NaiveDate,

    /// Wall-clock start of the meeting (UTC)
    pub start_time: NaiveTime,

    /// Wall-clock end of the meeting (UTC)
    pub end_time: NaiveTime,

    /// Room the meeting takes place in
    pub room: Option<String>,

    /// Current lifecycle state
    pub status: SessionStatus,

    /// Timestamp when the session was created
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Session {
    /// Instant the session starts, as a naive UTC timestamp.
    ///
    /// Classification compares check-ins against this; the end boundary is
    /// only ever evaluated inside the scheduler's SQL.
    pub fn starts_at(&self) -> NaiveDateTime {
        self.session_date.and_time(self.start_time)
    }
}

/// Request body for creating a new session.
///
/// # JSON Example
///
/// ```json
/// {
///   "course_code": "TICT 2233",
///   "department": "ICTS",
///   "academic_year": 2,
///   "semester": 1,
///   "session_date": "2026-08-04",
///   "start_time": "09:00:00",
///   "end_time": "10:00:00",
///   "room": "Hall B"
/// }
/// ```
///
/// # Validation
///
/// - `start_time` must be strictly before `end_time` on the same date.
///   Overnight sessions are rejected rather than silently rolled over to
///   the next day.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub course_code: String,
    pub department: String,
    pub academic_year: i32,
    pub semester: i32,
    pub session_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room: Option<String>,
}

/// Request body for a manual status override.
///
/// # JSON Example
///
/// ```json
/// { "status": "live", "actor": "ops@faculty" }
/// ```
#[derive(Debug, Deserialize)]
pub struct ForceStatusRequest {
    /// Target state; only the forward arrows of the state machine are allowed
    pub status: SessionStatus,

    /// Who triggered the override, carried into the `session.status` event
    pub actor: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Scheduled).unwrap(),
            "\"scheduled\""
        );
        assert_eq!(
            serde_json::to_string(&SessionStatus::Live).unwrap(),
            "\"live\""
        );
        assert_eq!(
            serde_json::to_string(&SessionStatus::Closed).unwrap(),
            "\"closed\""
        );
    }

    #[test]
    fn session_window_combines_date_and_time() {
        let session = Session {
            id: Uuid::new_v4(),
            course_code: "TICT 2233".to_string(),
            department: "ICTS".to_string(),
            academic_year: 2,
            semester: 1,
            session_date: NaiveDate::from_ymd_opt(2026, 8, 4).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            room: None,
            status: SessionStatus::Scheduled,
            created_at: chrono::Utc::now(),
        };

        assert_eq!(
            session.starts_at(),
            NaiveDate::from_ymd_opt(2026, 8, 4)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap()
        );
    }
}
