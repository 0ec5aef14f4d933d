//! Attendance record models and scan API types.
//!
//! At most one attendance record exists per (session, student) pair.
//! Records are created by the first successful scan and never updated;
//! a later scan for the same pair is a duplicate, not an update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::session::Session;

/// Stored attendance classification.
///
/// Maps to the Postgres enum type `attendance_status`. `absent` is
/// deliberately missing: absence is a projection computed at read time for
/// cohort members with no record, never a stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "attendance_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    /// Checked in within the grace window after session start
    Present,
    /// Checked in after the grace window
    Late,
}

impl AttendanceStatus {
    /// Lowercase name, matching the wire and database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Late => "late",
        }
    }
}

/// Represents an attendance record from the database.
///
/// # Database Table
///
/// Maps to the `attendance_records` table. The UNIQUE constraint on
/// (session_id, student_id) is what guarantees at most one record per pair
/// under concurrent scans.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct AttendanceRecord {
    /// Unique identifier for this record
    pub id: Uuid,

    /// Session the student checked in to
    pub session_id: Uuid,

    /// Student who checked in
    pub student_id: Uuid,

    /// Device that captured the winning scan
    ///
    /// NULL if the device was deleted after the scan.
    pub device_id: Option<Uuid>,

    /// Present or late, classified against the session start time
    pub status: AttendanceStatus,

    /// When the winning scan was received
    pub check_in_at: DateTime<Utc>,

    /// When the record row was created
    pub created_at: DateTime<Utc>,
}

/// One row of a session's attendance listing, joined with student identity.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct AttendanceRow {
    pub student_id: Uuid,
    pub registration_no: String,
    pub full_name: String,
    pub status: AttendanceStatus,
    pub check_in_at: DateTime<Utc>,
}

/// Present/late tallies for one session.
#[derive(Debug, Clone, Copy, sqlx::FromRow, Serialize)]
pub struct AttendanceCounts {
    pub present_count: i64,
    pub late_count: i64,
}

/// Request body sent by a scanner for one scan.
///
/// # JSON Example
///
/// ```json
/// { "registrationNo": "2019/ICTS/05" }
/// ```
///
/// The field is camelCased on the wire because that is what the deployed
/// scanner firmware sends.
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    #[serde(rename = "registrationNo")]
    pub registration_no: String,
}

/// Payload of a successful scan response.
///
/// `duplicate` is only present (and `true`) when the student had already
/// checked in to this session; the record returned is the original one.
#[derive(Debug, Serialize)]
pub struct ScanResponseData {
    pub session: Session,
    pub status: AttendanceStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&AttendanceStatus::Present).unwrap(),
            "\"present\""
        );
        assert_eq!(
            serde_json::to_string(&AttendanceStatus::Late).unwrap(),
            "\"late\""
        );
    }

    #[test]
    fn scan_request_uses_firmware_field_name() {
        let request: ScanRequest =
            serde_json::from_str(r#"{ "registrationNo": "2019/ICTS/05" }"#).unwrap();
        assert_eq!(request.registration_no, "2019/ICTS/05");
    }

    #[test]
    fn duplicate_flag_is_omitted_when_absent() {
        use crate::models::session::SessionStatus;
        use chrono::{NaiveDate, NaiveTime};

        let data = ScanResponseData {
            session: Session {
                id: Uuid::new_v4(),
                course_code: "TICT 2233".to_string(),
                department: "ICTS".to_string(),
                academic_year: 2,
                semester: 1,
                session_date: NaiveDate::from_ymd_opt(2026, 8, 4).unwrap(),
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                room: None,
                status: SessionStatus::Live,
                created_at: Utc::now(),
            },
            status: AttendanceStatus::Present,
            duplicate: None,
        };

        let value = serde_json::to_value(&data).unwrap();
        assert!(value.get("duplicate").is_none());
        assert_eq!(value["status"], "present");
    }
}
