//! Student models and API request/response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a student record from the database.
///
/// # Database Table
///
/// Maps to the `students` table. The registration number (e.g.
/// `2019/ICTS/05`) is the natural key printed on ID cards and read by the
/// scanners; it uniquely resolves to at most one student. The cohort
/// columns (`department`, `academic_year`, `semester`) determine which
/// sessions the student is eligible to attend.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Student {
    /// Unique identifier for this student
    pub id: Uuid,

    /// Globally unique registration number scanned by devices
    pub registration_no: String,

    /// Student's full name
    pub full_name: String,

    /// Department code (e.g. "ICTS")
    pub department: String,

    /// Academic year within the programme
    pub academic_year: i32,

    /// Semester within the academic year
    pub semester: i32,

    /// Timestamp when the student was registered
    pub created_at: DateTime<Utc>,
}

/// Request body for registering a new student.
///
/// # JSON Example
///
/// ```json
/// {
///   "registration_no": "2019/ICTS/05",
///   "full_name": "A. Student",
///   "department": "ICTS",
///   "academic_year": 3,
///   "semester": 1
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateStudentRequest {
    pub registration_no: String,
    pub full_name: String,
    pub department: String,
    pub academic_year: i32,
    pub semester: i32,
}
