//! Student registration HTTP handlers.
//!
//! This module implements the minimal student surface the engine needs to
//! resolve scans:
//! - POST /api/v1/students - register a student
//! - GET /api/v1/students - list students
//!
//! Bulk import and the rest of student administration live in the
//! dashboard backend, not here.

use axum::{Json, extract::State};

use crate::{
    error::AppError,
    models::student::{CreateStudentRequest, Student},
    response::ApiResponse,
    state::AppState,
};

/// Register a new student.
///
/// The registration number is the globally unique natural key the scanners
/// read; registering a duplicate is rejected by the database constraint.
pub async fn create_student(
    State(state): State<AppState>,
    Json(request): Json<CreateStudentRequest>,
) -> Result<Json<ApiResponse<Student>>, AppError> {
    let student = sqlx::query_as::<_, Student>(
        r#"
        INSERT INTO students (registration_no, full_name, department, academic_year, semester)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(request.registration_no)
    .bind(request.full_name)
    .bind(request.department)
    .bind(request.academic_year)
    .bind(request.semester)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(ApiResponse::ok(student)))
}

/// List all students, by registration number.
pub async fn list_students(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Student>>>, AppError> {
    let students =
        sqlx::query_as::<_, Student>("SELECT * FROM students ORDER BY registration_no")
            .fetch_all(&state.pool)
            .await?;

    Ok(Json(ApiResponse::ok(students)))
}
