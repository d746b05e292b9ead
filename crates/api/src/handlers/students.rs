//! Handlers for `/students`.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use studyroom_core::error::CoreError;
use studyroom_core::types::FamilyId;
use studyroom_db::models::student::Student;
use studyroom_db::repositories::StudentRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireTutor;
use crate::response::DataResponse;
use crate::state::AppState;

async fn find_visible(
    pool: &sqlx::PgPool,
    student_id: FamilyId,
    user: &AuthUser,
) -> AppResult<Student> {
    let student = StudentRepo::find_by_id(pool, student_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Student", student_id))?;
    if !user.is_admin() && !student.is_assigned_to(user.user_id) {
        return Err(CoreError::Forbidden("Student is assigned to another tutor".into()).into());
    }
    Ok(student)
}

/// GET /api/v1/students
///
/// The caller's assigned students.
pub async fn list_my_students(
    RequireTutor(user): RequireTutor,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let students = StudentRepo::list_for_tutor(&state.pool, user.user_id).await?;
    Ok(Json(DataResponse { data: students }))
}

/// GET /api/v1/students/{id}
pub async fn get_student(
    RequireTutor(user): RequireTutor,
    State(state): State<AppState>,
    Path(student_id): Path<FamilyId>,
) -> AppResult<impl IntoResponse> {
    let student = find_visible(&state.pool, student_id, &user).await?;
    Ok(Json(DataResponse { data: student }))
}

/// POST /api/v1/students/{id}/confirm
///
/// The assigned tutor accepts the student.
pub async fn confirm_student(
    RequireTutor(user): RequireTutor,
    State(state): State<AppState>,
    Path(student_id): Path<FamilyId>,
) -> AppResult<impl IntoResponse> {
    let student = find_visible(&state.pool, student_id, &user).await?;
    let tutor_id = student
        .assigned_tutor_id
        .ok_or_else(|| CoreError::Validation("Student has no assigned tutor".into()))?;

    let confirmed = StudentRepo::confirm_tutor(&state.pool, student_id, tutor_id)
        .await?
        .ok_or_else(|| CoreError::Conflict("Student was reassigned, reload and retry".into()))?;

    tracing::info!(student_id = %student_id, tutor_id, by = user.user_id, "Student confirmed");
    Ok(Json(DataResponse { data: confirmed }))
}
