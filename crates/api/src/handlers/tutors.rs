//! Admin handlers for `/admin/tutors`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use studyroom_db::models::tutor::CreateTutor;
use studyroom_db::repositories::TutorRepo;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/admin/tutors
///
/// Register a tutor profile. A duplicate email is a 409 via `uq_tutors_email`.
pub async fn create_tutor(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateTutor>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let tutor = TutorRepo::create(&state.pool, &input).await?;
    tracing::info!(tutor_id = tutor.id, admin_id = admin.user_id, "Tutor registered");
    Ok((StatusCode::CREATED, Json(DataResponse { data: tutor })))
}

/// GET /api/v1/admin/tutors
pub async fn list_tutors(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let tutors = TutorRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: tutors }))
}
