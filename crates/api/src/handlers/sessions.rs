//! Handlers for `/sessions` and `/admin/sessions`.
//!
//! Mutations answer `{ "data": effect }` where the effect is the updated
//! session, or a richer summary for complete, cancel and recurrence.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use studyroom_core::error::CoreError;
use studyroom_core::session::ensure_session_owner;
use studyroom_core::types::DbId;
use studyroom_db::models::session::{
    CancelRequest, CompleteRequest, CreateSessionRequest, ExpandRecurringRequest,
    RescheduleRequest, SessionListQuery, SettleRequest,
};
use studyroom_db::repositories::SessionRepo;
use validator::Validate;

use crate::engine::{billing, sessions};
use crate::error::AppResult;
use crate::middleware::rbac::{RequireAdmin, RequireTutor};
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/sessions
pub async fn create_session(
    RequireTutor(user): RequireTutor,
    State(state): State<AppState>,
    Json(input): Json<CreateSessionRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let session = sessions::create_session(&state.pool, &user, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: session })))
}

/// GET /api/v1/sessions?from=&to=
///
/// The caller's own sessions in start order.
pub async fn list_my_sessions(
    RequireTutor(user): RequireTutor,
    State(state): State<AppState>,
    Query(params): Query<SessionListQuery>,
) -> AppResult<impl IntoResponse> {
    let sessions =
        SessionRepo::list_for_tutor(&state.pool, user.user_id, params.from, params.to).await?;
    Ok(Json(DataResponse { data: sessions }))
}

/// GET /api/v1/sessions/{id}
pub async fn get_session(
    RequireTutor(user): RequireTutor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let session = SessionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| CoreError::not_found("Session", id))?;
    ensure_session_owner(session.tutor_id, user.user_id, user.is_admin())?;
    Ok(Json(DataResponse { data: session }))
}

/// GET /api/v1/sessions/series/{key}
pub async fn list_series(
    RequireTutor(user): RequireTutor,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<impl IntoResponse> {
    let sessions = sessions::list_series(&state.pool, &key, &user).await?;
    Ok(Json(DataResponse { data: sessions }))
}

/// POST /api/v1/sessions/{id}/confirm
pub async fn confirm_session(
    RequireTutor(user): RequireTutor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let session = sessions::confirm(&state.pool, id, &user).await?;
    Ok(Json(DataResponse { data: session }))
}

/// POST /api/v1/sessions/{id}/reschedule
pub async fn reschedule_session(
    RequireTutor(user): RequireTutor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<RescheduleRequest>,
) -> AppResult<impl IntoResponse> {
    let session = sessions::reschedule(
        &state.pool,
        id,
        &user,
        input.start_at,
        input.end_at,
        &state.config.billing,
    )
    .await?;
    Ok(Json(DataResponse { data: session }))
}

/// POST /api/v1/sessions/{id}/complete
pub async fn complete_session(
    RequireTutor(user): RequireTutor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<CompleteRequest>,
) -> AppResult<impl IntoResponse> {
    let effect = sessions::complete(
        &state.pool,
        id,
        &user,
        input.invoice_now,
        &state.config.billing,
    )
    .await?;
    Ok(Json(DataResponse { data: effect }))
}

/// POST /api/v1/sessions/{id}/cancel
pub async fn cancel_session(
    RequireTutor(user): RequireTutor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<CancelRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let effect = sessions::cancel(
        &state.pool,
        id,
        &user,
        &input,
        Utc::now(),
        &state.config.cancellation,
        &state.config.billing,
    )
    .await?;
    Ok(Json(DataResponse { data: effect }))
}

/// POST /api/v1/sessions/{id}/no-show
pub async fn mark_no_show(
    RequireTutor(user): RequireTutor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let session = sessions::mark_no_show(&state.pool, id, &user).await?;
    Ok(Json(DataResponse { data: session }))
}

/// POST /api/v1/sessions/{id}/recurrence
///
/// Returns 201 with the series key and the newly created sessions.
pub async fn expand_recurring(
    RequireTutor(user): RequireTutor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ExpandRecurringRequest>,
) -> AppResult<impl IntoResponse> {
    let effect = sessions::expand_recurring(&state.pool, id, &user, input.weeks).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: effect })))
}

/// POST /api/v1/admin/sessions/{id}/settle
///
/// Credit or forfeit the session's billing.
pub async fn settle_session(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SettleRequest>,
) -> AppResult<impl IntoResponse> {
    let session = billing::settle(&state.pool, id, input.settlement, admin.user_id).await?;
    Ok(Json(DataResponse { data: session }))
}
