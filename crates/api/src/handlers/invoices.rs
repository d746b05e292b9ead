//! Handlers for `/invoices`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use studyroom_core::error::CoreError;
use studyroom_core::session::ensure_session_owner;
use studyroom_core::types::DbId;
use studyroom_db::models::invoice::CreateInvoiceRequest;
use studyroom_db::repositories::InvoiceRepo;
use validator::Validate;

use crate::engine::billing;
use crate::error::AppResult;
use crate::middleware::rbac::RequireTutor;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/invoices
///
/// Draft an invoice for a session (`mode: DRAFT`) or draft and forward it
/// (`mode: AUTHORISED`). Prepaid families get `{ skipped: true }` and 200.
pub async fn create_invoice(
    RequireTutor(user): RequireTutor,
    State(state): State<AppState>,
    Json(input): Json<CreateInvoiceRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let effect = billing::create_invoice(
        &state.pool,
        &state.sink,
        &state.config.billing,
        &user,
        input.session_id,
        input.mode,
        input.tutor_note,
    )
    .await?;

    let status = if effect.skipped {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(DataResponse { data: effect })))
}

/// GET /api/v1/invoices/{id}
pub async fn get_invoice(
    RequireTutor(user): RequireTutor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let invoice = InvoiceRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| CoreError::not_found("Invoice", id))?;
    ensure_session_owner(invoice.tutor_id, user.user_id, user.is_admin())?;
    Ok(Json(DataResponse { data: invoice }))
}

/// POST /api/v1/invoices/{id}/send
///
/// Forward a draft to the external invoicing sink.
pub async fn send_invoice(
    RequireTutor(user): RequireTutor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let invoice = billing::send_invoice(&state.pool, &state.sink, &user, id).await?;
    Ok(Json(DataResponse { data: invoice }))
}
