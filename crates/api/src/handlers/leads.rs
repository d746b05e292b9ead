//! Handlers for `/leads` and `/admin/leads`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use studyroom_core::error::CoreError;
use studyroom_core::lead::{
    normalize_availability, normalize_subjects, validate_status_update, LeadStatus,
};
use studyroom_core::pricing::PackagePlan;
use studyroom_core::types::FamilyId;
use studyroom_db::models::lead::{
    AssignLeadRequest, ClaimResponse, CreateLead, LeadListQuery, UpdateLeadStatus,
};
use studyroom_db::repositories::LeadRepo;
use validator::Validate;

use crate::engine::claim;
use crate::error::AppResult;
use crate::middleware::rbac::{RequireAdmin, RequireTutor};
use crate::response::DataResponse;
use crate::state::AppState;

/// Trim free text and drop it when empty.
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Intake
// ---------------------------------------------------------------------------

/// POST /api/v1/leads
///
/// Public intake form. Returns 201 with the stored lead.
pub async fn create_lead(
    State(state): State<AppState>,
    Json(input): Json<CreateLead>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let package_plan = PackagePlan::parse(input.package_plan.as_deref())?;
    let normalized = CreateLead {
        parent_name: input.parent_name.trim().to_string(),
        parent_email: input.parent_email.trim().to_ascii_lowercase(),
        parent_phone: clean(input.parent_phone),
        student_name: input.student_name.trim().to_string(),
        year_level: clean(input.year_level),
        school: clean(input.school),
        subjects: normalize_subjects(&input.subjects),
        mode: input.mode,
        address: clean(input.address),
        suburb: clean(input.suburb),
        postcode: clean(input.postcode),
        availability: normalize_availability(&input.availability)?,
        goals: clean(input.goals),
        challenges: clean(input.challenges),
        package_plan: Some(package_plan.as_db_value()),
    };

    let lead = LeadRepo::create(&state.pool, &normalized).await?;
    tracing::info!(lead_id = %lead.id, mode = lead.mode.as_str(), "Lead received");

    Ok((StatusCode::CREATED, Json(DataResponse { data: lead })))
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// GET /api/v1/leads
///
/// Tutors see the open pool only; admins may filter by any status.
pub async fn list_leads(
    RequireTutor(user): RequireTutor,
    State(state): State<AppState>,
    Query(mut params): Query<LeadListQuery>,
) -> AppResult<impl IntoResponse> {
    if !user.is_admin() {
        params.status = Some(LeadStatus::New);
    }
    let leads = LeadRepo::list(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: leads }))
}

/// GET /api/v1/leads/{id}
///
/// Open leads are visible to every tutor; claimed ones only to the claimer.
pub async fn get_lead(
    RequireTutor(user): RequireTutor,
    State(state): State<AppState>,
    Path(lead_id): Path<FamilyId>,
) -> AppResult<impl IntoResponse> {
    let lead = LeadRepo::find_by_id(&state.pool, lead_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Lead", lead_id))?;

    let visible = user.is_admin()
        || lead.status == LeadStatus::New
        || lead.claimed_tutor_id == Some(user.user_id);
    if !visible {
        return Err(CoreError::Forbidden("Lead is claimed by another tutor".into()).into());
    }
    Ok(Json(DataResponse { data: lead }))
}

// ---------------------------------------------------------------------------
// Claim / assign
// ---------------------------------------------------------------------------

/// POST /api/v1/leads/{id}/claim
///
/// Responds `{ "ok": true, "studentId": ... }`.
pub async fn claim_lead(
    RequireTutor(user): RequireTutor,
    State(state): State<AppState>,
    Path(lead_id): Path<FamilyId>,
) -> AppResult<impl IntoResponse> {
    let claimed = claim::claim_lead(&state.pool, lead_id, user.user_id).await?;
    Ok(Json(ClaimResponse {
        ok: true,
        student_id: claimed.student_id,
    }))
}

/// POST /api/v1/admin/leads/{id}/assign
pub async fn assign_lead(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(lead_id): Path<FamilyId>,
    Json(input): Json<AssignLeadRequest>,
) -> AppResult<impl IntoResponse> {
    let claimed = claim::assign_lead(&state.pool, lead_id, input.tutor_id, admin.user_id).await?;
    Ok(Json(DataResponse { data: claimed.lead }))
}

/// PUT /api/v1/admin/leads/{id}/status
///
/// Manual moves to `contacted` or `converted`.
pub async fn update_lead_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(lead_id): Path<FamilyId>,
    Json(input): Json<UpdateLeadStatus>,
) -> AppResult<impl IntoResponse> {
    let lead = LeadRepo::find_by_id(&state.pool, lead_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Lead", lead_id))?;
    validate_status_update(lead.status, input.status)?;

    let updated = LeadRepo::set_status(&state.pool, lead_id, lead.status, input.status)
        .await?
        .ok_or_else(|| CoreError::Conflict("Lead status changed, reload and retry".into()))?;

    tracing::info!(
        lead_id = %lead_id,
        admin_id = admin.user_id,
        from = %lead.status,
        to = %updated.status,
        "Lead status updated",
    );
    Ok(Json(DataResponse { data: updated }))
}
