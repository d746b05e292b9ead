//! Lead entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studyroom_core::lead::{LeadMode, LeadStatus};
use studyroom_core::types::{DbId, FamilyId, Timestamp};
use validator::Validate;

/// A row from the `leads` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: FamilyId,
    pub parent_name: String,
    pub parent_email: String,
    pub parent_phone: Option<String>,
    pub student_name: String,
    pub year_level: Option<String>,
    pub school: Option<String>,
    pub subjects: Vec<String>,
    #[sqlx(try_from = "String")]
    pub mode: LeadMode,
    pub address: Option<String>,
    pub suburb: Option<String>,
    pub postcode: Option<String>,
    pub availability: Vec<String>,
    pub goals: Option<String>,
    pub challenges: Option<String>,
    pub package_plan: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: LeadStatus,
    pub claimed_tutor_id: Option<DbId>,
    pub claimed_tutor_name: Option<String>,
    pub claimed_tutor_email: Option<String>,
    pub claimed_at: Option<Timestamp>,
    pub client_id: Option<FamilyId>,
    pub student_id: Option<FamilyId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for the public intake form, `POST /api/v1/leads`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLead {
    #[validate(length(min = 1, max = 200))]
    pub parent_name: String,
    #[validate(email)]
    pub parent_email: String,
    #[validate(length(max = 40))]
    pub parent_phone: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub student_name: String,
    #[validate(length(max = 40))]
    pub year_level: Option<String>,
    #[validate(length(max = 200))]
    pub school: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub subjects: Vec<String>,
    pub mode: LeadMode,
    #[validate(length(max = 400))]
    pub address: Option<String>,
    #[validate(length(max = 120))]
    pub suburb: Option<String>,
    #[validate(length(max = 12))]
    pub postcode: Option<String>,
    #[serde(default)]
    #[validate(length(max = 21))]
    pub availability: Vec<String>,
    #[validate(length(max = 4000))]
    pub goals: Option<String>,
    #[validate(length(max = 4000))]
    pub challenges: Option<String>,
    pub package_plan: Option<String>,
}

/// Query parameters for `GET /api/v1/leads`.
#[derive(Debug, Deserialize)]
pub struct LeadListQuery {
    /// Defaults to `new` (the claimable pool).
    pub status: Option<LeadStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// DTO for `POST /api/v1/admin/leads/{id}/assign`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignLeadRequest {
    pub tutor_id: DbId,
}

/// DTO for `PUT /api/v1/admin/leads/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateLeadStatus {
    pub status: LeadStatus,
}

/// Successful claim payload: `{ "ok": true, "studentId": ... }`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub ok: bool,
    pub student_id: FamilyId,
}
