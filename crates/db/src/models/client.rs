//! Client (family billing entity) model.

use serde::Serialize;
use sqlx::FromRow;
use studyroom_core::billing::ClientTerms;
use studyroom_core::error::CoreError;
use studyroom_core::lead::LeadMode;
use studyroom_core::pricing::PackagePlan;
use studyroom_core::types::{Cents, DbId, FamilyId, Timestamp};

/// Onboarding has not been finished by the family yet.
pub const ONBOARDING_INCOMPLETE: &str = "INCOMPLETE";

/// A row from the `clients` table.
///
/// The `assigned_tutor_*` columns are a cache of the most recent student
/// assignment in the family; see `ClientRepo::refresh_tutor_snapshot`.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: FamilyId,
    pub parent_name: String,
    pub parent_email: String,
    pub parent_phone: Option<String>,
    #[sqlx(try_from = "String")]
    pub mode: LeadMode,
    pub address: Option<String>,
    pub suburb: Option<String>,
    pub postcode: Option<String>,
    pub package_plan: String,
    pub hourly_rate_cents: Option<Cents>,
    pub assigned_tutor_id: Option<DbId>,
    pub assigned_tutor_name: Option<String>,
    pub assigned_tutor_email: Option<String>,
    pub onboarding_status: String,
    pub onboarding_completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Client {
    /// Billing terms used when pricing this family's sessions.
    pub fn terms(&self) -> Result<ClientTerms, CoreError> {
        Ok(ClientTerms {
            package_plan: PackagePlan::parse(Some(&self.package_plan))?,
            hourly_rate_cents: self.hourly_rate_cents,
        })
    }
}
