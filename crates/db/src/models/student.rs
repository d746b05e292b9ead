//! Student model.

use serde::Serialize;
use sqlx::FromRow;
use studyroom_core::lead::LeadMode;
use studyroom_core::types::{DbId, FamilyId, Timestamp};

/// A row from the `students` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: FamilyId,
    pub client_id: FamilyId,
    pub name: String,
    pub year_level: Option<String>,
    pub school: Option<String>,
    pub subjects: Vec<String>,
    #[sqlx(try_from = "String")]
    pub mode: LeadMode,
    pub suburb: Option<String>,
    pub postcode: Option<String>,
    pub availability: Vec<String>,
    pub goals: Option<String>,
    pub challenges: Option<String>,
    pub package_plan: Option<String>,
    pub assigned_tutor_id: Option<DbId>,
    pub assigned_tutor_name: Option<String>,
    pub assigned_tutor_email: Option<String>,
    pub assigned_at: Option<Timestamp>,
    pub tutor_confirmed_at: Option<Timestamp>,
    pub tutor_confirmed_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Student {
    pub fn is_assigned_to(&self, tutor_id: DbId) -> bool {
        self.assigned_tutor_id == Some(tutor_id)
    }
}
