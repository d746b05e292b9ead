//! Tutor profiles.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studyroom_core::types::{DbId, Timestamp};
use validator::Validate;

/// A row from the `tutors` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tutor {
    pub id: DbId,
    pub display_name: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Tutor {
    pub fn snapshot(&self) -> TutorSnapshot {
        TutorSnapshot {
            id: self.id,
            name: self.display_name.clone(),
            email: self.email.clone(),
        }
    }
}

/// The tutor fields denormalized onto leads, clients and students.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorSnapshot {
    pub id: DbId,
    pub name: String,
    pub email: String,
}

/// DTO for registering a tutor profile via `POST /api/v1/admin/tutors`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTutor {
    #[validate(length(min = 1, max = 200))]
    pub display_name: String,
    #[validate(email)]
    pub email: String,
}
