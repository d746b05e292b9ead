//! Repository for the `tutors` table.

use sqlx::PgExecutor;
use studyroom_core::types::DbId;

use crate::models::tutor::{CreateTutor, Tutor};

const COLUMNS: &str = "id, display_name, email, is_active, created_at, updated_at";

pub struct TutorRepo;

impl TutorRepo {
    /// Insert a tutor profile. A duplicate email fails on `uq_tutors_email`.
    pub async fn create<'e, E: PgExecutor<'e>>(
        exec: E,
        input: &CreateTutor,
    ) -> Result<Tutor, sqlx::Error> {
        let query = format!(
            "INSERT INTO tutors (display_name, email) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Tutor>(&query)
            .bind(input.display_name.trim())
            .bind(input.email.trim().to_ascii_lowercase())
            .fetch_one(exec)
            .await
    }

    /// Active tutors only; used to resolve the caller's snapshot on claim.
    pub async fn find_active<'e, E: PgExecutor<'e>>(
        exec: E,
        id: DbId,
    ) -> Result<Option<Tutor>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tutors WHERE id = $1 AND is_active");
        sqlx::query_as::<_, Tutor>(&query)
            .bind(id)
            .fetch_optional(exec)
            .await
    }

    pub async fn list<'e, E: PgExecutor<'e>>(exec: E) -> Result<Vec<Tutor>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tutors ORDER BY display_name, id");
        sqlx::query_as::<_, Tutor>(&query).fetch_all(exec).await
    }
}
