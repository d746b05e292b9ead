//! Repository for the `leads` table.
//!
//! Status filters match every stored alias of a status (see
//! [`LeadStatus::stored_aliases`]) so legacy rows stay visible.

use sqlx::PgExecutor;
use studyroom_core::lead::LeadStatus;
use studyroom_core::types::FamilyId;
use uuid::Uuid;

use crate::models::lead::{CreateLead, Lead, LeadListQuery};
use crate::models::tutor::TutorSnapshot;

const COLUMNS: &str = "\
    id, parent_name, parent_email, parent_phone, student_name, year_level, school, \
    subjects, mode, address, suburb, postcode, availability, goals, challenges, \
    package_plan, status, claimed_tutor_id, claimed_tutor_name, claimed_tutor_email, \
    claimed_at, client_id, student_id, created_at, updated_at";

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

pub struct LeadRepo;

impl LeadRepo {
    /// Insert a new intake submission with status `new`.
    ///
    /// Subjects and availability are stored as given; callers normalize them.
    pub async fn create<'e, E: PgExecutor<'e>>(
        exec: E,
        input: &CreateLead,
    ) -> Result<Lead, sqlx::Error> {
        let query = format!(
            "INSERT INTO leads (id, parent_name, parent_email, parent_phone, student_name, \
                 year_level, school, subjects, mode, address, suburb, postcode, availability, \
                 goals, challenges, package_plan, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Lead>(&query)
            .bind(Uuid::new_v4())
            .bind(&input.parent_name)
            .bind(&input.parent_email)
            .bind(&input.parent_phone)
            .bind(&input.student_name)
            .bind(&input.year_level)
            .bind(&input.school)
            .bind(&input.subjects)
            .bind(input.mode.as_str())
            .bind(&input.address)
            .bind(&input.suburb)
            .bind(&input.postcode)
            .bind(&input.availability)
            .bind(&input.goals)
            .bind(&input.challenges)
            .bind(&input.package_plan)
            .bind(LeadStatus::New.as_str())
            .fetch_one(exec)
            .await
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        exec: E,
        id: FamilyId,
    ) -> Result<Option<Lead>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM leads WHERE id = $1");
        sqlx::query_as::<_, Lead>(&query)
            .bind(id)
            .fetch_optional(exec)
            .await
    }

    /// Read a lead and hold its row lock until the surrounding transaction
    /// ends. Concurrent claimers queue here.
    pub async fn find_for_update<'e, E: PgExecutor<'e>>(
        exec: E,
        id: FamilyId,
    ) -> Result<Option<Lead>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM leads WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Lead>(&query)
            .bind(id)
            .fetch_optional(exec)
            .await
    }

    /// List leads in one status, oldest first. Defaults to the open pool.
    pub async fn list<'e, E: PgExecutor<'e>>(
        exec: E,
        params: &LeadListQuery,
    ) -> Result<Vec<Lead>, sqlx::Error> {
        let status = params.status.unwrap_or(LeadStatus::New);
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);
        let query = format!(
            "SELECT {COLUMNS} FROM leads \
             WHERE status = ANY($1) \
             ORDER BY created_at ASC, id ASC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Lead>(&query)
            .bind(status.stored_aliases())
            .bind(limit)
            .bind(offset)
            .fetch_all(exec)
            .await
    }

    /// Record a claim: status `assigned`, the tutor snapshot and the
    /// materialized family ids.
    ///
    /// Compare-and-swap on `claimed_tutor_id IS NULL` and the expected
    /// statuses. Returns `None` when another writer got there first.
    pub async fn mark_assigned<'e, E: PgExecutor<'e>>(
        exec: E,
        id: FamilyId,
        expected: &[LeadStatus],
        tutor: &TutorSnapshot,
        client_id: FamilyId,
        student_id: FamilyId,
    ) -> Result<Option<Lead>, sqlx::Error> {
        let expected: Vec<&str> = expected
            .iter()
            .flat_map(|s| s.stored_aliases().iter().copied())
            .collect();
        let query = format!(
            "UPDATE leads \
             SET status = $2, claimed_tutor_id = $3, claimed_tutor_name = $4, \
                 claimed_tutor_email = $5, claimed_at = NOW(), client_id = $6, student_id = $7 \
             WHERE id = $1 AND claimed_tutor_id IS NULL AND status = ANY($8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Lead>(&query)
            .bind(id)
            .bind(LeadStatus::Assigned.as_str())
            .bind(tutor.id)
            .bind(&tutor.name)
            .bind(&tutor.email)
            .bind(client_id)
            .bind(student_id)
            .bind(&expected)
            .fetch_optional(exec)
            .await
    }

    /// Move a lead from `from` to `to`. Returns `None` if the stored status
    /// no longer matches `from`.
    pub async fn set_status<'e, E: PgExecutor<'e>>(
        exec: E,
        id: FamilyId,
        from: LeadStatus,
        to: LeadStatus,
    ) -> Result<Option<Lead>, sqlx::Error> {
        let query = format!(
            "UPDATE leads SET status = $2 \
             WHERE id = $1 AND status = ANY($3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Lead>(&query)
            .bind(id)
            .bind(to.as_str())
            .bind(from.stored_aliases())
            .fetch_optional(exec)
            .await
    }
}
