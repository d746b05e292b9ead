//! Repository for the `clients` table.

use sqlx::PgExecutor;
use studyroom_core::types::FamilyId;

use crate::models::client::{Client, ONBOARDING_INCOMPLETE};
use crate::models::lead::Lead;

const COLUMNS: &str = "\
    id, parent_name, parent_email, parent_phone, mode, address, suburb, postcode, \
    package_plan, hourly_rate_cents, assigned_tutor_id, assigned_tutor_name, \
    assigned_tutor_email, onboarding_status, onboarding_completed_at, created_at, updated_at";

pub struct ClientRepo;

impl ClientRepo {
    /// Create the family's client record from a lead, or refresh its contact
    /// fields if it already exists. Pricing overrides and onboarding state
    /// on an existing row are left alone.
    pub async fn upsert_from_lead<'e, E: PgExecutor<'e>>(
        exec: E,
        id: FamilyId,
        lead: &Lead,
        package_plan: &str,
    ) -> Result<Client, sqlx::Error> {
        let query = format!(
            "INSERT INTO clients (id, parent_name, parent_email, parent_phone, mode, \
                 address, suburb, postcode, package_plan, onboarding_status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (id) DO UPDATE SET \
                 parent_name = EXCLUDED.parent_name, \
                 parent_email = EXCLUDED.parent_email, \
                 parent_phone = COALESCE(EXCLUDED.parent_phone, clients.parent_phone), \
                 mode = EXCLUDED.mode, \
                 address = COALESCE(EXCLUDED.address, clients.address), \
                 suburb = COALESCE(EXCLUDED.suburb, clients.suburb), \
                 postcode = COALESCE(EXCLUDED.postcode, clients.postcode), \
                 package_plan = EXCLUDED.package_plan \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Client>(&query)
            .bind(id)
            .bind(&lead.parent_name)
            .bind(&lead.parent_email)
            .bind(&lead.parent_phone)
            .bind(lead.mode.as_str())
            .bind(&lead.address)
            .bind(&lead.suburb)
            .bind(&lead.postcode)
            .bind(package_plan)
            .bind(ONBOARDING_INCOMPLETE)
            .fetch_one(exec)
            .await
    }

    /// Recompute the cached tutor snapshot from the family's most recently
    /// assigned student. Clears it when no student is assigned.
    pub async fn refresh_tutor_snapshot<'e, E: PgExecutor<'e>>(
        exec: E,
        id: FamilyId,
    ) -> Result<Option<Client>, sqlx::Error> {
        let query = format!(
            "UPDATE clients c \
             SET (assigned_tutor_id, assigned_tutor_name, assigned_tutor_email) = ( \
                 SELECT s.assigned_tutor_id, s.assigned_tutor_name, s.assigned_tutor_email \
                 FROM students s \
                 WHERE s.client_id = c.id AND s.assigned_tutor_id IS NOT NULL \
                 ORDER BY s.assigned_at DESC NULLS LAST, s.id \
                 LIMIT 1 \
             ) \
             WHERE c.id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Client>(&query)
            .bind(id)
            .fetch_optional(exec)
            .await
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        exec: E,
        id: FamilyId,
    ) -> Result<Option<Client>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM clients WHERE id = $1");
        sqlx::query_as::<_, Client>(&query)
            .bind(id)
            .fetch_optional(exec)
            .await
    }
}
