//! Lead claiming and admin assignment.
//!
//! Both paths materialize the family: the lead id becomes the id of the
//! client and the student, so retrying a failed claim touches the same rows.

use sqlx::{PgConnection, PgPool};
use studyroom_core::error::CoreError;
use studyroom_core::lead::{materialized_ids, validate_assignable, validate_claimable, LeadStatus};
use studyroom_core::pricing::PackagePlan;
use studyroom_core::types::{DbId, FamilyId};
use studyroom_db::models::lead::Lead;
use studyroom_db::models::tutor::{Tutor, TutorSnapshot};
use studyroom_db::repositories::{ClientRepo, LeadRepo, StudentRepo, TutorRepo};

use crate::error::AppResult;

/// Outcome of a successful claim or assignment.
#[derive(Debug)]
pub struct Claimed {
    pub lead: Lead,
    pub student_id: FamilyId,
}

/// Claim an open lead for the calling tutor.
///
/// Racing claimers serialize on the lead's row lock; the loser re-reads the
/// winner's claim and fails with [`CoreError::AlreadyClaimed`].
pub async fn claim_lead(pool: &PgPool, lead_id: FamilyId, tutor_id: DbId) -> AppResult<Claimed> {
    let mut tx = pool.begin().await?;

    let tutor = active_tutor(&mut tx, tutor_id).await?;
    let lead = LeadRepo::find_for_update(&mut *tx, lead_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Lead", lead_id))?;
    validate_claimable(lead.status, lead.claimed_tutor_id)?;

    let claimed = materialize(&mut tx, &lead, &tutor.snapshot(), &[LeadStatus::New]).await?;
    tx.commit().await?;

    tracing::info!(
        lead_id = %lead_id,
        tutor_id,
        student_id = %claimed.student_id,
        "Lead claimed",
    );
    Ok(claimed)
}

/// Assign a lead to a tutor on an admin's behalf. Accepts `new` and
/// `contacted` leads.
pub async fn assign_lead(
    pool: &PgPool,
    lead_id: FamilyId,
    tutor_id: DbId,
    admin_id: DbId,
) -> AppResult<Claimed> {
    let mut tx = pool.begin().await?;

    let tutor = TutorRepo::find_active(&mut *tx, tutor_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Tutor", tutor_id))?;
    let lead = LeadRepo::find_for_update(&mut *tx, lead_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Lead", lead_id))?;
    validate_assignable(lead.status, lead.claimed_tutor_id)?;

    let claimed = materialize(
        &mut tx,
        &lead,
        &tutor.snapshot(),
        &[LeadStatus::New, LeadStatus::Contacted],
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        lead_id = %lead_id,
        tutor_id,
        admin_id,
        student_id = %claimed.student_id,
        "Lead assigned by admin",
    );
    Ok(claimed)
}

async fn active_tutor(conn: &mut PgConnection, tutor_id: DbId) -> AppResult<Tutor> {
    let tutor = TutorRepo::find_active(&mut *conn, tutor_id)
        .await?
        .ok_or_else(|| CoreError::Forbidden("No active tutor profile for this account".into()))?;
    Ok(tutor)
}

/// Upsert client and student, refresh the client's tutor cache, then flip the
/// lead. The lead update is a compare-and-swap so a concurrent writer that
/// slipped past the lock still cannot produce a second claim.
async fn materialize(
    conn: &mut PgConnection,
    lead: &Lead,
    tutor: &TutorSnapshot,
    expected: &[LeadStatus],
) -> AppResult<Claimed> {
    let (client_id, student_id) = materialized_ids(lead.id);
    let plan = PackagePlan::parse(lead.package_plan.as_deref())?;

    ClientRepo::upsert_from_lead(&mut *conn, client_id, lead, &plan.as_db_value()).await?;
    StudentRepo::upsert_from_lead(&mut *conn, student_id, client_id, lead, tutor).await?;
    ClientRepo::refresh_tutor_snapshot(&mut *conn, client_id).await?;

    let lead = LeadRepo::mark_assigned(&mut *conn, lead.id, expected, tutor, client_id, student_id)
        .await?
        .ok_or(CoreError::AlreadyClaimed)?;

    Ok(Claimed { lead, student_id })
}
