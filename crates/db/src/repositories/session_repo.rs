//! Repository for the `sessions` table.
//!
//! Status-changing updates carry the status the caller observed under its row
//! lock in the `WHERE` clause. A `None` result means the row moved underneath
//! the caller and the engine reports a conflict instead of overwriting it.

use sqlx::PgExecutor;
use studyroom_core::billing::BillingStatus;
use studyroom_core::session::SessionStatus;
use studyroom_core::types::{DbId, Timestamp};

use crate::models::session::{NewSession, Session};

const COLUMNS: &str = "\
    id, tutor_id, tutor_email, student_id, client_id, start_at, end_at, \
    duration_minutes, modality, status, billing_status, invoice_id, series_key, \
    notes, cancel_reason, created_at, updated_at, completed_at, cancelled_at";

pub struct SessionRepo;

impl SessionRepo {
    pub async fn create<'e, E: PgExecutor<'e>>(
        exec: E,
        input: &NewSession,
    ) -> Result<Session, sqlx::Error> {
        let query = format!(
            "INSERT INTO sessions (tutor_id, tutor_email, student_id, client_id, start_at, \
                 end_at, duration_minutes, modality, status, billing_status, series_key, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(input.tutor_id)
            .bind(&input.tutor_email)
            .bind(input.student_id)
            .bind(input.client_id)
            .bind(input.start_at)
            .bind(input.end_at)
            .bind(input.duration_minutes)
            .bind(input.modality.as_str())
            .bind(SessionStatus::Scheduled.as_str())
            .bind(BillingStatus::NotBilled.as_str())
            .bind(&input.series_key)
            .bind(&input.notes)
            .fetch_one(exec)
            .await
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        exec: E,
        id: DbId,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE id = $1");
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .fetch_optional(exec)
            .await
    }

    /// Read a session and lock it for the rest of the transaction.
    pub async fn find_for_update<'e, E: PgExecutor<'e>>(
        exec: E,
        id: DbId,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .fetch_optional(exec)
            .await
    }

    /// A tutor's sessions, optionally bounded by start time, in start order.
    pub async fn list_for_tutor<'e, E: PgExecutor<'e>>(
        exec: E,
        tutor_id: DbId,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<Vec<Session>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sessions \
             WHERE tutor_id = $1 \
               AND ($2::TIMESTAMPTZ IS NULL OR start_at >= $2) \
               AND ($3::TIMESTAMPTZ IS NULL OR start_at < $3) \
             ORDER BY start_at ASC, id ASC"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(tutor_id)
            .bind(from)
            .bind(to)
            .fetch_all(exec)
            .await
    }

    /// Every session in a recurrence series, in start order.
    pub async fn list_series<'e, E: PgExecutor<'e>>(
        exec: E,
        series_key: &str,
    ) -> Result<Vec<Session>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sessions WHERE series_key = $1 ORDER BY start_at ASC, id ASC"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(series_key)
            .fetch_all(exec)
            .await
    }

    /// Move a session to a new time window without changing its status.
    pub async fn reschedule<'e, E: PgExecutor<'e>>(
        exec: E,
        id: DbId,
        expected: SessionStatus,
        start_at: Timestamp,
        end_at: Timestamp,
        duration_minutes: i32,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "UPDATE sessions SET start_at = $3, end_at = $4, duration_minutes = $5 \
             WHERE id = $1 AND status = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .bind(expected.as_str())
            .bind(start_at)
            .bind(end_at)
            .bind(duration_minutes)
            .fetch_optional(exec)
            .await
    }

    /// Plain status change (confirm, no-show).
    pub async fn set_status<'e, E: PgExecutor<'e>>(
        exec: E,
        id: DbId,
        from: SessionStatus,
        to: SessionStatus,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "UPDATE sessions SET status = $3 WHERE id = $1 AND status = $2 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(exec)
            .await
    }

    /// Mark a session completed and write its post-completion billing status.
    pub async fn complete<'e, E: PgExecutor<'e>>(
        exec: E,
        id: DbId,
        from: SessionStatus,
        billing_status: BillingStatus,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "UPDATE sessions \
             SET status = $3, billing_status = $4, completed_at = NOW() \
             WHERE id = $1 AND status = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(SessionStatus::Completed.as_str())
            .bind(billing_status.as_str())
            .fetch_optional(exec)
            .await
    }

    /// Write a cancellation. `to` is one of the `CANCELLED_*` statuses.
    pub async fn cancel<'e, E: PgExecutor<'e>>(
        exec: E,
        id: DbId,
        from: SessionStatus,
        to: SessionStatus,
        cancelled_at: Timestamp,
        reason: Option<&str>,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "UPDATE sessions \
             SET status = $3, cancelled_at = $4, cancel_reason = $5 \
             WHERE id = $1 AND status = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(cancelled_at)
            .bind(reason)
            .fetch_optional(exec)
            .await
    }

    pub async fn set_series_key<'e, E: PgExecutor<'e>>(
        exec: E,
        id: DbId,
        series_key: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE sessions SET series_key = $2 WHERE id = $1")
            .bind(id)
            .bind(series_key)
            .execute(exec)
            .await?;
        Ok(())
    }

    /// Link a freshly created invoice and move billing to `INVOICE_DRAFT`.
    ///
    /// Succeeds only while no invoice is attached and billing is still in one
    /// of the `expected` states. Returns `None` otherwise.
    pub async fn attach_invoice<'e, E: PgExecutor<'e>>(
        exec: E,
        id: DbId,
        invoice_id: DbId,
        expected: BillingStatus,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "UPDATE sessions SET invoice_id = $2, billing_status = $3 \
             WHERE id = $1 AND invoice_id IS NULL AND billing_status = ANY($4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .bind(invoice_id)
            .bind(BillingStatus::InvoiceDraft.as_str())
            .bind(expected.stored_aliases())
            .fetch_optional(exec)
            .await
    }

    /// Unlink `invoice_id` after it was voided and reset billing to `to`.
    pub async fn detach_invoice<'e, E: PgExecutor<'e>>(
        exec: E,
        id: DbId,
        invoice_id: DbId,
        to: BillingStatus,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "UPDATE sessions SET invoice_id = NULL, billing_status = $3 \
             WHERE id = $1 AND invoice_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .bind(invoice_id)
            .bind(to.as_str())
            .fetch_optional(exec)
            .await
    }

    /// Compare-and-swap on `billing_status`.
    pub async fn set_billing_status<'e, E: PgExecutor<'e>>(
        exec: E,
        id: DbId,
        from: BillingStatus,
        to: BillingStatus,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "UPDATE sessions SET billing_status = $2 \
             WHERE id = $1 AND billing_status = ANY($3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .bind(to.as_str())
            .bind(from.stored_aliases())
            .fetch_optional(exec)
            .await
    }
}
