//! Repository for the `invoices` table.
//!
//! `uq_invoices_active_session` allows one live (not void, not cancelled)
//! invoice per session; a second insert fails with a unique violation.

use sqlx::PgExecutor;
use studyroom_core::billing::InvoiceStatus;
use studyroom_core::types::DbId;

use crate::models::invoice::{Invoice, NewInvoice};

const COLUMNS: &str = "\
    id, status, client_id, student_id, session_id, tutor_id, tutor_email, invoice_type, \
    coverage_start, coverage_end, rate_per_hour_cents, subtotal_cents, due_at, tutor_note, \
    cancel_reason, external_ref, created_at, updated_at";

pub struct InvoiceRepo;

impl InvoiceRepo {
    /// Insert a `DRAFT` invoice.
    pub async fn create<'e, E: PgExecutor<'e>>(
        exec: E,
        input: &NewInvoice,
    ) -> Result<Invoice, sqlx::Error> {
        let query = format!(
            "INSERT INTO invoices (status, client_id, student_id, session_id, tutor_id, \
                 tutor_email, invoice_type, coverage_start, coverage_end, rate_per_hour_cents, \
                 subtotal_cents, due_at, tutor_note, cancel_reason) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Invoice>(&query)
            .bind(InvoiceStatus::Draft.as_str())
            .bind(input.client_id)
            .bind(input.student_id)
            .bind(input.session_id)
            .bind(input.tutor_id)
            .bind(&input.tutor_email)
            .bind(input.invoice_type.as_str())
            .bind(input.coverage_start)
            .bind(input.coverage_end)
            .bind(input.rate_per_hour_cents)
            .bind(input.subtotal_cents)
            .bind(input.due_at)
            .bind(&input.tutor_note)
            .bind(&input.cancel_reason)
            .fetch_one(exec)
            .await
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        exec: E,
        id: DbId,
    ) -> Result<Option<Invoice>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM invoices WHERE id = $1");
        sqlx::query_as::<_, Invoice>(&query)
            .bind(id)
            .fetch_optional(exec)
            .await
    }

    /// Read an invoice and lock it for the rest of the transaction.
    pub async fn find_for_update<'e, E: PgExecutor<'e>>(
        exec: E,
        id: DbId,
    ) -> Result<Option<Invoice>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM invoices WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Invoice>(&query)
            .bind(id)
            .fetch_optional(exec)
            .await
    }

    /// Record the external sink's acceptance: status `SENT` plus its reference.
    pub async fn mark_sent<'e, E: PgExecutor<'e>>(
        exec: E,
        id: DbId,
        external_ref: Option<&str>,
    ) -> Result<Option<Invoice>, sqlx::Error> {
        let query = format!(
            "UPDATE invoices SET status = $2, external_ref = $3 \
             WHERE id = $1 AND status = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Invoice>(&query)
            .bind(id)
            .bind(InvoiceStatus::Sent.as_str())
            .bind(external_ref)
            .bind(InvoiceStatus::Draft.as_str())
            .fetch_optional(exec)
            .await
    }

    /// Void an invoice still in the `expected` status. Returns `None` if it
    /// moved on in the meantime.
    pub async fn void<'e, E: PgExecutor<'e>>(
        exec: E,
        id: DbId,
        expected: InvoiceStatus,
        reason: &str,
    ) -> Result<Option<Invoice>, sqlx::Error> {
        let query = format!(
            "UPDATE invoices SET status = $2, cancel_reason = $3 \
             WHERE id = $1 AND status = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Invoice>(&query)
            .bind(id)
            .bind(InvoiceStatus::Void.as_str())
            .bind(reason)
            .bind(expected.as_str())
            .fetch_optional(exec)
            .await
    }
}
