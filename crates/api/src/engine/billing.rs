//! Invoice drafting, forwarding and settlement.

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use studyroom_core::billing::{
    plan_draft_invoice, validate_billing_transition, BillingDecision, BillingPolicy,
    BillingStatus, InvoiceMode, InvoiceStatus, Settlement,
};
use studyroom_core::error::CoreError;
use studyroom_core::session::ensure_session_owner;
use studyroom_core::types::DbId;
use studyroom_db::models::invoice::{Invoice, InvoiceEffect, NewInvoice};
use studyroom_db::models::session::Session;
use studyroom_db::repositories::{ClientRepo, InvoiceRepo, SessionRepo};

use crate::error::{unique_violation, AppResult};
use crate::middleware::auth::AuthUser;
use crate::sink::InvoiceSink;

const ACTIVE_INVOICE_CONSTRAINT: &str = "uq_invoices_active_session";
const CREDIT_REASON: &str = "Credited";

/// Draft an invoice for a locked session inside the caller's transaction.
///
/// Returns `None` when the family is on a prepaid package. Fails with
/// [`CoreError::AlreadyBilled`] if the session already has an invoice,
/// whether that is visible in the locked row, caught by the partial unique
/// index, or detected by the compare-and-swap on `billing_status`.
pub async fn draft_in_tx(
    conn: &mut PgConnection,
    session: &Session,
    policy: &BillingPolicy,
    tutor_note: Option<String>,
    cancel_reason: Option<String>,
) -> AppResult<Option<Invoice>> {
    let client = ClientRepo::find_by_id(&mut *conn, session.client_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Client", session.client_id))?;

    let plan = match plan_draft_invoice(&session.billable(), &client.terms()?, policy, Utc::now())? {
        BillingDecision::Draft(plan) => plan,
        BillingDecision::SkipPrepaid => {
            tracing::info!(
                session_id = session.id,
                client_id = %session.client_id,
                "Prepaid package, no per-session invoice",
            );
            return Ok(None);
        }
    };

    let input = NewInvoice {
        client_id: session.client_id,
        student_id: session.student_id,
        session_id: session.id,
        tutor_id: session.tutor_id,
        tutor_email: session.tutor_email.clone(),
        invoice_type: plan.invoice_type,
        coverage_start: plan.coverage_start,
        coverage_end: plan.coverage_end,
        rate_per_hour_cents: plan.rate_per_hour_cents,
        subtotal_cents: plan.subtotal_cents,
        due_at: plan.due_at,
        tutor_note,
        cancel_reason,
    };

    let invoice = match InvoiceRepo::create(&mut *conn, &input).await {
        Ok(invoice) => invoice,
        Err(e) if unique_violation(&e) == Some(ACTIVE_INVOICE_CONSTRAINT) => {
            return Err(CoreError::AlreadyBilled.into());
        }
        Err(e) => return Err(e.into()),
    };

    SessionRepo::attach_invoice(&mut *conn, session.id, invoice.id, session.billing_status)
        .await?
        .ok_or(CoreError::AlreadyBilled)?;

    tracing::info!(
        session_id = session.id,
        invoice_id = invoice.id,
        subtotal_cents = invoice.subtotal_cents,
        due_at = %invoice.due_at,
        "Draft invoice created",
    );
    Ok(Some(invoice))
}

/// Void the invoice linked to a locked session, if it is still unpaid.
///
/// Returns the voided invoice, or `None` when nothing is linked or the
/// invoice is past the point of voiding. Locks the invoice after the session.
pub async fn void_linked(
    conn: &mut PgConnection,
    session: &Session,
    reason: &str,
) -> AppResult<Option<Invoice>> {
    let Some(invoice_id) = session.invoice_id else {
        return Ok(None);
    };
    let invoice = InvoiceRepo::find_for_update(&mut *conn, invoice_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Invoice", invoice_id))?;

    if !invoice.status.voidable() {
        tracing::warn!(
            session_id = session.id,
            invoice_id,
            status = invoice.status.as_str(),
            "Linked invoice not voidable, left as is",
        );
        return Ok(None);
    }

    let voided = InvoiceRepo::void(&mut *conn, invoice_id, invoice.status, reason)
        .await?
        .ok_or_else(|| CoreError::Conflict(format!("Invoice {invoice_id} changed while voiding")))?;
    tracing::info!(session_id = session.id, invoice_id, reason, "Invoice voided");
    Ok(Some(voided))
}

/// `POST /invoices`: draft an invoice for one session and, in `AUTHORISED`
/// mode, forward it to the external sink.
///
/// The draft is committed before forwarding. If the sink fails the draft
/// stays in place and can be forwarded later with [`send_invoice`].
pub async fn create_invoice(
    pool: &PgPool,
    sink: &InvoiceSink,
    policy: &BillingPolicy,
    caller: &AuthUser,
    session_id: DbId,
    mode: InvoiceMode,
    tutor_note: Option<String>,
) -> AppResult<InvoiceEffect> {
    let mut tx = pool.begin().await?;
    let session = SessionRepo::find_for_update(&mut *tx, session_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Session", session_id))?;
    ensure_session_owner(session.tutor_id, caller.user_id, caller.is_admin())?;

    let drafted = draft_in_tx(&mut tx, &session, policy, tutor_note, None).await?;
    tx.commit().await?;

    let invoice = match (drafted, mode) {
        (None, _) => {
            return Ok(InvoiceEffect {
                skipped: true,
                invoice: None,
            })
        }
        (Some(invoice), InvoiceMode::Draft) => invoice,
        (Some(invoice), InvoiceMode::Authorised) => forward(pool, sink, caller, invoice.id).await?,
    };

    Ok(InvoiceEffect {
        skipped: false,
        invoice: Some(invoice),
    })
}

/// Forward an existing draft invoice to the external sink.
pub async fn send_invoice(
    pool: &PgPool,
    sink: &InvoiceSink,
    caller: &AuthUser,
    invoice_id: DbId,
) -> AppResult<Invoice> {
    forward(pool, sink, caller, invoice_id).await
}

/// Hand a draft to the sink, then mark it `SENT` and the session `INVOICED`.
///
/// The session and the invoice stay locked across the sink call. A second
/// send blocks until the first commits and then finds the invoice no longer
/// a draft; a sink failure rolls back and leaves the draft untouched.
async fn forward(
    pool: &PgPool,
    sink: &InvoiceSink,
    caller: &AuthUser,
    invoice_id: DbId,
) -> AppResult<Invoice> {
    let unlocked = InvoiceRepo::find_by_id(pool, invoice_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Invoice", invoice_id))?;
    ensure_session_owner(unlocked.tutor_id, caller.user_id, caller.is_admin())?;

    let mut tx = pool.begin().await?;
    SessionRepo::find_for_update(&mut *tx, unlocked.session_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Session", unlocked.session_id))?;
    let invoice = InvoiceRepo::find_for_update(&mut *tx, invoice_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Invoice", invoice_id))?;

    if invoice.status != InvoiceStatus::Draft {
        return Err(CoreError::InvalidTransition(format!(
            "Cannot send an invoice in status {}",
            invoice.status.as_str()
        ))
        .into());
    }

    let receipt = sink.submit(&invoice).await?;

    let sent = InvoiceRepo::mark_sent(&mut *tx, invoice.id, receipt.reference.as_deref())
        .await?
        .ok_or_else(|| {
            CoreError::Conflict(format!("Invoice {} changed while being sent", invoice.id))
        })?;
    SessionRepo::set_billing_status(
        &mut *tx,
        sent.session_id,
        BillingStatus::InvoiceDraft,
        BillingStatus::Invoiced,
    )
    .await?
    .ok_or_else(|| {
        CoreError::Conflict(format!(
            "Session {} billing changed while its invoice was being sent",
            sent.session_id
        ))
    })?;
    tx.commit().await?;

    tracing::info!(invoice_id = sent.id, session_id = sent.session_id, "Invoice sent");
    Ok(sent)
}

/// Credit or forfeit a session's billing (admin only).
///
/// A credit voids the linked invoice if it has not been paid yet.
pub async fn settle(
    pool: &PgPool,
    session_id: DbId,
    settlement: Settlement,
    admin_id: DbId,
) -> AppResult<Session> {
    let mut tx = pool.begin().await?;
    let session = SessionRepo::find_for_update(&mut *tx, session_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Session", session_id))?;

    let target = settlement.target();
    validate_billing_transition(session.billing_status, target)?;

    if settlement == Settlement::Credit {
        void_linked(&mut tx, &session, CREDIT_REASON).await?;
    }

    let updated = SessionRepo::set_billing_status(&mut *tx, session_id, session.billing_status, target)
        .await?
        .ok_or_else(|| CoreError::Conflict(format!("Session {session_id} billing changed")))?;
    tx.commit().await?;

    tracing::info!(
        session_id,
        admin_id,
        billing_status = %updated.billing_status,
        "Session billing settled",
    );
    Ok(updated)
}
