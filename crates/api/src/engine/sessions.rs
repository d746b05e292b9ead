//! Session lifecycle: booking, confirmation, reschedule, completion,
//! cancellation, no-show and weekly recurrence.
//!
//! Every mutation locks the session row, checks ownership and the status
//! machine against the locked state, and writes with the observed status in
//! the `WHERE` clause.

use sqlx::{PgConnection, PgPool};
use studyroom_core::billing::{
    billing_after_completion, ensure_billable, validate_billing_transition, BillingPolicy,
    BillingStatus, InvoiceStatus,
};
use studyroom_core::cancellation::CancellationPolicy;
use studyroom_core::error::CoreError;
use studyroom_core::recurrence::{series_key, weekly_occurrences};
use studyroom_core::session::{
    apply_action, duration_minutes, ensure_session_owner, session_window, SessionAction,
    SessionStatus,
};
use studyroom_core::types::{DbId, Timestamp};
use studyroom_db::models::session::{
    CancelEffect, CancelRequest, CompleteEffect, CreateSessionRequest, NewSession, SeriesEffect,
    Session,
};
use studyroom_db::repositories::{InvoiceRepo, SessionRepo, StudentRepo};

use crate::engine::billing::{draft_in_tx, void_linked};
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;

/// Reason stored on invoices raised by a late cancellation.
const LATE_CANCELLATION_REASON: &str = "Late cancellation";
/// Reason stored on invoices voided by a cancellation with enough notice.
const TIMELY_CANCELLATION_REASON: &str = "Cancelled with notice";
/// Reason stored on draft invoices replaced after a reschedule.
const RESCHEDULE_REASON: &str = "Rescheduled";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Lock a session and verify the caller may change it.
async fn lock_owned(conn: &mut PgConnection, id: DbId, caller: &AuthUser) -> AppResult<Session> {
    let session = SessionRepo::find_for_update(&mut *conn, id)
        .await?
        .ok_or_else(|| CoreError::not_found("Session", id))?;
    ensure_session_owner(session.tutor_id, caller.user_id, caller.is_admin())?;
    Ok(session)
}

fn moved(id: DbId) -> CoreError {
    CoreError::Conflict(format!("Session {id} was modified concurrently"))
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// Book a session for one of the caller's students.
///
/// The session belongs to the student's assigned tutor; admins may book on
/// that tutor's behalf.
pub async fn create_session(
    pool: &PgPool,
    caller: &AuthUser,
    input: &CreateSessionRequest,
) -> AppResult<Session> {
    let student = StudentRepo::find_by_id(pool, input.student_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Student", input.student_id))?;

    let (tutor_id, tutor_email) = match (student.assigned_tutor_id, student.assigned_tutor_email) {
        (Some(id), Some(email)) => (id, email),
        _ => {
            return Err(CoreError::Validation(
                "Student has no assigned tutor".into(),
            )
            .into())
        }
    };
    ensure_session_owner(tutor_id, caller.user_id, caller.is_admin())?;

    let (end_at, minutes) = session_window(input.start_at, input.duration_minutes)?;
    let modality = input
        .modality
        .unwrap_or_else(|| student.mode.default_modality());

    let session = SessionRepo::create(
        pool,
        &NewSession {
            tutor_id,
            tutor_email,
            student_id: student.id,
            client_id: student.client_id,
            start_at: input.start_at,
            end_at,
            duration_minutes: minutes,
            modality,
            series_key: None,
            notes: input.notes.clone(),
        },
    )
    .await?;

    tracing::info!(
        session_id = session.id,
        tutor_id,
        student_id = %session.student_id,
        start_at = %session.start_at,
        "Session created",
    );
    Ok(session)
}

// ---------------------------------------------------------------------------
// Plain transitions
// ---------------------------------------------------------------------------

pub async fn confirm(pool: &PgPool, id: DbId, caller: &AuthUser) -> AppResult<Session> {
    transition(pool, id, caller, SessionAction::Confirm).await
}

pub async fn mark_no_show(pool: &PgPool, id: DbId, caller: &AuthUser) -> AppResult<Session> {
    transition(pool, id, caller, SessionAction::MarkNoShow).await
}

async fn transition(
    pool: &PgPool,
    id: DbId,
    caller: &AuthUser,
    action: SessionAction,
) -> AppResult<Session> {
    let mut tx = pool.begin().await?;
    let session = lock_owned(&mut tx, id, caller).await?;
    let to = apply_action(session.status, action)?;

    let updated = SessionRepo::set_status(&mut *tx, id, session.status, to)
        .await?
        .ok_or_else(|| moved(id))?;
    tx.commit().await?;

    tracing::info!(session_id = id, from = %session.status, to = %to, "Session status changed");
    Ok(updated)
}

// ---------------------------------------------------------------------------
// Reschedule
// ---------------------------------------------------------------------------

/// Move a live session to a new window. Terminal sessions are rejected.
///
/// A draft invoice raised ahead of time is voided and redrafted for the new
/// window in the same transaction. Once the invoice has been sent the
/// session can no longer be moved.
pub async fn reschedule(
    pool: &PgPool,
    id: DbId,
    caller: &AuthUser,
    start_at: Timestamp,
    end_at: Timestamp,
    billing: &BillingPolicy,
) -> AppResult<Session> {
    let mut tx = pool.begin().await?;
    let session = lock_owned(&mut tx, id, caller).await?;
    let status = apply_action(session.status, SessionAction::Reschedule)?;
    let minutes = duration_minutes(start_at, end_at)?;

    let redraft = match (session.billing_status, session.invoice_id) {
        (BillingStatus::Invoiced, _) => {
            return Err(CoreError::InvalidTransition(
                "Cannot reschedule a session whose invoice has been sent".into(),
            )
            .into())
        }
        (BillingStatus::InvoiceDraft, Some(invoice_id)) => {
            let invoice = InvoiceRepo::find_for_update(&mut *tx, invoice_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Invoice", invoice_id))?;
            if invoice.status != InvoiceStatus::Draft {
                return Err(CoreError::InvalidTransition(format!(
                    "Cannot reschedule a session with a {} invoice",
                    invoice.status.as_str()
                ))
                .into());
            }
            InvoiceRepo::void(&mut *tx, invoice_id, InvoiceStatus::Draft, RESCHEDULE_REASON)
                .await?
                .ok_or_else(|| moved(id))?;
            SessionRepo::detach_invoice(&mut *tx, id, invoice_id, BillingStatus::NotBilled)
                .await?
                .ok_or_else(|| moved(id))?;
            Some(invoice)
        }
        _ => None,
    };

    let mut updated = SessionRepo::reschedule(&mut *tx, id, status, start_at, end_at, minutes)
        .await?
        .ok_or_else(|| moved(id))?;

    if let Some(previous) = &redraft {
        let replacement =
            draft_in_tx(&mut tx, &updated, billing, previous.tutor_note.clone(), None).await?;
        if let Some(replacement) = replacement {
            tracing::info!(
                session_id = id,
                voided_invoice_id = previous.id,
                invoice_id = replacement.id,
                "Draft invoice replaced after reschedule",
            );
            updated = SessionRepo::find_by_id(&mut *tx, id)
                .await?
                .ok_or_else(|| moved(id))?;
        }
    }
    tx.commit().await?;

    tracing::info!(
        session_id = id,
        start_at = %updated.start_at,
        duration_minutes = minutes,
        "Session rescheduled",
    );
    Ok(updated)
}

// ---------------------------------------------------------------------------
// Complete
// ---------------------------------------------------------------------------

/// Mark a session completed. Billing moves to `READY_TO_INVOICE`, or straight
/// to a draft invoice when `invoice_now` is set.
pub async fn complete(
    pool: &PgPool,
    id: DbId,
    caller: &AuthUser,
    invoice_now: bool,
    policy: &BillingPolicy,
) -> AppResult<CompleteEffect> {
    let mut tx = pool.begin().await?;
    let session = lock_owned(&mut tx, id, caller).await?;
    apply_action(session.status, SessionAction::Complete)?;

    let mut updated = SessionRepo::complete(
        &mut *tx,
        id,
        session.status,
        billing_after_completion(session.billing_status),
    )
    .await?
    .ok_or_else(|| moved(id))?;

    // A session invoiced ahead of time keeps its existing invoice.
    let invoice = if invoice_now && ensure_billable(&updated.billable()).is_ok() {
        let invoice = draft_in_tx(&mut tx, &updated, policy, None, None).await?;
        if invoice.is_some() {
            updated = SessionRepo::find_by_id(&mut *tx, id)
                .await?
                .ok_or_else(|| moved(id))?;
        }
        invoice
    } else {
        None
    };
    tx.commit().await?;

    tracing::info!(
        session_id = id,
        billing_status = %updated.billing_status,
        invoiced = invoice.is_some(),
        "Session completed",
    );
    Ok(CompleteEffect {
        session: updated,
        invoice,
    })
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

/// Cancel a session on behalf of `initiator`.
///
/// The cancellation policy runs against the session as it was before the
/// cancel. When it triggers, the draft invoice is created first, in the same
/// transaction, so a failed invoice leaves the session untouched. A late
/// cancel of a session that is already billed keeps its invoice and no second
/// one is raised. A cancel with enough notice voids any invoice raised ahead
/// of time and credits the session.
pub async fn cancel(
    pool: &PgPool,
    id: DbId,
    caller: &AuthUser,
    request: &CancelRequest,
    now: Timestamp,
    cancellation: &CancellationPolicy,
    billing: &BillingPolicy,
) -> AppResult<CancelEffect> {
    let initiator = request.initiator;
    let reason = request.reason.as_deref();

    let mut tx = pool.begin().await?;
    let session = lock_owned(&mut tx, id, caller).await?;
    let to = apply_action(session.status, SessionAction::Cancel(initiator))?;

    let outcome = cancellation.evaluate(session.start_at, now, initiator);
    let billable = ensure_billable(&session.billable()).is_ok();

    let credit_prebilled = !outcome.invoice_triggered
        && session.invoice_id.is_some()
        && validate_billing_transition(session.billing_status, BillingStatus::Credited).is_ok();

    let invoice = if outcome.invoice_triggered && billable {
        draft_in_tx(
            &mut tx,
            &session,
            billing,
            None,
            Some(reason.unwrap_or(LATE_CANCELLATION_REASON).to_string()),
        )
        .await?
    } else {
        None
    };

    let voided_invoice = if credit_prebilled {
        let voided =
            void_linked(&mut tx, &session, reason.unwrap_or(TIMELY_CANCELLATION_REASON)).await?;
        SessionRepo::set_billing_status(
            &mut *tx,
            id,
            session.billing_status,
            BillingStatus::Credited,
        )
        .await?
        .ok_or_else(|| moved(id))?;
        voided
    } else {
        None
    };

    let updated = SessionRepo::cancel(&mut *tx, id, session.status, to, now, reason)
        .await?
        .ok_or_else(|| moved(id))?;
    tx.commit().await?;

    tracing::info!(
        session_id = id,
        status = %to,
        late = outcome.late,
        invoice_triggered = outcome.invoice_triggered,
        invoice_id = invoice.as_ref().map(|i| i.id),
        voided_invoice_id = voided_invoice.as_ref().map(|i| i.id),
        "Session cancelled",
    );
    Ok(CancelEffect {
        session: updated,
        policy: outcome,
        invoice,
        voided_invoice,
    })
}

// ---------------------------------------------------------------------------
// Recurrence
// ---------------------------------------------------------------------------

/// Create weekly copies of a session for the next `weeks` weeks (clamped to
/// 1..=12). All copies, and the base, share one series key.
pub async fn expand_recurring(
    pool: &PgPool,
    id: DbId,
    caller: &AuthUser,
    weeks: i32,
) -> AppResult<SeriesEffect> {
    let mut tx = pool.begin().await?;
    let base = lock_owned(&mut tx, id, caller).await?;
    if matches!(
        base.status,
        SessionStatus::CancelledParent | SessionStatus::CancelledStudyroom
    ) {
        return Err(CoreError::InvalidTransition("Cannot repeat a cancelled session".into()).into());
    }

    let key = series_key(base.id, base.series_key.as_deref());
    if base.series_key.as_deref() != Some(key.as_str()) {
        SessionRepo::set_series_key(&mut *tx, base.id, &key).await?;
    }

    let mut sessions = Vec::new();
    for (start_at, end_at) in weekly_occurrences(base.start_at, base.end_at, weeks) {
        let created = SessionRepo::create(
            &mut *tx,
            &NewSession {
                tutor_id: base.tutor_id,
                tutor_email: base.tutor_email.clone(),
                student_id: base.student_id,
                client_id: base.client_id,
                start_at,
                end_at,
                duration_minutes: base.duration_minutes,
                modality: base.modality,
                series_key: Some(key.clone()),
                notes: base.notes.clone(),
            },
        )
        .await?;
        sessions.push(created);
    }
    tx.commit().await?;

    tracing::info!(
        session_id = id,
        series_key = %key,
        created = sessions.len(),
        "Recurring sessions created",
    );
    Ok(SeriesEffect {
        series_key: key,
        sessions,
    })
}

/// Every session in `series_key`, for the owning tutor (or an admin).
pub async fn list_series(
    pool: &PgPool,
    series_key: &str,
    caller: &AuthUser,
) -> AppResult<Vec<Session>> {
    let sessions = SessionRepo::list_series(pool, series_key).await?;
    if let Some(first) = sessions.first() {
        ensure_session_owner(first.tutor_id, caller.user_id, caller.is_admin())?;
    }
    Ok(sessions)
}
