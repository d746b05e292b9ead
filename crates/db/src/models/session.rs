//! Session entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studyroom_core::billing::{BillableSession, BillingStatus, Settlement};
use studyroom_core::cancellation::CancellationOutcome;
use studyroom_core::session::{CancelInitiator, Modality, SessionStatus};
use studyroom_core::types::{DbId, FamilyId, Timestamp};
use validator::Validate;

use super::invoice::Invoice;

/// A row from the `sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: DbId,
    pub tutor_id: DbId,
    pub tutor_email: String,
    pub student_id: FamilyId,
    pub client_id: FamilyId,
    pub start_at: Timestamp,
    pub end_at: Timestamp,
    pub duration_minutes: i32,
    #[sqlx(try_from = "String")]
    pub modality: Modality,
    #[sqlx(try_from = "String")]
    pub status: SessionStatus,
    #[sqlx(try_from = "String")]
    pub billing_status: BillingStatus,
    pub invoice_id: Option<DbId>,
    pub series_key: Option<String>,
    pub notes: Option<String>,
    pub cancel_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
}

impl Session {
    pub fn billable(&self) -> BillableSession {
        BillableSession {
            status: self.status,
            billing_status: self.billing_status,
            invoice_id: self.invoice_id,
            start_at: self.start_at,
            end_at: self.end_at,
            duration_minutes: self.duration_minutes,
            modality: self.modality,
        }
    }
}

/// Insert parameters for a new session row.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub tutor_id: DbId,
    pub tutor_email: String,
    pub student_id: FamilyId,
    pub client_id: FamilyId,
    pub start_at: Timestamp,
    pub end_at: Timestamp,
    pub duration_minutes: i32,
    pub modality: Modality,
    pub series_key: Option<String>,
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// DTO for `POST /api/v1/sessions`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub student_id: FamilyId,
    pub start_at: Timestamp,
    #[validate(range(min = 1, max = 480))]
    pub duration_minutes: i32,
    /// Defaults to the student's mode.
    pub modality: Option<Modality>,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
}

/// DTO for `POST /api/v1/sessions/{id}/reschedule`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleRequest {
    pub start_at: Timestamp,
    pub end_at: Timestamp,
}

/// DTO for `POST /api/v1/sessions/{id}/complete`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    /// Create the draft invoice in the same transaction.
    #[serde(default)]
    pub invoice_now: bool,
}

/// DTO for `POST /api/v1/sessions/{id}/cancel`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub initiator: CancelInitiator,
    #[validate(length(max = 2000))]
    pub reason: Option<String>,
}

/// DTO for `POST /api/v1/sessions/{id}/recurrence`.
#[derive(Debug, Deserialize)]
pub struct ExpandRecurringRequest {
    /// Clamped to `[1, 12]`.
    pub weeks: i32,
}

/// DTO for `POST /api/v1/admin/sessions/{id}/settle`.
#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    pub settlement: Settlement,
}

/// Query parameters for `GET /api/v1/sessions`.
#[derive(Debug, Deserialize)]
pub struct SessionListQuery {
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Effect summaries
// ---------------------------------------------------------------------------

/// Result of a cancellation: the updated session, what the policy decided,
/// the invoice created because of it, and any earlier invoice it voided.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelEffect {
    pub session: Session,
    pub policy: CancellationOutcome,
    pub invoice: Option<Invoice>,
    pub voided_invoice: Option<Invoice>,
}

/// Result of completing a session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteEffect {
    pub session: Session,
    pub invoice: Option<Invoice>,
}

/// Result of a recurrence expansion.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesEffect {
    pub series_key: String,
    pub sessions: Vec<Session>,
}
