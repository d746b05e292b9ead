//! Invoice entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studyroom_core::billing::{InvoiceMode, InvoiceStatus, InvoiceType};
use studyroom_core::types::{Cents, DbId, FamilyId, Timestamp};
use validator::Validate;

/// A row from the `invoices` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: DbId,
    #[sqlx(try_from = "String")]
    pub status: InvoiceStatus,
    pub client_id: FamilyId,
    pub student_id: FamilyId,
    pub session_id: DbId,
    pub tutor_id: DbId,
    pub tutor_email: String,
    #[sqlx(try_from = "String")]
    pub invoice_type: InvoiceType,
    pub coverage_start: Timestamp,
    pub coverage_end: Timestamp,
    pub rate_per_hour_cents: Cents,
    pub subtotal_cents: Cents,
    pub due_at: Timestamp,
    pub tutor_note: Option<String>,
    pub cancel_reason: Option<String>,
    pub external_ref: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Insert parameters for a new draft invoice.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub client_id: FamilyId,
    pub student_id: FamilyId,
    pub session_id: DbId,
    pub tutor_id: DbId,
    pub tutor_email: String,
    pub invoice_type: InvoiceType,
    pub coverage_start: Timestamp,
    pub coverage_end: Timestamp,
    pub rate_per_hour_cents: Cents,
    pub subtotal_cents: Cents,
    pub due_at: Timestamp,
    pub tutor_note: Option<String>,
    pub cancel_reason: Option<String>,
}

/// DTO for `POST /api/v1/invoices`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    pub session_id: DbId,
    #[serde(default = "default_mode")]
    pub mode: InvoiceMode,
    #[validate(length(max = 2000))]
    pub tutor_note: Option<String>,
}

fn default_mode() -> InvoiceMode {
    InvoiceMode::Draft
}

/// Outcome of an invoicing request.
///
/// `invoice` is `None` when the family is on a prepaid package and the
/// session is covered without a per-session invoice.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceEffect {
    pub skipped: bool,
    pub invoice: Option<Invoice>,
}
