//! Billing status machine and draft-invoice planning.
//!
//! ```text
//! NOT_BILLED ------> READY_TO_INVOICE ---> INVOICE_DRAFT ---> INVOICED
//!     |                   |    \               |    \            |
//!     +--> INVOICE_DRAFT  |     FORFEITED      |     FORFEITED   |
//!                         +--> CREDITED        +--> CREDITED <---+
//! ```
//!
//! A session never returns to NOT_BILLED. The only exits from a billed state
//! are an explicit credit or forfeit.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::pricing::{PackagePlan, PricingPolicy};
use crate::session::{Modality, SessionStatus};
use crate::types::{Cents, DbId, Timestamp};

/// Invoices fall due this long before the session starts.
pub const DEFAULT_INVOICE_DUE_LEAD_HOURS: i64 = 48;

// ---------------------------------------------------------------------------
// Billing status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingStatus {
    NotBilled,
    ReadyToInvoice,
    InvoiceDraft,
    Invoiced,
    Credited,
    Forfeited,
}

impl BillingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BillingStatus::NotBilled => "NOT_BILLED",
            BillingStatus::ReadyToInvoice => "READY_TO_INVOICE",
            BillingStatus::InvoiceDraft => "INVOICE_DRAFT",
            BillingStatus::Invoiced => "INVOICED",
            BillingStatus::Credited => "CREDITED",
            BillingStatus::Forfeited => "FORFEITED",
        }
    }

    /// Parse a stored billing status. `BILLED` is the legacy spelling of
    /// `INVOICED`.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value.trim().to_ascii_uppercase().as_str() {
            "NOT_BILLED" => Ok(BillingStatus::NotBilled),
            "READY_TO_INVOICE" => Ok(BillingStatus::ReadyToInvoice),
            "INVOICE_DRAFT" => Ok(BillingStatus::InvoiceDraft),
            "INVOICED" | "BILLED" => Ok(BillingStatus::Invoiced),
            "CREDITED" => Ok(BillingStatus::Credited),
            "FORFEITED" => Ok(BillingStatus::Forfeited),
            other => Err(CoreError::Validation(format!(
                "Unknown billing status '{other}'"
            ))),
        }
    }

    /// Every stored spelling that decodes to this status.
    pub fn stored_aliases(self) -> &'static [&'static str] {
        match self {
            BillingStatus::NotBilled => &["NOT_BILLED"],
            BillingStatus::ReadyToInvoice => &["READY_TO_INVOICE"],
            BillingStatus::InvoiceDraft => &["INVOICE_DRAFT"],
            BillingStatus::Invoiced => &["INVOICED", "BILLED"],
            BillingStatus::Credited => &["CREDITED"],
            BillingStatus::Forfeited => &["FORFEITED"],
        }
    }

    pub fn valid_transitions(self) -> &'static [BillingStatus] {
        use BillingStatus::*;
        match self {
            NotBilled => &[ReadyToInvoice, InvoiceDraft],
            ReadyToInvoice => &[InvoiceDraft, Credited, Forfeited],
            InvoiceDraft => &[Invoiced, Credited, Forfeited],
            Invoiced => &[Credited],
            Credited | Forfeited => &[],
        }
    }

    pub fn can_transition(self, to: BillingStatus) -> bool {
        self.valid_transitions().contains(&to)
    }
}

impl std::fmt::Display for BillingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate a billing status change.
pub fn validate_billing_transition(
    from: BillingStatus,
    to: BillingStatus,
) -> Result<(), CoreError> {
    if from.can_transition(to) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition(format!(
            "Cannot move billing from {from} to {to}"
        )))
    }
}

/// Billing status after a session completes.
pub fn billing_after_completion(current: BillingStatus) -> BillingStatus {
    match current {
        BillingStatus::NotBilled => BillingStatus::ReadyToInvoice,
        other => other,
    }
}

/// Explicit exits from a billed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Settlement {
    Credit,
    Forfeit,
}

impl Settlement {
    pub fn target(self) -> BillingStatus {
        match self {
            Settlement::Credit => BillingStatus::Credited,
            Settlement::Forfeit => BillingStatus::Forfeited,
        }
    }
}

// ---------------------------------------------------------------------------
// Invoices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Void,
    CancelledByTutor,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "DRAFT",
            InvoiceStatus::Sent => "SENT",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Void => "VOID",
            InvoiceStatus::CancelledByTutor => "CANCELLED_BY_TUTOR",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(InvoiceStatus::Draft),
            "SENT" | "AUTHORISED" => Ok(InvoiceStatus::Sent),
            "PAID" => Ok(InvoiceStatus::Paid),
            "VOID" | "VOIDED" => Ok(InvoiceStatus::Void),
            "CANCELLED_BY_TUTOR" => Ok(InvoiceStatus::CancelledByTutor),
            other => Err(CoreError::Validation(format!(
                "Unknown invoice status '{other}'"
            ))),
        }
    }

    /// Whether crediting the session should void this invoice.
    pub fn voidable(self) -> bool {
        matches!(self, InvoiceStatus::Draft | InvoiceStatus::Sent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceType {
    OneOff,
    /// Bundle invoices raised outside this engine for prepaid families.
    Package,
}

impl InvoiceType {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceType::OneOff => "ONE_OFF",
            InvoiceType::Package => "PACKAGE",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ONE_OFF" => Ok(InvoiceType::OneOff),
            "PACKAGE" => Ok(InvoiceType::Package),
            other => Err(CoreError::Validation(format!(
                "Unknown invoice type '{other}'"
            ))),
        }
    }
}

/// What the caller wants done with a new invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceMode {
    /// Keep the invoice as a local draft.
    Draft,
    /// Create the draft and hand it to the external invoicing sink.
    Authorised,
}

/// `max(now, session_start - lead)`.
pub fn invoice_due_at(now: Timestamp, session_start: Timestamp, lead: Duration) -> Timestamp {
    (session_start - lead).max(now)
}

// ---------------------------------------------------------------------------
// Draft planning
// ---------------------------------------------------------------------------

/// Pricing inputs and due-date rule for new invoices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPolicy {
    pub pricing: PricingPolicy,
    pub due_lead: Duration,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            pricing: PricingPolicy::default(),
            due_lead: Duration::hours(DEFAULT_INVOICE_DUE_LEAD_HOURS),
        }
    }
}

/// The billing-relevant slice of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillableSession {
    pub status: SessionStatus,
    pub billing_status: BillingStatus,
    pub invoice_id: Option<DbId>,
    pub start_at: Timestamp,
    pub end_at: Timestamp,
    pub duration_minutes: i32,
    pub modality: Modality,
}

/// The billing-relevant slice of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientTerms {
    pub package_plan: PackagePlan,
    pub hourly_rate_cents: Option<Cents>,
}

/// A priced invoice ready to be inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftInvoicePlan {
    pub invoice_type: InvoiceType,
    pub coverage_start: Timestamp,
    pub coverage_end: Timestamp,
    pub rate_per_hour_cents: Cents,
    pub subtotal_cents: Cents,
    pub due_at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingDecision {
    Draft(DraftInvoicePlan),
    /// The family is on a prepaid package; nothing to invoice per session.
    SkipPrepaid,
}

/// Check that a session may receive a new invoice.
pub fn ensure_billable(session: &BillableSession) -> Result<(), CoreError> {
    if session.invoice_id.is_some() {
        return Err(CoreError::AlreadyBilled);
    }
    match session.billing_status {
        BillingStatus::NotBilled | BillingStatus::ReadyToInvoice => {}
        _ => return Err(CoreError::AlreadyBilled),
    }
    match session.status {
        SessionStatus::CancelledParent | SessionStatus::CancelledStudyroom => {
            Err(CoreError::InvalidTransition(
                "Cannot invoice a cancelled session".into(),
            ))
        }
        _ => Ok(()),
    }
}

/// Decide what invoice, if any, a session should get right now.
pub fn plan_draft_invoice(
    session: &BillableSession,
    client: &ClientTerms,
    policy: &BillingPolicy,
    now: Timestamp,
) -> Result<BillingDecision, CoreError> {
    ensure_billable(session)?;

    if client.package_plan.is_prepaid() {
        return Ok(BillingDecision::SkipPrepaid);
    }

    let rate = policy
        .pricing
        .rate_per_hour(session.modality, client.hourly_rate_cents);
    let subtotal = crate::pricing::amount_cents(session.duration_minutes, rate);

    Ok(BillingDecision::Draft(DraftInvoicePlan {
        invoice_type: InvoiceType::OneOff,
        coverage_start: session.start_at,
        coverage_end: session.end_at,
        rate_per_hour_cents: rate,
        subtotal_cents: subtotal,
        due_at: invoice_due_at(now, session.start_at, policy.due_lead),
    }))
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

impl TryFrom<String> for BillingStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<String> for InvoiceStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<String> for InvoiceType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}
