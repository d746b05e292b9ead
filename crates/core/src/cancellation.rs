//! Late-cancellation policy.
//!
//! A cancellation is late when it lands inside the notice window before the
//! session start (or after the start). Late cancellations are billed as if the
//! session had gone ahead, subject to a per-initiator switch.

use chrono::Duration;
use serde::Serialize;

use crate::session::CancelInitiator;
use crate::types::Timestamp;

/// Default notice window before a session starts.
pub const DEFAULT_NOTICE_WINDOW_HOURS: i64 = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationPolicy {
    pub notice_window: Duration,
    pub invoice_late_parent: bool,
    pub invoice_late_studyroom: bool,
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self::with_notice_hours(DEFAULT_NOTICE_WINDOW_HOURS)
    }
}

/// Result of evaluating a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationOutcome {
    pub late: bool,
    pub invoice_triggered: bool,
}

impl CancellationPolicy {
    /// Policy with the given window that invoices late cancellations from
    /// either party.
    pub fn with_notice_hours(hours: i64) -> Self {
        Self {
            notice_window: Duration::hours(hours),
            invoice_late_parent: true,
            invoice_late_studyroom: true,
        }
    }

    pub fn is_late(&self, start_at: Timestamp, cancelled_at: Timestamp) -> bool {
        cancelled_at > start_at - self.notice_window
    }

    pub fn evaluate(
        &self,
        start_at: Timestamp,
        cancelled_at: Timestamp,
        initiator: CancelInitiator,
    ) -> CancellationOutcome {
        let late = self.is_late(start_at, cancelled_at);
        let invoices = match initiator {
            CancelInitiator::Parent => self.invoice_late_parent,
            CancelInitiator::Studyroom => self.invoice_late_studyroom,
        };
        CancellationOutcome {
            late,
            invoice_triggered: late && invoices,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn start() -> Timestamp {
        chrono::Utc
            .with_ymd_and_hms(2025, 6, 20, 16, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn ten_hours_before_is_late_and_invoiced() {
        let policy = CancellationPolicy::default();
        let outcome = policy.evaluate(
            start(),
            start() - Duration::hours(10),
            CancelInitiator::Parent,
        );
        assert_eq!(
            outcome,
            CancellationOutcome {
                late: true,
                invoice_triggered: true
            }
        );
    }

    #[test]
    fn five_days_before_is_not_invoiced() {
        let policy = CancellationPolicy::default();
        let outcome = policy.evaluate(
            start(),
            start() - Duration::days(5),
            CancelInitiator::Parent,
        );
        assert!(!outcome.late);
        assert!(!outcome.invoice_triggered);
    }

    #[test]
    fn exactly_at_window_edge_is_on_time() {
        let policy = CancellationPolicy::default();
        assert!(!policy.is_late(start(), start() - Duration::hours(48)));
        assert!(policy.is_late(
            start(),
            start() - Duration::hours(48) + Duration::seconds(1)
        ));
    }

    #[test]
    fn cancelling_after_start_is_late() {
        let policy = CancellationPolicy::default();
        assert!(policy.is_late(start(), start() + Duration::minutes(5)));
    }

    #[test]
    fn both_initiators_are_treated_alike_by_default() {
        let policy = CancellationPolicy::default();
        let when = start() - Duration::hours(3);
        assert_eq!(
            policy.evaluate(start(), when, CancelInitiator::Parent),
            policy.evaluate(start(), when, CancelInitiator::Studyroom)
        );
    }

    #[test]
    fn initiator_switch_suppresses_invoice_but_not_lateness() {
        let policy = CancellationPolicy {
            invoice_late_studyroom: false,
            ..CancellationPolicy::default()
        };
        let outcome = policy.evaluate(
            start(),
            start() - Duration::hours(3),
            CancelInitiator::Studyroom,
        );
        assert!(outcome.late);
        assert!(!outcome.invoice_triggered);
    }

    #[test]
    fn custom_window() {
        let policy = CancellationPolicy::with_notice_hours(24);
        assert!(!policy.is_late(start(), start() - Duration::hours(30)));
        assert!(policy.is_late(start(), start() - Duration::hours(20)));
    }
}
