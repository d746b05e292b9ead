//! Session scheduling state machine and time-window rules.
//!
//! ```text
//! SCHEDULED --> CONFIRMED
//! SCHEDULED | CONFIRMED --> COMPLETED | CANCELLED_PARENT | CANCELLED_STUDYROOM | NO_SHOW
//! ```
//!
//! COMPLETED, CANCELLED_* and NO_SHOW are terminal.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Shortest billable session. Shorter windows are rounded up to this.
pub const MIN_SESSION_MINUTES: i32 = 15;

/// Longest session a tutor can book in one block.
pub const MAX_SESSION_MINUTES: i32 = 8 * 60;

// ---------------------------------------------------------------------------
// Modality
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    InHome,
    Online,
    Group,
}

impl Modality {
    pub fn as_str(self) -> &'static str {
        match self {
            Modality::InHome => "IN_HOME",
            Modality::Online => "ONLINE",
            Modality::Group => "GROUP",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "IN_HOME" => Ok(Modality::InHome),
            "ONLINE" => Ok(Modality::Online),
            "GROUP" => Ok(Modality::Group),
            other => Err(CoreError::Validation(format!(
                "Unknown modality '{other}'. Must be one of: IN_HOME, ONLINE, GROUP"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Scheduled,
    Confirmed,
    Completed,
    CancelledParent,
    CancelledStudyroom,
    NoShow,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "SCHEDULED",
            SessionStatus::Confirmed => "CONFIRMED",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::CancelledParent => "CANCELLED_PARENT",
            SessionStatus::CancelledStudyroom => "CANCELLED_STUDYROOM",
            SessionStatus::NoShow => "NO_SHOW",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SCHEDULED" => Ok(SessionStatus::Scheduled),
            "CONFIRMED" => Ok(SessionStatus::Confirmed),
            "COMPLETED" => Ok(SessionStatus::Completed),
            "CANCELLED_PARENT" => Ok(SessionStatus::CancelledParent),
            "CANCELLED_STUDYROOM" => Ok(SessionStatus::CancelledStudyroom),
            "NO_SHOW" => Ok(SessionStatus::NoShow),
            other => Err(CoreError::Validation(format!(
                "Unknown session status '{other}'"
            ))),
        }
    }

    pub fn is_terminal(self) -> bool {
        self.valid_transitions().is_empty()
    }

    /// Statuses reachable from `self`.
    pub fn valid_transitions(self) -> &'static [SessionStatus] {
        use SessionStatus::*;
        match self {
            Scheduled => &[
                Confirmed,
                Completed,
                CancelledParent,
                CancelledStudyroom,
                NoShow,
            ],
            Confirmed => &[Completed, CancelledParent, CancelledStudyroom, NoShow],
            Completed | CancelledParent | CancelledStudyroom | NoShow => &[],
        }
    }

    pub fn can_transition(self, to: SessionStatus) -> bool {
        self.valid_transitions().contains(&to)
    }

    /// Lowercase label used in user-facing messages.
    fn label(self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Confirmed => "confirmed",
            SessionStatus::Completed => "completed",
            SessionStatus::CancelledParent | SessionStatus::CancelledStudyroom => "cancelled",
            SessionStatus::NoShow => "no-show",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who called off a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancelInitiator {
    Parent,
    Studyroom,
}

impl CancelInitiator {
    pub fn cancelled_status(self) -> SessionStatus {
        match self {
            CancelInitiator::Parent => SessionStatus::CancelledParent,
            CancelInitiator::Studyroom => SessionStatus::CancelledStudyroom,
        }
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// A mutation requested against a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Confirm,
    Reschedule,
    Complete,
    Cancel(CancelInitiator),
    MarkNoShow,
}

impl SessionAction {
    fn verb(self) -> &'static str {
        match self {
            SessionAction::Confirm => "confirm",
            SessionAction::Reschedule => "reschedule",
            SessionAction::Complete => "complete",
            SessionAction::Cancel(_) => "cancel",
            SessionAction::MarkNoShow => "mark as no-show",
        }
    }

    /// Status the session ends up in, or `None` when the action keeps it.
    pub fn target_status(self) -> Option<SessionStatus> {
        match self {
            SessionAction::Confirm => Some(SessionStatus::Confirmed),
            SessionAction::Reschedule => None,
            SessionAction::Complete => Some(SessionStatus::Completed),
            SessionAction::Cancel(initiator) => Some(initiator.cancelled_status()),
            SessionAction::MarkNoShow => Some(SessionStatus::NoShow),
        }
    }
}

/// Check that `action` is allowed on a session currently in `status`.
///
/// Returns the status to write.
pub fn apply_action(
    status: SessionStatus,
    action: SessionAction,
) -> Result<SessionStatus, CoreError> {
    let reject = || {
        CoreError::InvalidTransition(format!(
            "Cannot {} a {} session",
            action.verb(),
            status.label()
        ))
    };

    match action.target_status() {
        None if status.is_terminal() => Err(reject()),
        None => Ok(status),
        Some(to) if status.can_transition(to) => Ok(to),
        Some(_) => Err(reject()),
    }
}

/// Only the assigned tutor (or an admin) may mutate a session.
pub fn ensure_session_owner(
    session_tutor_id: DbId,
    caller_id: DbId,
    caller_is_admin: bool,
) -> Result<(), CoreError> {
    if caller_is_admin || session_tutor_id == caller_id {
        Ok(())
    } else {
        Err(CoreError::Forbidden(
            "Only the assigned tutor can change this session".into(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Time windows
// ---------------------------------------------------------------------------

/// Duration in whole minutes between `start_at` and `end_at`, rounded to the
/// nearest minute and clamped to [`MIN_SESSION_MINUTES`].
pub fn duration_minutes(start_at: Timestamp, end_at: Timestamp) -> Result<i32, CoreError> {
    if end_at <= start_at {
        return Err(CoreError::Validation(
            "Session end must be after its start".into(),
        ));
    }
    let millis = (end_at - start_at).num_milliseconds();
    let rounded = (millis + 30_000) / 60_000;
    let minutes = i32::try_from(rounded)
        .ok()
        .filter(|m| *m <= MAX_SESSION_MINUTES)
        .ok_or_else(|| {
            CoreError::Validation(format!(
                "Sessions cannot be longer than {MAX_SESSION_MINUTES} minutes"
            ))
        })?;
    Ok(minutes.max(MIN_SESSION_MINUTES))
}

/// Resolve a booking given as start + length into `(end_at, duration_minutes)`.
pub fn session_window(
    start_at: Timestamp,
    requested_minutes: i32,
) -> Result<(Timestamp, i32), CoreError> {
    if requested_minutes <= 0 {
        return Err(CoreError::Validation(
            "durationMinutes must be positive".into(),
        ));
    }
    if requested_minutes > MAX_SESSION_MINUTES {
        return Err(CoreError::Validation(format!(
            "Sessions cannot be longer than {MAX_SESSION_MINUTES} minutes"
        )));
    }
    let minutes = requested_minutes.max(MIN_SESSION_MINUTES);
    Ok((start_at + Duration::minutes(i64::from(minutes)), minutes))
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

impl TryFrom<String> for SessionStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<String> for Modality {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    use super::*;

    fn at(h: u32, m: u32, s: u32) -> Timestamp {
        chrono::Utc
            .with_ymd_and_hms(2025, 3, 10, h, m, s)
            .single()
            .expect("valid timestamp")
    }

    // -----------------------------------------------------------------------
    // State machine
    // -----------------------------------------------------------------------

    #[test]
    fn scheduled_can_be_confirmed() {
        assert_eq!(
            apply_action(SessionStatus::Scheduled, SessionAction::Confirm),
            Ok(SessionStatus::Confirmed)
        );
    }

    #[test]
    fn confirmed_cannot_be_confirmed_again() {
        assert_matches!(
            apply_action(SessionStatus::Confirmed, SessionAction::Confirm),
            Err(CoreError::InvalidTransition(_))
        );
    }

    #[test]
    fn completion_from_scheduled_and_confirmed() {
        for from in [SessionStatus::Scheduled, SessionStatus::Confirmed] {
            assert_eq!(
                apply_action(from, SessionAction::Complete),
                Ok(SessionStatus::Completed)
            );
        }
    }

    #[test]
    fn cancel_maps_initiator_to_status() {
        assert_eq!(
            apply_action(
                SessionStatus::Scheduled,
                SessionAction::Cancel(CancelInitiator::Parent)
            ),
            Ok(SessionStatus::CancelledParent)
        );
        assert_eq!(
            apply_action(
                SessionStatus::Confirmed,
                SessionAction::Cancel(CancelInitiator::Studyroom)
            ),
            Ok(SessionStatus::CancelledStudyroom)
        );
    }

    #[test]
    fn terminal_states_reject_every_action() {
        let terminal = [
            SessionStatus::Completed,
            SessionStatus::CancelledParent,
            SessionStatus::CancelledStudyroom,
            SessionStatus::NoShow,
        ];
        let actions = [
            SessionAction::Confirm,
            SessionAction::Reschedule,
            SessionAction::Complete,
            SessionAction::Cancel(CancelInitiator::Parent),
            SessionAction::MarkNoShow,
        ];
        for status in terminal {
            assert!(status.is_terminal());
            for action in actions {
                assert_matches!(
                    apply_action(status, action),
                    Err(CoreError::InvalidTransition(_)),
                    "{status} must reject {action:?}"
                );
            }
        }
    }

    #[test]
    fn reschedule_keeps_status() {
        assert_eq!(
            apply_action(SessionStatus::Confirmed, SessionAction::Reschedule),
            Ok(SessionStatus::Confirmed)
        );
    }

    #[test]
    fn rejection_message_names_the_action() {
        let err = apply_action(
            SessionStatus::Completed,
            SessionAction::Cancel(CancelInitiator::Parent),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Cannot cancel a completed session");

        let err = apply_action(SessionStatus::NoShow, SessionAction::Reschedule).unwrap_err();
        assert_eq!(err.to_string(), "Cannot reschedule a no-show session");
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            SessionStatus::Scheduled,
            SessionStatus::CancelledStudyroom,
            SessionStatus::NoShow,
        ] {
            assert_eq!(SessionStatus::parse(status.as_str()), Ok(status));
        }
    }

    #[test]
    fn modality_parses_loose_spelling() {
        assert_eq!(Modality::parse("in-home"), Ok(Modality::InHome));
        assert_eq!(Modality::parse("online"), Ok(Modality::Online));
        assert!(Modality::parse("phone").is_err());
    }

    // -----------------------------------------------------------------------
    // Ownership
    // -----------------------------------------------------------------------

    #[test]
    fn only_owner_or_admin_may_mutate() {
        assert!(ensure_session_owner(5, 5, false).is_ok());
        assert!(ensure_session_owner(5, 9, true).is_ok());
        assert_matches!(
            ensure_session_owner(5, 9, false),
            Err(CoreError::Forbidden(_))
        );
    }

    // -----------------------------------------------------------------------
    // Durations
    // -----------------------------------------------------------------------

    #[test]
    fn duration_of_an_hour() {
        assert_eq!(duration_minutes(at(10, 0, 0), at(11, 0, 0)), Ok(60));
    }

    #[test]
    fn duration_rounds_to_nearest_minute() {
        assert_eq!(duration_minutes(at(10, 0, 0), at(10, 45, 29)), Ok(45));
        assert_eq!(duration_minutes(at(10, 0, 0), at(10, 45, 30)), Ok(46));
    }

    #[test]
    fn short_sessions_clamp_to_minimum() {
        assert_eq!(
            duration_minutes(at(10, 0, 0), at(10, 5, 0)),
            Ok(MIN_SESSION_MINUTES)
        );
    }

    #[test]
    fn end_before_start_is_rejected() {
        assert_matches!(
            duration_minutes(at(11, 0, 0), at(10, 0, 0)),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            duration_minutes(at(11, 0, 0), at(11, 0, 0)),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn overlong_session_is_rejected() {
        let start = at(8, 0, 0);
        let end = start + Duration::hours(9);
        assert_matches!(duration_minutes(start, end), Err(CoreError::Validation(_)));
    }

    #[test]
    fn window_from_requested_length() {
        let (end, minutes) = session_window(at(10, 0, 0), 90).unwrap();
        assert_eq!(end, at(11, 30, 0));
        assert_eq!(minutes, 90);
    }

    #[test]
    fn window_clamps_short_requests() {
        let (end, minutes) = session_window(at(10, 0, 0), 10).unwrap();
        assert_eq!(minutes, MIN_SESSION_MINUTES);
        assert_eq!(end, at(10, 15, 0));
        assert_eq!(duration_minutes(at(10, 0, 0), end), Ok(minutes));
    }

    #[test]
    fn window_rejects_non_positive_length() {
        assert_matches!(
            session_window(at(10, 0, 0), 0),
            Err(CoreError::Validation(_))
        );
    }
}
