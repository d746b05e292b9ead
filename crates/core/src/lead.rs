//! Lead status machine, claim preconditions and intake normalization.
//!
//! Lead status is stored as text. Every read goes through [`LeadStatus::parse`],
//! which is also where legacy values are migrated (`claimed` -> `assigned`,
//! `closed` -> `contacted`).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::session::Modality;
use crate::types::{DbId, FamilyId};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Contacted,
    Assigned,
    Converted,
}

impl LeadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Assigned => "assigned",
            LeadStatus::Converted => "converted",
        }
    }

    /// Parse a stored status, migrating legacy values.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(LeadStatus::New),
            "contacted" | "closed" => Ok(LeadStatus::Contacted),
            "assigned" | "claimed" => Ok(LeadStatus::Assigned),
            "converted" => Ok(LeadStatus::Converted),
            other => Err(CoreError::Validation(format!(
                "Unknown lead status '{other}'"
            ))),
        }
    }

    /// Every stored spelling that normalizes to this status.
    pub fn stored_aliases(self) -> &'static [&'static str] {
        match self {
            LeadStatus::New => &["new"],
            LeadStatus::Contacted => &["contacted", "closed"],
            LeadStatus::Assigned => &["assigned", "claimed"],
            LeadStatus::Converted => &["converted"],
        }
    }

    fn valid_transitions(self) -> &'static [LeadStatus] {
        match self {
            LeadStatus::New => &[LeadStatus::Contacted, LeadStatus::Assigned],
            LeadStatus::Contacted => &[LeadStatus::Assigned],
            LeadStatus::Assigned => &[LeadStatus::Converted],
            LeadStatus::Converted => &[],
        }
    }

    pub fn can_transition(self, to: LeadStatus) -> bool {
        self.valid_transitions().contains(&to)
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate a manual (admin) status change.
///
/// Moving a lead to `assigned` is only possible through claim or assignment,
/// because those also materialize the family records.
pub fn validate_status_update(from: LeadStatus, to: LeadStatus) -> Result<(), CoreError> {
    if to == LeadStatus::Assigned {
        return Err(CoreError::Validation(
            "Leads are assigned through claim or admin assignment".into(),
        ));
    }
    if !from.can_transition(to) {
        return Err(CoreError::InvalidTransition(format!(
            "Cannot move lead from {from} to {to}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Claim preconditions
// ---------------------------------------------------------------------------

/// Check that a tutor may claim a lead.
///
/// Must be evaluated against the locked row inside the claim transaction.
/// An existing claim wins over the status check so two racing tutors both
/// see `AlreadyClaimed` regardless of which status the winner wrote.
pub fn validate_claimable(
    status: LeadStatus,
    claimed_tutor_id: Option<DbId>,
) -> Result<(), CoreError> {
    if claimed_tutor_id.is_some() {
        return Err(CoreError::AlreadyClaimed);
    }
    if status != LeadStatus::New {
        return Err(CoreError::NotOpen);
    }
    Ok(())
}

/// Check that an admin may assign a lead. Contacted leads are still open to
/// assignment; claimed ones are not.
pub fn validate_assignable(
    status: LeadStatus,
    claimed_tutor_id: Option<DbId>,
) -> Result<(), CoreError> {
    if claimed_tutor_id.is_some() {
        return Err(CoreError::AlreadyClaimed);
    }
    match status {
        LeadStatus::New | LeadStatus::Contacted => Ok(()),
        _ => Err(CoreError::NotOpen),
    }
}

/// Client and student ids materialized from a lead.
///
/// Both reuse the lead id so a retried claim upserts the same rows.
pub fn materialized_ids(lead_id: FamilyId) -> (FamilyId, FamilyId) {
    (lead_id, lead_id)
}

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Delivery mode a family asks for at intake.
///
/// Request bodies are decoded through [`LeadMode::parse`], so JSON accepts the
/// same spellings as stored rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum LeadMode {
    #[serde(rename = "online")]
    Online,
    #[serde(rename = "in-home")]
    InHome,
}

impl LeadMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LeadMode::Online => "online",
            LeadMode::InHome => "in-home",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "online" => Ok(LeadMode::Online),
            "in-home" | "in_home" | "inhome" | "home" => Ok(LeadMode::InHome),
            other => Err(CoreError::Validation(format!(
                "Unknown mode '{other}'. Must be one of: online, in-home"
            ))),
        }
    }

    /// Default session modality for a family in this mode.
    pub fn default_modality(self) -> Modality {
        match self {
            LeadMode::Online => Modality::Online,
            LeadMode::InHome => Modality::InHome,
        }
    }
}

// ---------------------------------------------------------------------------
// Availability
// ---------------------------------------------------------------------------

pub const AVAILABILITY_DAYS: &[&str] = &["mon", "tue", "wed", "thu", "fri", "sat", "sun"];
pub const AVAILABILITY_SLOTS: &[&str] = &["morning", "afternoon", "evening"];

/// Normalize `day-slot` availability tokens (e.g. `Mon-Afternoon` ->
/// `mon-afternoon`), dropping duplicates.
pub fn normalize_availability(tokens: &[String]) -> Result<Vec<String>, CoreError> {
    let mut out = BTreeSet::new();
    for raw in tokens {
        let token = raw.trim().to_ascii_lowercase();
        let valid = token
            .split_once('-')
            .is_some_and(|(day, slot)| {
                AVAILABILITY_DAYS.contains(&day) && AVAILABILITY_SLOTS.contains(&slot)
            });
        if !valid {
            return Err(CoreError::Validation(format!(
                "Invalid availability '{raw}'. Expected <day>-<slot>, e.g. mon-afternoon"
            )));
        }
        out.insert(token);
    }
    Ok(out.into_iter().collect())
}

/// Trim, drop empties and dedupe a subject list, keeping first-seen order.
pub fn normalize_subjects(subjects: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    subjects
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_ascii_lowercase()))
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

impl TryFrom<String> for LeadStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<String> for LeadMode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn mode_json_accepts_the_same_spellings_as_parse() {
        for raw in ["\"in-home\"", "\"in_home\"", "\"InHome\"", "\"home\""] {
            let mode: LeadMode = serde_json::from_str(raw).unwrap();
            assert_eq!(mode, LeadMode::InHome, "{raw}");
        }
        let online: LeadMode = serde_json::from_str("\"Online\"").unwrap();
        assert_eq!(online, LeadMode::Online);
        assert!(serde_json::from_str::<LeadMode>("\"carrier-pigeon\"").is_err());
        assert_eq!(serde_json::to_string(&LeadMode::InHome).unwrap(), "\"in-home\"");
    }

    #[test]
    fn legacy_statuses_are_normalized() {
        assert_eq!(LeadStatus::parse("claimed").unwrap(), LeadStatus::Assigned);
        assert_eq!(LeadStatus::parse("closed").unwrap(), LeadStatus::Contacted);
        assert_eq!(LeadStatus::parse(" NEW ").unwrap(), LeadStatus::New);
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert_matches!(LeadStatus::parse("archived"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn open_lead_is_claimable() {
        assert!(validate_claimable(LeadStatus::New, None).is_ok());
    }

    #[test]
    fn claimed_lead_reports_already_claimed() {
        assert_eq!(
            validate_claimable(LeadStatus::Assigned, Some(7)),
            Err(CoreError::AlreadyClaimed)
        );
        // A stray claim on a `new` lead still blocks a second claim.
        assert_eq!(
            validate_claimable(LeadStatus::New, Some(7)),
            Err(CoreError::AlreadyClaimed)
        );
    }

    #[test]
    fn contacted_lead_is_not_open_for_claim() {
        assert_eq!(
            validate_claimable(LeadStatus::Contacted, None),
            Err(CoreError::NotOpen)
        );
    }

    #[test]
    fn admin_can_assign_contacted_lead() {
        assert!(validate_assignable(LeadStatus::Contacted, None).is_ok());
        assert_eq!(
            validate_assignable(LeadStatus::Converted, None),
            Err(CoreError::NotOpen)
        );
    }

    #[test]
    fn manual_update_cannot_assign() {
        assert_matches!(
            validate_status_update(LeadStatus::New, LeadStatus::Assigned),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn manual_update_follows_transitions() {
        assert!(validate_status_update(LeadStatus::New, LeadStatus::Contacted).is_ok());
        assert!(validate_status_update(LeadStatus::Assigned, LeadStatus::Converted).is_ok());
        assert_matches!(
            validate_status_update(LeadStatus::Converted, LeadStatus::Contacted),
            Err(CoreError::InvalidTransition(_))
        );
    }

    #[test]
    fn claim_ids_reuse_lead_id() {
        let lead = uuid::Uuid::new_v4();
        assert_eq!(materialized_ids(lead), (lead, lead));
    }

    #[test]
    fn mode_parsing_accepts_variants() {
        assert_eq!(LeadMode::parse("In-Home").unwrap(), LeadMode::InHome);
        assert_eq!(LeadMode::parse("in_home").unwrap(), LeadMode::InHome);
        assert_eq!(LeadMode::parse("online").unwrap(), LeadMode::Online);
        assert!(LeadMode::parse("carrier pigeon").is_err());
    }

    #[test]
    fn availability_is_lowercased_and_deduped() {
        let tokens = vec![
            "Mon-Afternoon".to_string(),
            "mon-afternoon".to_string(),
            "sat-morning".to_string(),
        ];
        assert_eq!(
            normalize_availability(&tokens).unwrap(),
            vec!["mon-afternoon".to_string(), "sat-morning".to_string()]
        );
    }

    #[test]
    fn bad_availability_token_is_rejected() {
        let tokens = vec!["someday-lunch".to_string()];
        assert_matches!(normalize_availability(&tokens), Err(CoreError::Validation(_)));
    }

    #[test]
    fn subjects_are_trimmed_and_deduped() {
        let subjects = vec![
            " Maths ".to_string(),
            "maths".to_string(),
            "".to_string(),
            "English".to_string(),
        ];
        assert_eq!(normalize_subjects(&subjects), vec!["Maths", "English"]);
    }
}
