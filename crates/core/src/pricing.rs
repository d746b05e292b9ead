//! Session pricing.
//!
//! Pure functions only: the billing engine feeds in the session's modality,
//! duration and the client's locked rate, and stores what comes out.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::session::Modality;
use crate::types::Cents;

/// Default hourly rate for online sessions.
pub const DEFAULT_ONLINE_RATE_CENTS: Cents = 6_000;

/// Default hourly rate for in-home sessions.
pub const DEFAULT_IN_HOME_RATE_CENTS: Cents = 7_500;

/// Default hourly rate for group sessions (per student).
pub const DEFAULT_GROUP_RATE_CENTS: Cents = 4_000;

/// Hourly rates per modality, used when a client has no locked rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    pub online_cents_per_hour: Cents,
    pub in_home_cents_per_hour: Cents,
    pub group_cents_per_hour: Cents,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            online_cents_per_hour: DEFAULT_ONLINE_RATE_CENTS,
            in_home_cents_per_hour: DEFAULT_IN_HOME_RATE_CENTS,
            group_cents_per_hour: DEFAULT_GROUP_RATE_CENTS,
        }
    }
}

impl PricingPolicy {
    /// Hourly rate for a session: the client's override when it is positive,
    /// otherwise the modality default.
    pub fn rate_per_hour(&self, modality: Modality, client_override: Option<Cents>) -> Cents {
        match client_override {
            Some(rate) if rate > 0 => rate,
            _ => match modality {
                Modality::Online => self.online_cents_per_hour,
                Modality::InHome => self.in_home_cents_per_hour,
                Modality::Group => self.group_cents_per_hour,
            },
        }
    }

    /// Price of a session of `duration_minutes` at the applicable rate.
    pub fn session_amount(
        &self,
        modality: Modality,
        client_override: Option<Cents>,
        duration_minutes: i32,
    ) -> Cents {
        amount_cents(duration_minutes, self.rate_per_hour(modality, client_override))
    }
}

/// `round(duration_minutes / 60 * rate_per_hour)`, rounding half up.
///
/// Integer arithmetic keeps the result exact for every realistic input.
pub fn amount_cents(duration_minutes: i32, rate_per_hour_cents: Cents) -> Cents {
    let numerator = i64::from(duration_minutes) * rate_per_hour_cents;
    if numerator >= 0 {
        (numerator + 30) / 60
    } else {
        (numerator - 30) / 60
    }
}

// ---------------------------------------------------------------------------
// Package plans
// ---------------------------------------------------------------------------

/// How a family pays for tuition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PackagePlan {
    /// Pay per session; every session is invoiced on its own.
    Casual,
    /// Prepaid block of sessions; excluded from per-session invoicing.
    Prepaid { sessions: u16 },
}

impl PackagePlan {
    /// Parse a stored plan name. Missing or empty means casual.
    ///
    /// Accepted names: `casual`, `one-off`, `package_<n>` / `package-<n>`.
    pub fn parse(value: Option<&str>) -> Result<Self, CoreError> {
        let Some(raw) = value.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(PackagePlan::Casual);
        };
        let normalized = raw.to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "casual" | "one_off" | "payg" => Ok(PackagePlan::Casual),
            other => other
                .strip_prefix("package_")
                .and_then(|n| n.parse::<u16>().ok())
                .filter(|n| *n > 0)
                .map(|sessions| PackagePlan::Prepaid { sessions })
                .ok_or_else(|| {
                    CoreError::Validation(format!(
                        "Unknown package plan '{raw}'. Use casual or package_<sessions>"
                    ))
                }),
        }
    }

    /// Canonical stored name.
    pub fn as_db_value(self) -> String {
        match self {
            PackagePlan::Casual => "casual".to_string(),
            PackagePlan::Prepaid { sessions } => format!("package_{sessions}"),
        }
    }

    pub fn is_prepaid(self) -> bool {
        matches!(self, PackagePlan::Prepaid { .. })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn amount_examples() {
        assert_eq!(amount_cents(60, 6_000), 6_000);
        assert_eq!(amount_cents(90, 7_500), 11_250);
        assert_eq!(amount_cents(30, 4_000), 2_000);
    }

    #[test]
    fn amount_rounds_half_up() {
        // 45 min at 6,001c/h = 4,500.75c
        assert_eq!(amount_cents(45, 6_001), 4_501);
        // 1 min at 30c/h = 0.5c
        assert_eq!(amount_cents(1, 30), 1);
        // 1 min at 29c/h = 0.483c
        assert_eq!(amount_cents(1, 29), 0);
    }

    #[test]
    fn override_wins_when_positive() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.rate_per_hour(Modality::Online, Some(8_000)), 8_000);
        assert_eq!(policy.rate_per_hour(Modality::InHome, Some(5_500)), 5_500);
    }

    #[test]
    fn zero_or_negative_override_is_ignored() {
        let policy = PricingPolicy::default();
        assert_eq!(
            policy.rate_per_hour(Modality::Online, Some(0)),
            DEFAULT_ONLINE_RATE_CENTS
        );
        assert_eq!(
            policy.rate_per_hour(Modality::InHome, Some(-100)),
            DEFAULT_IN_HOME_RATE_CENTS
        );
    }

    #[test]
    fn online_is_cheaper_than_in_home() {
        let policy = PricingPolicy::default();
        assert!(
            policy.rate_per_hour(Modality::Online, None)
                < policy.rate_per_hour(Modality::InHome, None)
        );
    }

    #[test]
    fn online_hour_without_override_costs_6000() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.session_amount(Modality::Online, None, 60), 6_000);
    }

    #[test]
    fn plan_parsing() {
        assert_eq!(PackagePlan::parse(None), Ok(PackagePlan::Casual));
        assert_eq!(PackagePlan::parse(Some("  ")), Ok(PackagePlan::Casual));
        assert_eq!(PackagePlan::parse(Some("One-Off")), Ok(PackagePlan::Casual));
        assert_eq!(
            PackagePlan::parse(Some("package-10")),
            Ok(PackagePlan::Prepaid { sessions: 10 })
        );
        assert_matches!(
            PackagePlan::parse(Some("package_0")),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            PackagePlan::parse(Some("platinum")),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn plan_db_value_is_canonical() {
        let plan = PackagePlan::parse(Some("Package-5")).unwrap();
        assert_eq!(plan.as_db_value(), "package_5");
        assert!(plan.is_prepaid());
        assert!(!PackagePlan::Casual.is_prepaid());
    }
}
