//! Weekly recurrence expansion.

use chrono::Duration;

use crate::types::{DbId, Timestamp};

pub const MIN_RECURRING_WEEKS: i32 = 1;
pub const MAX_RECURRING_WEEKS: i32 = 12;

/// Clamp a requested number of weeks to `[1, 12]`.
pub fn clamp_weeks(requested: i32) -> i32 {
    requested.clamp(MIN_RECURRING_WEEKS, MAX_RECURRING_WEEKS)
}

/// Series key for an expansion: the base's existing key, or
/// `series-{base_id}` when it has none.
pub fn series_key(base_id: DbId, existing: Option<&str>) -> String {
    match existing.map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => key.to_string(),
        None => format!("series-{base_id}"),
    }
}

/// `(start, end)` pairs for weeks `1..=weeks` after the base slot.
pub fn weekly_occurrences(
    start_at: Timestamp,
    end_at: Timestamp,
    weeks: i32,
) -> Vec<(Timestamp, Timestamp)> {
    (1..=clamp_weeks(weeks))
        .map(|i| {
            let offset = Duration::days(7 * i64::from(i));
            (start_at + offset, end_at + offset)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn base() -> (Timestamp, Timestamp) {
        let start = chrono::Utc
            .with_ymd_and_hms(2025, 2, 3, 15, 30, 0)
            .single()
            .expect("valid timestamp");
        (start, start + Duration::minutes(60))
    }

    #[test]
    fn four_weeks_are_seven_days_apart() {
        let (start, end) = base();
        let slots = weekly_occurrences(start, end, 4);
        assert_eq!(slots.len(), 4);
        for (i, (s, e)) in slots.iter().enumerate() {
            let days = 7 * (i as i64 + 1);
            assert_eq!(*s - start, Duration::days(days));
            assert_eq!(*e - end, Duration::days(days));
        }
    }

    #[test]
    fn weeks_are_clamped() {
        assert_eq!(clamp_weeks(0), 1);
        assert_eq!(clamp_weeks(-3), 1);
        assert_eq!(clamp_weeks(12), 12);
        assert_eq!(clamp_weeks(52), 12);

        let (start, end) = base();
        assert_eq!(weekly_occurrences(start, end, 40).len(), 12);
        assert_eq!(weekly_occurrences(start, end, 0).len(), 1);
    }

    #[test]
    fn series_key_defaults_from_base_id() {
        assert_eq!(series_key(42, None), "series-42");
        assert_eq!(series_key(42, Some("  ")), "series-42");
        assert_eq!(series_key(42, Some("term-1-maths")), "term-1-maths");
    }
}
