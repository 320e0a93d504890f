//! Timer entity: one pending reminder and its display helpers
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::core::format::countdown_str;

/// One pending reminder owned by a single user's collection.
///
/// The description doubles as the timer's identifier within that
/// collection; uniqueness is enforced at creation time by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    pub description: String,
    pub target_time: DateTime<Utc>,
    /// Survive firing until explicitly acknowledged.
    pub require_ack: bool,
    /// Stamped when an alert for this overdue ack-required timer goes out.
    pub last_alert: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Timer {
    pub fn new(
        description: String,
        target_time: DateTime<Utc>,
        require_ack: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Timer {
            description,
            target_time,
            require_ack,
            last_alert: None,
            created_at: now,
        }
    }

    /// Whether the timer has reached or passed its target.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.target_time
    }

    /// Signed time left; negative once overdue.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        self.target_time - now
    }

    /// `at 06:00:00PM` when the target falls on today's date, otherwise
    /// `on Fri 14 Feb 2025, 05:00:00PM`.
    pub fn target_str(&self, now: DateTime<Utc>) -> String {
        if self.target_time.date_naive() == now.date_naive() {
            format!("at {}", self.target_time.format("%I:%M:%S%p"))
        } else {
            format!("on {}", self.target_time.format("%a %d %b %Y, %I:%M:%S%p"))
        }
    }

    /// `in 2d, 3h` while pending, `5m ago` once overdue.
    pub fn remaining_str(&self, now: DateTime<Utc>) -> String {
        countdown_str(self.remaining(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn timer(target: DateTime<Utc>) -> Timer {
        Timer::new("tea".to_string(), target, false, at(2024, 1, 1, 10, 0, 0))
    }

    #[test]
    fn test_is_due_at_and_after_target() {
        let t = timer(at(2024, 1, 1, 10, 5, 0));
        assert!(!t.is_due(at(2024, 1, 1, 10, 4, 59)));
        assert!(t.is_due(at(2024, 1, 1, 10, 5, 0)));
        assert!(t.is_due(at(2024, 1, 1, 11, 0, 0)));
    }

    #[test]
    fn test_remaining_goes_negative_when_overdue() {
        let t = timer(at(2024, 1, 1, 10, 5, 0));
        assert_eq!(t.remaining(at(2024, 1, 1, 10, 0, 0)), Duration::minutes(5));
        assert_eq!(t.remaining(at(2024, 1, 1, 10, 7, 0)), Duration::minutes(-2));
    }

    #[test]
    fn test_target_str_today_vs_other_day() {
        let t = timer(at(2024, 1, 1, 18, 0, 0));
        assert_eq!(t.target_str(at(2024, 1, 1, 10, 0, 0)), "at 06:00:00PM");
        assert_eq!(
            t.target_str(at(2023, 12, 31, 10, 0, 0)),
            "on Mon 01 Jan 2024, 06:00:00PM"
        );
    }

    #[test]
    fn test_remaining_str() {
        let t = timer(at(2024, 1, 1, 10, 5, 0));
        assert_eq!(t.remaining_str(at(2024, 1, 1, 10, 0, 0)), "in 5m");
        assert_eq!(t.remaining_str(at(2024, 1, 1, 10, 6, 30)), "1m, 30s ago");
    }
}
