//! Reminder kinds and the days-left classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of reminder sent (or recorded) for a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Exactly 30 days left.
    Month,
    /// Exactly 14 days left.
    TwoWeeks,
    /// Exactly 7 days left.
    OneWeek,
    /// Between 1 and 5 days left, sent every day.
    Daily,
    /// Expiry date is today or already passed.
    Expired,
    /// Recorded by the operator through the "notified" button without a
    /// prior reminder.
    Manual,
}

impl NotificationKind {
    /// Wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::TwoWeeks => "two_weeks",
            Self::OneWeek => "one_week",
            Self::Daily => "daily",
            Self::Expired => "expired",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "month" => Ok(Self::Month),
            "two_weeks" => Ok(Self::TwoWeeks),
            "one_week" => Ok(Self::OneWeek),
            "daily" => Ok(Self::Daily),
            "expired" => Ok(Self::Expired),
            "manual" => Ok(Self::Manual),
            other => Err(format!("unknown notification kind: {}", other)),
        }
    }
}

/// Decide which reminder (if any) is due for `days_left`.
///
/// First match wins: 30 → month, 14 → two weeks, 7 → one week,
/// 1..=5 → daily, <= 0 → expired. Everything else gets no reminder.
pub fn classify(days_left: i64) -> Option<NotificationKind> {
    match days_left {
        30 => Some(NotificationKind::Month),
        14 => Some(NotificationKind::TwoWeeks),
        7 => Some(NotificationKind::OneWeek),
        1..=5 => Some(NotificationKind::Daily),
        d if d <= 0 => Some(NotificationKind::Expired),
        _ => None,
    }
}
