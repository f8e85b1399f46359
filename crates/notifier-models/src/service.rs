//! Tracked service records and the patches applied to them.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::ids::ServiceId;
use crate::notification::NotificationKind;

/// Lifecycle status of a tracked service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// Eligible for expiry reminders.
    #[default]
    Active,
    /// The operator told the client; waiting for payment.
    Notified,
    /// Paid; no more reminders until extended.
    Paid,
}

impl ServiceStatus {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Notified => "notified",
            Self::Paid => "paid",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted service/domain/subscription row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedService {
    /// Store-assigned identifier.
    pub id: ServiceId,

    /// Display name (domain, subscription name, free text).
    pub name: String,

    /// Expiry day.
    #[serde(default, deserialize_with = "de_date_opt")]
    pub expires_at: Option<NaiveDate>,

    /// Lifecycle status.
    #[serde(default)]
    pub status: ServiceStatus,

    /// Optional project tag.
    #[serde(default)]
    pub project: Option<String>,

    /// Optional provider tag.
    #[serde(default)]
    pub provider: Option<String>,

    /// Optional cost in the single implicit currency.
    #[serde(default, deserialize_with = "de_cost_opt")]
    pub cost: Option<f64>,

    /// Last reminder kind sent.
    #[serde(default, deserialize_with = "de_kind_opt")]
    pub last_notification: Option<NotificationKind>,

    /// Day the last reminder was sent (dedup key).
    #[serde(default, deserialize_with = "de_date_opt")]
    pub notification_date: Option<NaiveDate>,

    #[serde(default)]
    pub user_id: Option<i64>,

    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub payment_date: Option<String>,
}

impl TrackedService {
    /// Whole days between `today` and the expiry date, negative when past.
    pub fn days_left(&self, today: NaiveDate) -> Option<i64> {
        self.expires_at.map(|exp| (exp - today).num_days())
    }

    /// Whether the service is swept for reminders.
    pub fn is_active(&self) -> bool {
        self.status == ServiceStatus::Active
    }

    /// Whether a reminder was already sent on `today`.
    pub fn notified_on(&self, today: NaiveDate) -> bool {
        self.notification_date == Some(today)
    }

    /// Whether this looks like hosting or a domain registration.
    pub fn is_hosting(&self) -> bool {
        let name = self.name.to_lowercase();
        let provider = self.provider.as_deref().unwrap_or("").to_lowercase();
        name.contains("хостинг")
            || name.contains("домен")
            || name.contains('.')
            || matches!(
                provider.as_str(),
                "хостинг" | "хостинг-провайдер" | "доменный регистратор"
            )
    }
}

/// Fields of a service about to be inserted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewService {
    pub name: String,
    pub expires_at: NaiveDate,
    pub status: ServiceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub created_at: String,
}

/// Partial update. `None` leaves a column untouched; `Some(None)` on a
/// nullable column writes NULL.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServicePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ServiceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_notification: Option<Option<NotificationKind>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<String>,
}

impl ServicePatch {
    /// Record that a reminder of `kind` went out on `today`.
    pub fn stamp_notification(kind: NotificationKind, today: NaiveDate) -> Self {
        Self {
            last_notification: Some(Some(kind)),
            notification_date: Some(Some(today)),
            ..Self::default()
        }
    }

    /// Mark as paid at `paid_at` (ISO timestamp).
    pub fn mark_paid(paid_at: impl Into<String>) -> Self {
        Self {
            status: Some(ServiceStatus::Paid),
            payment_date: Some(paid_at.into()),
            ..Self::default()
        }
    }

    /// Mark as "client notified, waiting for payment".
    pub fn mark_notified(kind: NotificationKind, today: NaiveDate) -> Self {
        Self {
            status: Some(ServiceStatus::Notified),
            ..Self::stamp_notification(kind, today)
        }
    }

    /// Move the expiry to `new_date`, reactivate and clear reminder state.
    pub fn extend_to(new_date: NaiveDate) -> Self {
        Self {
            status: Some(ServiceStatus::Active),
            expires_at: Some(new_date),
            last_notification: Some(None),
            notification_date: Some(None),
            ..Self::default()
        }
    }

    /// Replace the cost.
    pub fn set_cost(cost: f64) -> Self {
        Self {
            cost: Some(cost),
            ..Self::default()
        }
    }

    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Parse a date column that may hold either `YYYY-MM-DD` or a full ISO
/// timestamp.
pub fn parse_store_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.split('T').next().unwrap_or(raw).trim();
    let day = day.split(' ').next().unwrap_or(day);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn de_date_opt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_store_date))
}

fn de_cost_opt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    })
}

fn de_kind_opt<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<NotificationKind>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}
