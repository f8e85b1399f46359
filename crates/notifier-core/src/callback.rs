//! Inline-button callback data.
//!
//! Telegram caps callback data at 64 bytes, so buttons carry a short prefix
//! plus a token or id, never the payload itself.

use notifier_models::{ActionToken, NotificationKind, ServiceId};

use crate::pending::OVERFLOW_TOKEN;

/// Hard platform limit on callback data.
pub const MAX_CALLBACK_BYTES: usize = 64;

/// Decoded button tap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Confirm(ActionToken),
    Cancel(ActionToken),
    Paid(ServiceId),
    Notified(ServiceId, NotificationKind),
    Extend(ServiceId, i64),
    AllPaid,
    ExtendAllHosting,
    Project(String),
    Provider(String),
}

impl CallbackAction {
    fn render(&self) -> String {
        match self {
            Self::Confirm(token) => format!("ok:{token}"),
            Self::Cancel(token) => format!("no:{token}"),
            Self::Paid(id) => format!("paid:{id}"),
            Self::Notified(id, kind) => format!("notified:{id}:{kind}"),
            Self::Extend(id, days) => format!("extend:{id}:{days}"),
            Self::AllPaid => "all_paid".to_string(),
            Self::ExtendAllHosting => "extend_hosting".to_string(),
            Self::Project(name) => format!("project:{name}"),
            Self::Provider(name) => format!("provider:{name}"),
        }
    }

    /// Callback data, or `None` when it would exceed the platform limit.
    pub fn encode(&self) -> Option<String> {
        let data = self.render();
        (data.len() <= MAX_CALLBACK_BYTES).then_some(data)
    }

    /// Like [`CallbackAction::encode`], but token buttons that would not fit
    /// fall back to the reserved overflow token.
    pub fn encode_or_overflow(&self) -> Option<String> {
        if let Some(data) = self.encode() {
            return Some(data);
        }
        match self {
            Self::Confirm(_) => Some(format!("ok:{OVERFLOW_TOKEN}")),
            Self::Cancel(_) => Some(format!("no:{OVERFLOW_TOKEN}")),
            _ => None,
        }
    }

    pub fn decode(data: &str) -> Option<Self> {
        match data {
            "all_paid" | "all_paid_startup" => return Some(Self::AllPaid),
            "extend_hosting" | "extend_all_hosting_startup" => return Some(Self::ExtendAllHosting),
            _ => {}
        }
        let (prefix, rest) = data.split_once(':')?;
        if rest.is_empty() {
            return None;
        }
        match prefix {
            "ok" => Some(Self::Confirm(ActionToken::from_string(rest))),
            "no" => Some(Self::Cancel(ActionToken::from_string(rest))),
            "paid" => Some(Self::Paid(ServiceId::from_string(rest))),
            "notified" => {
                let (id, kind) = rest.rsplit_once(':')?;
                Some(Self::Notified(ServiceId::from_string(id), kind.parse().ok()?))
            }
            "extend" => {
                let (id, days) = rest.rsplit_once(':')?;
                let days: i64 = days.parse().ok()?;
                (days > 0).then(|| Self::Extend(ServiceId::from_string(id), days))
            }
            "project" | "select_project" => Some(Self::Project(rest.to_string())),
            "provider" | "select_provider" => Some(Self::Provider(rest.to_string())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_forms() {
        assert_eq!(
            CallbackAction::decode("ok:p1a"),
            Some(CallbackAction::Confirm(ActionToken::from_string("p1a")))
        );
        assert_eq!(
            CallbackAction::decode("notified:17:two_weeks"),
            Some(CallbackAction::Notified(ServiceId::from_string("17"), NotificationKind::TwoWeeks))
        );
        assert_eq!(
            CallbackAction::decode("extend:17:90"),
            Some(CallbackAction::Extend(ServiceId::from_string("17"), 90))
        );
        assert_eq!(CallbackAction::decode("all_paid_startup"), Some(CallbackAction::AllPaid));
        assert_eq!(
            CallbackAction::decode("project:ВЛАДОГРАД"),
            Some(CallbackAction::Project("ВЛАДОГРАД".into()))
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(CallbackAction::decode(""), None);
        assert_eq!(CallbackAction::decode("ok:"), None);
        assert_eq!(CallbackAction::decode("extend:17:-5"), None);
        assert_eq!(CallbackAction::decode("notified:17:weekly"), None);
        assert_eq!(CallbackAction::decode("launch:1"), None);
    }

    #[test]
    fn test_encode_respects_byte_limit() {
        // Cyrillic is two bytes per char.
        let long = "проект".repeat(6);
        assert!(CallbackAction::Project(long.clone()).encode().is_none());
        assert!(CallbackAction::Project(long).encode_or_overflow().is_none());

        let huge_token = ActionToken::from_string("x".repeat(80));
        assert_eq!(
            CallbackAction::Confirm(huge_token).encode_or_overflow().as_deref(),
            Some("ok:~")
        );
        assert_eq!(
            CallbackAction::Extend(ServiceId::from_string("5"), 365).encode().as_deref(),
            Some("extend:5:365")
        );
    }
}
