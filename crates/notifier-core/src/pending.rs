//! Staging area for actions awaiting a confirm/cancel tap.
//!
//! Only the short token travels in button callback data; the payload stays
//! here until it is committed, cancelled or evicted by age.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use notifier_models::{ActionToken, ServiceId};
use thiserror::Error;
use tracing::debug;

use crate::interpreter::{BatchDraft, RenewalRequest, ServiceDraft};

/// Default retention for staged actions (one hour).
pub fn default_pending_ttl() -> Duration {
    Duration::hours(1)
}

/// Reserved token standing in for callback data that would not fit.
pub const OVERFLOW_TOKEN: &str = "~";

/// Pending-action lookup failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PendingError {
    /// Expired, already used, or never staged.
    #[error("action expired or was already used")]
    NotFound,

    /// The button's callback data was replaced by the overflow token.
    #[error("action data too large")]
    DataTooLarge,
}

/// Kind tag selecting the confirm handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingKind {
    AddService,
    AddBatch,
    RenewBatch,
    EditCost,
}

/// Staged mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingPayload {
    AddService(ServiceDraft),
    AddBatch(BatchDraft),
    RenewBatch(RenewalRequest),
    EditCost {
        service_id: ServiceId,
        name: String,
        cost: f64,
    },
}

impl PendingPayload {
    pub fn kind(&self) -> PendingKind {
        match self {
            Self::AddService(_) => PendingKind::AddService,
            Self::AddBatch(_) => PendingKind::AddBatch,
            Self::RenewBatch(_) => PendingKind::RenewBatch,
            Self::EditCost { .. } => PendingKind::EditCost,
        }
    }
}

/// A staged action.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    pub token: ActionToken,
    pub payload: PendingPayload,
    pub owner: i64,
    pub created_at: DateTime<Utc>,
}

impl PendingAction {
    pub fn kind(&self) -> PendingKind {
        self.payload.kind()
    }
}

/// Pending-action store. Injected so tests can observe or replace it.
pub trait PendingActions: Send + Sync {
    /// Stage `payload` and return a fresh token.
    fn stage(&self, payload: PendingPayload, owner: i64, now: DateTime<Utc>) -> ActionToken;

    /// Look up without removing.
    fn resolve(&self, token: &ActionToken) -> Result<PendingAction, PendingError>;

    /// Remove and return. A second `take` of the same token fails.
    fn take(&self, token: &ActionToken) -> Result<PendingAction, PendingError>;

    /// Put back an action whose commit failed.
    fn restore(&self, action: PendingAction);

    /// Drop an entry; `true` if it existed.
    fn discard(&self, token: &ActionToken) -> bool;

    /// Drop entries older than `ttl`; returns how many went.
    fn sweep_expired(&self, now: DateTime<Utc>, ttl: Duration) -> usize;

    /// Drop every entry staged by `owner`.
    fn discard_owned_by(&self, owner: i64) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutex-guarded map keyed by a monotonically increasing counter.
#[derive(Debug, Default)]
pub struct InMemoryPendingActions {
    entries: Mutex<HashMap<ActionToken, PendingAction>>,
    counter: AtomicU64,
}

impl InMemoryPendingActions {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ActionToken, PendingAction>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_token(&self) -> ActionToken {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        ActionToken::from_string(format!("p{}", to_base36(n)))
    }
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::new();
    loop {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn check_overflow(token: &ActionToken) -> Result<(), PendingError> {
    if token.as_str() == OVERFLOW_TOKEN {
        return Err(PendingError::DataTooLarge);
    }
    Ok(())
}

impl PendingActions for InMemoryPendingActions {
    fn stage(&self, payload: PendingPayload, owner: i64, now: DateTime<Utc>) -> ActionToken {
        let token = self.next_token();
        debug!(token = %token, kind = ?payload.kind(), owner, "Staged pending action");
        self.lock().insert(
            token.clone(),
            PendingAction {
                token: token.clone(),
                payload,
                owner,
                created_at: now,
            },
        );
        token
    }

    fn resolve(&self, token: &ActionToken) -> Result<PendingAction, PendingError> {
        check_overflow(token)?;
        self.lock().get(token).cloned().ok_or(PendingError::NotFound)
    }

    fn take(&self, token: &ActionToken) -> Result<PendingAction, PendingError> {
        check_overflow(token)?;
        self.lock().remove(token).ok_or(PendingError::NotFound)
    }

    fn restore(&self, action: PendingAction) {
        self.lock().insert(action.token.clone(), action);
    }

    fn discard(&self, token: &ActionToken) -> bool {
        self.lock().remove(token).is_some()
    }

    fn sweep_expired(&self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, action| now - action.created_at <= ttl);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "Evicted expired pending actions");
        }
        removed
    }

    fn discard_owned_by(&self, owner: i64) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, action| action.owner != owner);
        before - entries.len()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::DraftSource;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn payload(name: &str) -> PendingPayload {
        PendingPayload::AddService(ServiceDraft::new(
            name,
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            DraftSource::Fallback,
        ))
    }

    #[test]
    fn test_tokens_are_unique_and_short() {
        let store = InMemoryPendingActions::new();
        let now = Utc::now();
        let tokens: HashSet<ActionToken> = (0..2000)
            .map(|i| store.stage(payload(&i.to_string()), 1, now))
            .collect();
        assert_eq!(tokens.len(), 2000);
        assert!(tokens.iter().all(|t| t.as_str().len() <= 8));
    }

    #[test]
    fn test_take_is_single_use_and_restore_reinstates() {
        let store = InMemoryPendingActions::new();
        let token = store.stage(payload("a.ru"), 1, Utc::now());

        let action = store.take(&token).unwrap();
        assert_eq!(store.take(&token), Err(PendingError::NotFound));

        store.restore(action);
        assert!(store.resolve(&token).is_ok());
        assert!(store.discard(&token));
        assert!(!store.discard(&token));
    }

    #[test]
    fn test_overflow_token() {
        let store = InMemoryPendingActions::new();
        let overflow = ActionToken::from_string(OVERFLOW_TOKEN);
        assert_eq!(store.resolve(&overflow), Err(PendingError::DataTooLarge));
        assert_eq!(store.take(&overflow), Err(PendingError::DataTooLarge));
    }

    #[test]
    fn test_discard_owned_by() {
        let store = InMemoryPendingActions::new();
        let now = Utc::now();
        store.stage(payload("a"), 1, now);
        store.stage(payload("b"), 1, now);
        let other = store.stage(payload("c"), 2, now);

        assert_eq!(store.discard_owned_by(1), 2);
        assert_eq!(store.len(), 1);
        assert!(store.resolve(&other).is_ok());
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
