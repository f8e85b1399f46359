//! Notification engine: the daily per-service reminder sweep and the
//! one-off startup digest.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use notifier_models::{classify, NotificationKind, ServicePatch, TrackedService};
use notifier_persistence::CounterFile;
use notifier_store::{RecordStore, StoreError};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::format::{self, ExpiryBuckets};
use crate::messenger::{Keyboard, Messenger, MessengerError, SentMessage};

/// Bound on a single outbound message.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Sweep-level failures. Per-service problems never surface here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to fetch services: {0}")]
    Fetch(#[from] StoreError),

    #[error("failed to send digest: {0}")]
    Send(#[from] MessengerError),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// What one sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Active services examined.
    pub checked: usize,
    /// Reminders delivered.
    pub sent: usize,
    /// Due, but already reminded today.
    pub already_notified: usize,
    pub send_failures: usize,
    /// Delivered, but the notification stamp could not be written.
    pub stamp_failures: usize,
}

/// Reminder due for `service` on `today`, with its days left.
///
/// Only active services with an expiry date qualify, and a service stamped
/// today is never due again the same day.
pub fn due(service: &TrackedService, today: NaiveDate) -> Option<(NotificationKind, i64)> {
    if !service.is_active() || service.notified_on(today) {
        return None;
    }
    let days_left = service.days_left(today)?;
    classify(days_left).map(|kind| (kind, days_left))
}

/// Sends reminders to the operator chat.
pub struct NotificationEngine {
    store: Arc<dyn RecordStore>,
    messenger: Arc<dyn Messenger>,
    counters: Arc<CounterFile>,
    admin_chat: i64,
    send_timeout: Duration,
}

impl NotificationEngine {
    pub fn new(
        store: Arc<dyn RecordStore>,
        messenger: Arc<dyn Messenger>,
        counters: Arc<CounterFile>,
        admin_chat: i64,
    ) -> Self {
        Self {
            store,
            messenger,
            counters,
            admin_chat,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn counters(&self) -> &Arc<CounterFile> {
        &self.counters
    }

    pub fn admin_chat(&self) -> i64 {
        self.admin_chat
    }

    async fn send(
        &self,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> std::result::Result<SentMessage, MessengerError> {
        let delivery = self.messenger.send(self.admin_chat, text, keyboard);
        match tokio::time::timeout(self.send_timeout, delivery).await {
            Ok(result) => result,
            Err(_) => Err(MessengerError::Timeout),
        }
    }

    /// Run one reminder sweep for `today`.
    ///
    /// A failed fetch aborts the sweep. Once services are in hand every one
    /// is processed independently: a failed send or stamp is logged and the
    /// loop moves on.
    pub async fn sweep(&self, today: NaiveDate) -> Result<SweepReport> {
        if self.admin_chat == 0 {
            warn!("No operator chat configured, skipping reminder sweep");
            return Ok(SweepReport::default());
        }

        if let Err(e) = self.counters.record_check() {
            warn!(error = %e, "Failed to persist check counter");
        }

        let services = self.store.active_services().await.map_err(|e| {
            error!(error = %e, "Failed to fetch services, sweep aborted");
            e
        })?;

        let mut report = SweepReport {
            checked: services.len(),
            ..SweepReport::default()
        };

        for service in &services {
            if service.notified_on(today) {
                if service.days_left(today).and_then(classify).is_some() {
                    report.already_notified += 1;
                }
                continue;
            }
            let Some((kind, days_left)) = due(service, today) else {
                continue;
            };

            let text = format::reminder(service, kind, days_left);
            let keyboard = format::reminder_keyboard(&service.id, kind);
            if let Err(e) = self.send(&text, Some(&keyboard)).await {
                warn!(service = %service.name, kind = %kind, error = %e, "Failed to send reminder");
                report.send_failures += 1;
                continue;
            }
            report.sent += 1;
            info!(service = %service.name, kind = %kind, days_left, "Reminder sent");

            let stamp = ServicePatch::stamp_notification(kind, today);
            if let Err(e) = self.store.update_by_id(&service.id, &stamp).await {
                warn!(
                    service = %service.name,
                    error = %e,
                    "Failed to stamp reminder, it may repeat"
                );
                report.stamp_failures += 1;
            }
        }

        if report.sent > 0 {
            if let Err(e) = self.counters.record_notifications(report.sent as u64) {
                warn!(error = %e, "Failed to persist notification counter");
            }
        }

        info!(
            checked = report.checked,
            sent = report.sent,
            failures = report.send_failures,
            "Reminder sweep finished"
        );
        Ok(report)
    }

    /// Send the startup digest: one message covering everything expired or
    /// expiring within 30 days. Writes nothing back. `None` when there is
    /// nothing to report or no operator chat.
    pub async fn startup_digest(&self, today: NaiveDate) -> Result<Option<SentMessage>> {
        if self.admin_chat == 0 {
            return Ok(None);
        }
        let services = self.store.active_services().await?;
        let buckets = ExpiryBuckets::new(&services, today);
        let Some(text) = format::startup_digest(&buckets) else {
            debug!("Startup check: nothing expiring");
            return Ok(None);
        };
        let keyboard = format::startup_digest_keyboard();
        let sent = self.send(&text, Some(&keyboard)).await?;
        info!(
            expired = buckets.expired.len(),
            expiring = buckets.expiring.len(),
            "Startup digest sent"
        );
        Ok(Some(sent))
    }
}
