//! Daily sweep trigger and the pending-action eviction timer.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use notifier_persistence::Heartbeat;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::clock::Clock;
use crate::engine::NotificationEngine;
use crate::pending::PendingActions;

/// How often the scheduler wakes up.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Wait after a failed sweep before trying again.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(300);

/// Period of the pending-action eviction timer.
pub const DEFAULT_EVICTION_INTERVAL: Duration = Duration::from_secs(6 * 3600);

/// Fires at most once per calendar day, at or after `hour`.
///
/// `last_run` only advances on success, so a failed sweep is retried the
/// same day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTrigger {
    hour: u32,
    last_run: Option<NaiveDate>,
}

impl DailyTrigger {
    pub fn new(hour: u32) -> Self {
        Self { hour, last_run: None }
    }

    pub fn is_due(&self, hour_now: u32, today: NaiveDate) -> bool {
        hour_now >= self.hour && self.last_run != Some(today)
    }

    pub fn mark_done(&mut self, today: NaiveDate) {
        self.last_run = Some(today);
    }

    pub fn last_run(&self) -> Option<NaiveDate> {
        self.last_run
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }
}

/// Drives [`NotificationEngine::sweep`] from the wall clock.
pub struct Scheduler {
    engine: Arc<NotificationEngine>,
    clock: Clock,
    trigger: DailyTrigger,
    heartbeat: Option<Heartbeat>,
    poll_interval: Duration,
    retry_backoff: Duration,
}

impl Scheduler {
    pub fn new(engine: Arc<NotificationEngine>, clock: Clock, notify_hour: u32) -> Self {
        Self {
            engine,
            clock,
            trigger: DailyTrigger::new(notify_hour),
            heartbeat: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    pub fn with_heartbeat(mut self, heartbeat: Heartbeat) -> Self {
        self.heartbeat = Some(heartbeat);
        self
    }

    pub fn with_intervals(mut self, poll: Duration, retry_backoff: Duration) -> Self {
        self.poll_interval = poll;
        self.retry_backoff = retry_backoff;
        self
    }

    pub fn trigger(&self) -> &DailyTrigger {
        &self.trigger
    }

    /// One poll: sweep if due. Returns how long to sleep before the next.
    pub async fn tick(&mut self) -> Duration {
        if let Some(heartbeat) = &self.heartbeat {
            if let Err(e) = heartbeat.beat(Utc::now()) {
                debug!(error = %e, "Failed to write heartbeat");
            }
        }

        let today = self.clock.today();
        if !self.trigger.is_due(self.clock.hour(), today) {
            return self.poll_interval;
        }

        info!(date = %today, "Starting daily reminder sweep");
        match self.engine.sweep(today).await {
            Ok(_) => {
                self.trigger.mark_done(today);
                self.poll_interval
            }
            Err(e) => {
                error!(error = %e, retry_in = ?self.retry_backoff, "Daily sweep failed");
                self.retry_backoff
            }
        }
    }

    /// Poll until `cancel` fires. A sweep in progress is allowed to finish.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(hour = self.trigger.hour(), "Scheduler started");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            let wait = self.tick().await;
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }
        info!("Scheduler stopped");
    }
}

/// Evict stale pending actions every `every` until `cancel` fires.
pub async fn run_eviction(
    pending: Arc<dyn PendingActions>,
    ttl: chrono::Duration,
    every: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(every);
    // The first tick completes immediately.
    interval.tick().await;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let removed = pending.sweep_expired(Utc::now(), ttl);
                if removed > 0 {
                    info!(removed, remaining = pending.len(), "Expired pending actions evicted");
                }
            }
        }
    }
    debug!("Eviction timer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::{DraftSource, ServiceDraft};
    use crate::messenger::{Keyboard, Messenger, SentMessage};
    use crate::pending::{InMemoryPendingActions, PendingPayload};
    use async_trait::async_trait;
    use notifier_persistence::CounterFile;
    use notifier_store::MemoryStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[derive(Default)]
    struct Counting(AtomicUsize);

    #[async_trait]
    impl Messenger for Counting {
        async fn send(
            &self,
            chat_id: i64,
            _: &str,
            _: Option<&Keyboard>,
        ) -> crate::messenger::Result<SentMessage> {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            Ok(SentMessage {
                chat_id,
                message_id: n as i32,
            })
        }

        async fn edit(
            &self,
            _: SentMessage,
            _: &str,
            _: Option<&Keyboard>,
        ) -> crate::messenger::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_trigger_state_machine() {
        let mut trigger = DailyTrigger::new(9);
        let day1 = date(2025, 1, 10);

        assert!(!trigger.is_due(8, day1));
        assert!(trigger.is_due(9, day1));
        assert!(trigger.is_due(23, day1));

        trigger.mark_done(day1);
        assert!(!trigger.is_due(10, day1));
        assert!(!trigger.is_due(8, day1.succ_opt().unwrap()));
        assert!(trigger.is_due(9, day1.succ_opt().unwrap()));
        assert_eq!(trigger.last_run(), Some(day1));
    }

    fn scheduler(store: Arc<MemoryStore>, dir: &tempfile::TempDir) -> (Scheduler, Arc<Counting>) {
        let messenger = Arc::new(Counting::default());
        let counters = Arc::new(CounterFile::load(dir.path().join("stats.json")));
        let engine = Arc::new(NotificationEngine::new(store, messenger.clone(), counters, 1));
        let scheduler = Scheduler::new(engine, Clock::default(), 0)
            .with_heartbeat(Heartbeat::new(dir.path().join("healthcheck")))
            .with_intervals(Duration::from_millis(10), Duration::from_millis(25));
        (scheduler, messenger)
    }

    #[tokio::test]
    async fn test_tick_runs_once_per_day() {
        let dir = tempfile::tempdir().unwrap();
        let today = Clock::default().today();
        let store = Arc::new(MemoryStore::with_rows([json!({
            "id": 1, "name": "a.ru", "status": "active",
            "expires_at": (today + chrono::Duration::days(7)).to_string()
        })]));
        let (mut scheduler, messenger) = scheduler(store, &dir);

        assert_eq!(scheduler.tick().await, Duration::from_millis(10));
        assert_eq!(scheduler.trigger().last_run(), Some(today));
        scheduler.tick().await;
        assert_eq!(messenger.0.load(Ordering::SeqCst), 1);
        assert!(Heartbeat::new(dir.path().join("healthcheck")).last_beat().is_some());
    }

    #[tokio::test]
    async fn test_failed_sweep_backs_off_without_advancing() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        store.fail_reads(true);
        let (mut scheduler, _) = scheduler(store.clone(), &dir);

        assert_eq!(scheduler.tick().await, Duration::from_millis(25));
        assert_eq!(scheduler.trigger().last_run(), None);

        store.fail_reads(false);
        scheduler.tick().await;
        assert!(scheduler.trigger().last_run().is_some());
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let (scheduler, _) = scheduler(Arc::new(MemoryStore::new()), &dir);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_eviction_timer() {
        let pending: Arc<dyn PendingActions> = Arc::new(InMemoryPendingActions::new());
        let draft = ServiceDraft::new("a.ru", date(2030, 1, 1), DraftSource::Fallback);
        pending.stage(
            PendingPayload::AddService(draft.clone()),
            1,
            Utc::now() - chrono::Duration::hours(2),
        );
        let fresh = pending.stage(PendingPayload::AddService(draft), 1, Utc::now());

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_eviction(
            Arc::clone(&pending),
            chrono::Duration::hours(1),
            Duration::from_millis(10),
            cancel.clone(),
        ));
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(pending.len(), 1);
        assert!(pending.resolve(&fresh).is_ok());
    }
}
