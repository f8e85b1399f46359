//! Start/stop notices and the startup digest.
//!
//! All of these are best effort: an unreachable chat platform or store is
//! logged and the bot carries on.

use std::future::Future;
use std::time::Duration;

use notifier_core::format::{self, ServiceTotals};
use tracing::{info, warn};

use crate::error::{Result, TelegramError};
use crate::state::BotState;

/// Bound on the "bot started" notice and the digest that follows it.
pub const START_NOTICE_TIMEOUT: Duration = Duration::from_secs(30);

/// Bound on the "bot stopped" notice.
pub const STOP_NOTICE_TIMEOUT: Duration = Duration::from_secs(10);

async fn timeboxed<F>(what: &'static str, limit: Duration, fut: F) -> bool
where
    F: Future<Output = Result<()>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(notice = what, error = %e, "Lifecycle notice failed");
            false
        }
        Err(_) => {
            warn!(notice = what, timeout = ?limit, "Lifecycle notice timed out");
            false
        }
    }
}

/// Tell the operator the bot is up, with service totals.
pub async fn announce_start(state: &BotState) -> bool {
    if !state.config.has_admin() {
        return false;
    }
    timeboxed("start", START_NOTICE_TIMEOUT, async {
        let totals = match state.store.all_services().await {
            Ok(services) => ServiceTotals::of(&services),
            Err(e) => {
                warn!(error = %e, "Could not load services for the start notice");
                ServiceTotals::default()
            }
        };
        let text = format::start_message(state.clock.now(), &totals);
        state.messenger.send(state.admin_chat(), &text, None).await?;
        info!(services = totals.total, "Start notice sent");
        Ok::<(), TelegramError>(())
    })
    .await
}

/// Send the expired / expiring digest once at startup.
pub async fn startup_check(state: &BotState) -> bool {
    if !state.config.has_admin() {
        return false;
    }
    timeboxed("startup_digest", START_NOTICE_TIMEOUT, async {
        let today = state.clock.today();
        if state.engine.startup_digest(today).await?.is_none() {
            info!("Startup check: nothing expiring");
        }
        Ok::<(), TelegramError>(())
    })
    .await
}

/// Tell the operator the bot is going down, with uptime and counters.
pub async fn announce_stop(state: &BotState) -> bool {
    if !state.config.has_admin() {
        return false;
    }
    timeboxed("stop", STOP_NOTICE_TIMEOUT, async {
        let counters = state.engine.counters().snapshot();
        let text = format::stop_message(state.uptime(), counters);
        state.messenger.send(state.admin_chat(), &text, None).await?;
        Ok::<(), TelegramError>(())
    })
    .await
}
