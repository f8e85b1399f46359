//! Sweep counters that survive restarts.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::atomic::{atomic_write_json, read_json_optional};
use crate::error::Result;

/// Totals accumulated over the bot's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepCounters {
    /// Sweeps started.
    #[serde(default)]
    pub total_checks: u64,
    /// Reminders sent.
    #[serde(default)]
    pub total_notifications: u64,
}

/// File-backed [`SweepCounters`], rewritten on every update.
#[derive(Debug)]
pub struct CounterFile {
    path: PathBuf,
    counters: Mutex<SweepCounters>,
}

impl CounterFile {
    /// Load counters from `path`, starting from zero when the file is missing
    /// or unreadable.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let counters = match read_json_optional::<SweepCounters>(&path) {
            Ok(Some(c)) => {
                debug!(
                    checks = c.total_checks,
                    notifications = c.total_notifications,
                    "Loaded counters"
                );
                c
            }
            Ok(None) => SweepCounters::default(),
            Err(e) => {
                warn!(
                    error = %e,
                    path = %path.display(),
                    "Failed to load counters, starting from zero"
                );
                SweepCounters::default()
            }
        };

        Self {
            path,
            counters: Mutex::new(counters),
        }
    }

    /// Where the counters are stored.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current totals.
    pub fn snapshot(&self) -> SweepCounters {
        *self.lock()
    }

    /// Count one sweep and persist.
    pub fn record_check(&self) -> Result<SweepCounters> {
        self.update(|c| c.total_checks += 1)
    }

    /// Count `sent` reminders and persist.
    pub fn record_notifications(&self, sent: u64) -> Result<SweepCounters> {
        self.update(|c| c.total_notifications += sent)
    }

    fn update(&self, f: impl FnOnce(&mut SweepCounters)) -> Result<SweepCounters> {
        let snapshot = {
            let mut counters = self.lock();
            f(&mut counters);
            *counters
        };
        atomic_write_json(&self.path, &snapshot)?;
        Ok(snapshot)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SweepCounters> {
        // A panic while holding the lock cannot leave the counters invalid.
        self.counters.lock().unwrap_or_else(|e| e.into_inner())
    }
}
