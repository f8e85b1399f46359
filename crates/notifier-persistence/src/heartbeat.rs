//! Liveness file touched by the scheduler loop.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::atomic::atomic_write;
use crate::error::Result;

/// Plain-text file holding the unix timestamp of the last scheduler poll.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    path: PathBuf,
}

impl Heartbeat {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a beat at `now`.
    pub fn beat(&self, now: DateTime<Utc>) -> Result<()> {
        atomic_write(&self.path, now.timestamp().to_string().as_bytes())
    }

    /// Time of the last recorded beat, if any.
    pub fn last_beat(&self) -> Option<DateTime<Utc>> {
        let raw = fs::read_to_string(&self.path).ok()?;
        let secs: i64 = raw.trim().parse().ok()?;
        DateTime::from_timestamp(secs, 0)
    }
}
