//! Single-instance PID lock.
//!
//! Two bot processes against the same store would double-send reminders,
//! so startup takes a PID file and refuses to run while its owner is alive.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::atomic::atomic_write;
use crate::error::{PersistenceError, Result};

/// Held PID lock; the file is removed on drop.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    /// Take the lock at `path`.
    ///
    /// A file naming a live process fails with
    /// [`PersistenceError::AlreadyRunning`]; a stale or unreadable file is
    /// replaced.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(pid) = read_pid(&path) {
            if pid != std::process::id() && process_alive(pid) {
                return Err(PersistenceError::AlreadyRunning { pid });
            }
            info!(pid, path = %path.display(), "Removing stale instance lock");
        }

        atomic_write(&path, std::process::id().to_string().as_bytes())?;
        debug!(path = %path.display(), "Instance lock acquired");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Operator recovery for a running instance: make the lock file at
    /// `path` name this process again unless another live process owns it.
    pub fn reclaim(path: &Path) -> Result<LockStatus> {
        let own = std::process::id();
        let status = match read_pid(path) {
            Some(pid) if pid == own => return Ok(LockStatus::Held { pid }),
            Some(pid) if process_alive(pid) => return Ok(LockStatus::Contested { pid }),
            Some(pid) => LockStatus::Reclaimed { stale: Some(pid) },
            None => LockStatus::Reclaimed { stale: None },
        };
        atomic_write(path, own.to_string().as_bytes())?;
        info!(path = %path.display(), ?status, "Instance lock reclaimed");
        Ok(status)
    }
}

/// Result of [`InstanceLock::reclaim`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    /// The file already names this process.
    Held { pid: u32 },
    /// Another live process holds the file; left untouched.
    Contested { pid: u32 },
    /// The file was missing, unreadable or named a dead process and now
    /// names this one.
    Reclaimed { stale: Option<u32> },
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if read_pid(&self.path) == Some(std::process::id()) {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!(error = %e, path = %self.path.display(), "Failed to release instance lock");
            }
        }
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    // Off Linux every lock file counts as stale.
    false
}
