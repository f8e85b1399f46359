//! Local state for the expiry notifier.
//!
//! Everything here is a restart-survival convenience, not a data contract:
//! the sweep counters, the scheduler heartbeat and the single-instance PID
//! lock. Writes go through a temp file and a rename so a crash never leaves
//! a half-written file behind.
//!
//! # Example
//!
//! ```no_run
//! use notifier_persistence::{CounterFile, Heartbeat};
//!
//! let counters = CounterFile::load("/var/lib/notifier/stats.json");
//! counters.record_check().unwrap();
//!
//! let heartbeat = Heartbeat::new("/var/lib/notifier/healthcheck");
//! heartbeat.beat(chrono::Utc::now()).unwrap();
//! ```

pub mod atomic;
pub mod counters;
pub mod error;
pub mod heartbeat;
pub mod lock;

pub use counters::{CounterFile, SweepCounters};
pub use error::{PersistenceError, Result};
pub use heartbeat::Heartbeat;
pub use lock::{InstanceLock, LockStatus};
