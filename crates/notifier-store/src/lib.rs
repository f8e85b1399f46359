//! Record store for tracked services.
//!
//! [`RecordStore`] is the seam between the notifier and its table.
//! [`RestTableStore`] talks to a PostgREST endpoint (Supabase);
//! [`MemoryStore`] keeps rows in process for tests.

pub mod error;
pub mod memory;
pub mod rest;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use rest::RestTableStore;
pub use store::RecordStore;
