//! Core data models for the expiry notifier.
//!
//! This crate provides the types shared by the record store, the
//! notification engine and the chat surface: tracked services, reminder
//! kinds, patches and row filters.

pub mod filter;
pub mod ids;
pub mod notification;
pub mod service;

// Re-export main types
pub use filter::Filter;
pub use ids::{ActionToken, ServiceId};
pub use notification::{classify, NotificationKind};
pub use service::{parse_store_date, NewService, ServicePatch, ServiceStatus, TrackedService};
