//! Test utilities for syncflow integration testing
//!
//! In-memory implementations of the three collaborator traits, deterministic
//! and free of network calls:
//!
//! - [`InMemorySearchBackend`] - index/alias/document state plus a recorded
//!   call log for order-sensitive assertions (alias cutover windows,
//!   delete-before-insert resolution);
//! - [`InMemoryRecordStore`] - kind/id keyed records with updated-timestamp
//!   filtering;
//! - [`InMemoryTaskQueue`] - long-poll pull, explicit acknowledgment, and a
//!   redelivery helper for at-least-once scenarios.

pub mod backend;
pub mod queue;
pub mod store;

pub use backend::{BackendCall, InMemorySearchBackend};
pub use queue::InMemoryTaskQueue;
pub use store::InMemoryRecordStore;
