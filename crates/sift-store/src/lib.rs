//! Namespaced document storage for Sift.
//!
//! A store associates each `(namespace, id)` key with one opaque JSON
//! document. Writes are upserts; reads report a never-written key as
//! `Ok(None)` and reserve errors for invalid keys and backend failures.
//!
//! # Storage Backends
//!
//! All backends implement the [`DocumentStore`] trait:
//!
//! - [`MemoryStore`] -- sharded in-memory map, the default
//! - [`LogStore`] -- append-only CRC-framed log with an in-memory index,
//!   replayed on open
//!
//! [`open_store`] builds either one from a [`StoreConfig`].
//!
//! # Design Rules
//!
//! 1. One document per key; a second write replaces the first.
//! 2. A read that starts after a write returned sees that write or a later one.
//! 3. Writes to different keys never block each other's readers.
//! 4. The store never interprets document contents.
//! 5. All backend errors are propagated, never silently ignored.

pub mod config;
pub mod error;
pub mod log;
pub mod memory;
pub mod retry;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use config::{open_store, BackendConfig, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use log::{LogConfig, LogRecord, LogStore, SyncMode, LOCK_FILE_NAME, LOG_FILE_NAME};
pub use memory::{MemoryStore, DEFAULT_SHARDS};
pub use retry::RetryPolicy;
pub use traits::DocumentStore;
