//! Foundation types for Sift.
//!
//! Every stored document lives under a [`DocKey`]: a caller-chosen
//! [`Namespace`] plus a [`DocId`] unique within that namespace. The
//! [`Document`] itself is an opaque JSON value that Sift never interprets.
//!
//! # Key Types
//!
//! - [`Namespace`] — Isolated keyspace, created implicitly on first write
//! - [`DocId`] — Document identifier within a namespace
//! - [`DocKey`] — The `(namespace, id)` pair documents are stored under
//! - [`Document`] — Any JSON value, including `null`

pub mod document;
pub mod error;
pub mod key;

pub use document::Document;
pub use error::KeyError;
pub use key::{DocId, DocKey, Namespace};
