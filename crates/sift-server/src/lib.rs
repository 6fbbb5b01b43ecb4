//! HTTP server for Sift.
//!
//! Maps two routes onto the document store:
//!
//! - `POST /:namespace/:id` decodes the JSON body and upserts it (`201`)
//! - `GET /:namespace/:id` returns the stored document (`200`) or `404`
//!
//! Malformed bodies get `422` without touching the store, empty keys `400`
//! (including paths like `/products/` that no route matches), oversized
//! bodies `413`, and backend failures `500`.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::{ServerConfig, DEFAULT_MAX_BODY_BYTES};
pub use error::{ApiError, ServerError, ServerResult};
pub use handler::{AppState, HealthResponse};
pub use server::SiftServer;
