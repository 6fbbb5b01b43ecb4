use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{StatusCode, Uri};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use sift_store::{DocumentStore, StoreError, StoreResult};
use sift_types::{DocKey, Document};

use crate::error::ApiError;

/// Shared handler state: the store every request goes through.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn DocumentStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Run a store call on the blocking pool.
    ///
    /// Durable backends do file I/O and may sleep between retries, which must
    /// not stall the async workers.
    async fn call<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn DocumentStore) -> StoreResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| ApiError::Internal(format!("store task failed: {e}")))?;
        Ok(result?)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub backend: String,
    pub documents: usize,
    pub version: String,
}

/// `POST /:namespace/:id` — decode the body and upsert it.
///
/// The body is decoded before the store is touched: malformed JSON is
/// answered with 422 and nothing is written.
pub async fn create_document(
    State(state): State<AppState>,
    Path((namespace, id)): Path<(String, String)>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let document = Document::from_json_slice(&body)?;
    state
        .call(move |store| store.put(&namespace, &id, document))
        .await?;
    Ok(StatusCode::CREATED)
}

/// `GET /:namespace/:id` — return the stored document.
pub async fn show_document(
    State(state): State<AppState>,
    Path((namespace, id)): Path<(String, String)>,
) -> Result<Json<Document>, ApiError> {
    let lookup = {
        let (namespace, id) = (namespace.clone(), id.clone());
        state.call(move |store| store.get(&namespace, &id)).await?
    };
    lookup
        .map(Json)
        .ok_or(ApiError::NotFound { namespace, id })
}

/// `GET /_health` — liveness plus a document count.
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, ApiError> {
    let backend = state.store().backend_name().to_string();
    let documents = state.call(|store| store.len()).await?;
    Ok(Json(HealthResponse {
        status: "ok".into(),
        backend,
        documents,
        version: env!("CARGO_PKG_VERSION").into(),
    }))
}

/// Requests no route matched.
///
/// Document paths with an empty component (`/products/`, `/products//`,
/// `//42`) never reach the document routes, so they are rejected here as
/// invalid keys rather than reported as missing documents.
pub async fn fallback(uri: Uri) -> ApiError {
    let path = uri.path().strip_prefix('/').unwrap_or(uri.path());
    let segments: Vec<&str> = path.split('/').collect();
    let key_parts = match segments.as_slice() {
        [namespace, id] | [namespace, id, ""] => Some((*namespace, *id)),
        _ => None,
    };
    match key_parts.map(|(namespace, id)| DocKey::new(namespace, id)) {
        Some(Err(e)) => ApiError::Store(StoreError::InvalidKey(e)),
        _ => ApiError::NoRoute(uri.path().to_string()),
    }
}
