use sift_types::{DocKey, Document};

use crate::error::StoreResult;

/// Namespaced document store.
///
/// All implementations must satisfy these invariants:
/// - At most one document per key. A write to an existing key replaces it.
/// - A read that starts after a write returned observes that write or a
///   later one, never a partially written value.
/// - A key that was never written reads as `Ok(None)`. A stored `null`
///   document reads as `Ok(Some(..))`.
/// - Writes to unrelated keys do not block each other's readers.
/// - Backend failures are propagated as `StorageFailure`, never swallowed.
pub trait DocumentStore: Send + Sync {
    /// Insert or replace the document stored under `key`.
    fn write(&self, key: &DocKey, document: Document) -> StoreResult<()>;

    /// Read the document stored under `key`.
    ///
    /// Returns `Ok(None)` if the key has never been written.
    fn read(&self, key: &DocKey) -> StoreResult<Option<Document>>;

    /// Number of documents currently stored, across all namespaces.
    fn len(&self) -> StoreResult<usize>;

    /// Short label identifying the backend, for diagnostics.
    fn backend_name(&self) -> &'static str;

    /// Validate `(namespace, id)` and upsert the document.
    ///
    /// An empty namespace or id fails with `InvalidKey` and writes nothing.
    fn put(&self, namespace: &str, id: &str, document: Document) -> StoreResult<()> {
        let key = DocKey::new(namespace, id)?;
        self.write(&key, document)
    }

    /// Validate `(namespace, id)` and read the document.
    fn get(&self, namespace: &str, id: &str) -> StoreResult<Option<Document>> {
        let key = DocKey::new(namespace, id)?;
        self.read(&key)
    }

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}
