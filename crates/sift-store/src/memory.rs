use std::collections::BTreeSet;

use dashmap::DashMap;
use sift_types::{DocKey, Document, Namespace};

use crate::error::StoreResult;
use crate::traits::DocumentStore;

/// Default number of shards for the in-memory map.
pub const DEFAULT_SHARDS: usize = 16;

/// In-memory, sharded document store.
///
/// Documents live in a [`DashMap`]: each key hashes to one shard, and a write
/// only locks that shard, so traffic on unrelated keys does not contend.
/// Documents are cloned on read. Data is lost when the store is dropped.
pub struct MemoryStore {
    documents: DashMap<DocKey, Document>,
}

impl MemoryStore {
    /// Create a new empty store with [`DEFAULT_SHARDS`] shards.
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Create a new empty store with the given shard count.
    ///
    /// The count is rounded up to a power of two, with a minimum of 2.
    pub fn with_shards(shards: usize) -> Self {
        Self {
            documents: DashMap::with_shard_amount(normalize_shards(shards)),
        }
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Distinct namespaces holding at least one document, sorted.
    pub fn namespaces(&self) -> Vec<Namespace> {
        let set: BTreeSet<Namespace> = self
            .documents
            .iter()
            .map(|entry| entry.key().namespace.clone())
            .collect();
        set.into_iter().collect()
    }

    /// Copy of every stored document, sorted by key.
    ///
    /// Not a point-in-time view: writes that race with the scan may or may
    /// not be included.
    pub fn entries(&self) -> Vec<(DocKey, Document)> {
        let mut entries: Vec<(DocKey, Document)> = self
            .documents
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        entries
    }

    pub(crate) fn insert(&self, key: DocKey, document: Document) {
        self.documents.insert(key, document);
    }

    pub(crate) fn lookup(&self, key: &DocKey) -> Option<Document> {
        self.documents.get(key).map(|entry| entry.value().clone())
    }
}

pub(crate) fn normalize_shards(shards: usize) -> usize {
    shards.max(2).next_power_of_two()
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryStore {
    fn write(&self, key: &DocKey, document: Document) -> StoreResult<()> {
        self.insert(key.clone(), document);
        Ok(())
    }

    fn read(&self, key: &DocKey) -> StoreResult<Option<Document>> {
        Ok(self.lookup(key))
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.documents.len())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("document_count", &self.documents.len())
            .finish()
    }
}
