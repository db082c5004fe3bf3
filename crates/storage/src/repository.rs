use async_trait::async_trait;
use learn_core::model::{CourseId, CourseInteraction, CourseProgress};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::documents::DocumentRepository;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── KEY-VALUE STORE ───────────────────────────────────────────────────────────
//

/// Monotonic per-key revision; the first write of a key yields revision 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(u64);

impl Revision {
    #[must_use]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A raw value as held by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
    pub value: String,
    pub revision: Revision,
}

/// Persistent string key-value store with optimistic revisions.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get(&self, key: &str) -> Result<Option<StoredValue>, StorageError>;

    /// Unconditionally write `value`, returning the new revision.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn put(&self, key: &str, value: &str) -> Result<Revision, StorageError>;

    /// Write `value` only if the key is still at `expected` (`None` meaning
    /// the key must not exist yet).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the stored revision differs.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<Revision>,
        value: &str,
    ) -> Result<Revision, StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// List keys starting with `prefix`, sorted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// Simple in-memory store for tests and throwaway sessions.
#[derive(Clone, Default)]
pub struct InMemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, StoredValue>>>,
}

impl InMemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<StoredValue>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<Revision, StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let revision = guard
            .get(key)
            .map_or(Revision::new(1), |existing| existing.revision.next());
        guard.insert(
            key.to_owned(),
            StoredValue {
                value: value.to_owned(),
                revision,
            },
        );
        Ok(revision)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<Revision>,
        value: &str,
    ) -> Result<Revision, StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let current = guard.get(key).map(|v| v.revision);
        if current != expected {
            return Err(StorageError::Conflict);
        }
        let revision = current.map_or(Revision::new(1), |r| r.next());
        guard.insert(
            key.to_owned(),
            StoredValue {
                value: value.to_owned(),
                revision,
            },
        );
        Ok(revision)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut keys: Vec<String> = guard
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

//
// ─── DOCUMENT REPOSITORIES ─────────────────────────────────────────────────────
//

/// How per-course documents are laid out in the key-value store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyLayout {
    /// One key per course, e.g. `courseProgress/<id>`.
    #[default]
    PerCourse,
    /// One JSON object keyed by course id under a single key, as the web
    /// front-end writes it. Every save rewrites the whole map.
    SharedBlob,
}

/// Write precondition for document saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Overwrite,
    /// Only write if the backing key is still at this revision.
    IfRevision(Option<Revision>),
}

/// A document read together with the revision of its backing key.
///
/// `revision` is `None` only when the backing key does not exist. Under
/// `KeyLayout::SharedBlob` a course missing from an existing blob still
/// carries the blob's revision, which is what a conditional write must name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub value: T,
    pub revision: Option<Revision>,
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch saved progress for a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored record cannot be
    /// parsed, or other storage errors.
    async fn load_progress(
        &self,
        course: &CourseId,
    ) -> Result<Versioned<Option<CourseProgress>>, StorageError>;

    /// Persist progress for a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if `mode` carries a stale revision.
    async fn save_progress(
        &self,
        course: &CourseId,
        progress: &CourseProgress,
        mode: WriteMode,
    ) -> Result<Revision, StorageError>;

    /// Remove saved progress for a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn delete_progress(&self, course: &CourseId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait InteractionRepository: Send + Sync {
    /// Fetch the interaction log for a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored record cannot be
    /// parsed, or other storage errors.
    async fn load_interactions(
        &self,
        course: &CourseId,
    ) -> Result<Versioned<Option<CourseInteraction>>, StorageError>;

    /// Persist the interaction log for a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if `mode` carries a stale revision.
    async fn save_interactions(
        &self,
        course: &CourseId,
        interactions: &CourseInteraction,
        mode: WriteMode,
    ) -> Result<Revision, StorageError>;

    /// Every stored interaction log, keyed by course. Unreadable entries are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn list_interactions(&self) -> Result<BTreeMap<CourseId, CourseInteraction>, StorageError>;
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub kv: Arc<dyn KeyValueStore>,
    pub progress: Arc<dyn ProgressRepository>,
    pub interactions: Arc<dyn InteractionRepository>,
}

impl Storage {
    /// Build repositories over any key-value backend.
    #[must_use]
    pub fn from_kv(kv: Arc<dyn KeyValueStore>, layout: KeyLayout) -> Self {
        let documents = DocumentRepository::new(Arc::clone(&kv), layout);
        let progress: Arc<dyn ProgressRepository> = Arc::new(documents.clone());
        let interactions: Arc<dyn InteractionRepository> = Arc::new(documents);
        Self {
            kv,
            progress,
            interactions,
        }
    }

    #[must_use]
    pub fn in_memory(layout: KeyLayout) -> Self {
        Self::from_kv(Arc::new(InMemoryKeyValueStore::new()), layout)
    }
}
