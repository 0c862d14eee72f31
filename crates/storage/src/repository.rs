use async_trait::async_trait;
use course_core::model::WeekId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Key a week's progress document is stored under, e.g. `week1_progress`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    #[must_use]
    pub fn for_week(week: WeekId) -> Self {
        Self(format!("week{}_progress", week.value()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key/value contract for serialized progress documents.
///
/// Documents are opaque JSON text at this layer; decoding lives in
/// [`crate::document`] so that unreadable payloads can be recovered from
/// instead of failing the load.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the raw document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn load_document(&self, key: &StorageKey) -> Result<Option<String>, StorageError>;

    /// Persist or replace the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be stored.
    async fn save_document(&self, key: &StorageKey, document: &str) -> Result<(), StorageError>;

    /// Remove the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if nothing was stored, or other storage errors.
    async fn clear_document(&self, key: &StorageKey) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and headless hosts.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    documents: Arc<Mutex<HashMap<StorageKey, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            documents: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_document(&self, key: &StorageKey) -> Result<Option<String>, StorageError> {
        let guard = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn save_document(&self, key: &StorageKey, document: &str) -> Result<(), StorageError> {
        let mut guard = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.clone(), document.to_owned());
        Ok(())
    }

    async fn clear_document(&self, key: &StorageKey) -> Result<(), StorageError> {
        let mut guard = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key).map(|_| ()).ok_or(StorageError::NotFound)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let progress: Arc<dyn ProgressRepository> = Arc::new(InMemoryRepository::new());
        Self { progress }
    }
}
