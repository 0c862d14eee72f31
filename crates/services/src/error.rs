//! Shared error types for the services crate.

use thiserror::Error;

use course_core::progression::ProgressionError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgressionEngine`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error(transparent)]
    Progression(#[from] ProgressionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EngineError {
    /// The rejected progression rule, if that is what failed.
    #[must_use]
    pub fn progression(&self) -> Option<&ProgressionError> {
        match self {
            EngineError::Progression(err) => Some(err),
            EngineError::Storage(_) => None,
        }
    }
}

/// Errors emitted while bootstrapping course services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
