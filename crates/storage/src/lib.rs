#![forbid(unsafe_code)]

pub mod content;
pub mod document;
pub mod repository;
pub mod sqlite;

pub use content::{
    ContentLoadError, ContentProvider, FileContentProvider, JsonContentProvider, WeekContent,
};
pub use document::{DecodedProgress, ProgressDocument};
pub use repository::{InMemoryRepository, ProgressRepository, Storage, StorageError, StorageKey};
