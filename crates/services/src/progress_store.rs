use std::sync::Arc;

use course_core::Clock;
use course_core::model::{HydrationIssue, ProgressDraft, ProgressSnapshot};
use storage::document::ProgressDocument;
use storage::repository::{ProgressRepository, StorageError, StorageKey};
use tracing::{debug, warn};

/// Reads and writes one week's progress document.
#[derive(Clone)]
pub struct ProgressStore {
    clock: Clock,
    key: StorageKey,
    repo: Arc<dyn ProgressRepository>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(clock: Clock, key: StorageKey, repo: Arc<dyn ProgressRepository>) -> Self {
        Self { clock, key, repo }
    }

    #[must_use]
    pub fn key(&self) -> &StorageKey {
        &self.key
    }

    /// Load the stored draft along with any fields dropped while reading it.
    /// A missing document yields an empty draft; an unreadable one yields an
    /// empty draft plus `HydrationIssue::Unreadable`.
    pub async fn load(&self) -> (ProgressDraft, Vec<HydrationIssue>) {
        let raw = match self.repo.load_document(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return (ProgressDraft::default(), Vec::new()),
            Err(err) => return (ProgressDraft::default(), vec![self.unreadable(&err)]),
        };
        match ProgressDocument::decode(&raw) {
            Ok(decoded) => (decoded.draft, decoded.issues),
            Err(err) => (ProgressDraft::default(), vec![self.unreadable(&err)]),
        }
    }

    /// Write `snapshot`, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if encoding or the write fails.
    pub async fn save(&self, snapshot: &ProgressSnapshot) -> Result<(), StorageError> {
        let body = ProgressDocument::from_snapshot(snapshot, self.clock.now()).to_json()?;
        self.repo.save_document(&self.key, &body).await?;
        debug!(key = %self.key, "progress persisted");
        Ok(())
    }

    /// Remove the stored document. Clearing nothing is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    pub async fn clear(&self) -> Result<(), StorageError> {
        match self.repo.clear_document(&self.key).await {
            Ok(()) | Err(StorageError::NotFound) => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn unreadable(&self, err: &StorageError) -> HydrationIssue {
        warn!(key = %self.key, error = %err, "stored progress unreadable; starting fresh");
        HydrationIssue::Unreadable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::{LessonId, WeekId};
    use course_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    fn store(repo: &InMemoryRepository) -> ProgressStore {
        ProgressStore::new(
            fixed_clock(),
            StorageKey::for_week(WeekId::new(1)),
            Arc::new(repo.clone()),
        )
    }

    #[tokio::test]
    async fn missing_document_is_a_clean_start() {
        let repo = InMemoryRepository::new();
        let (draft, issues) = store(&repo).load().await;
        assert_eq!(draft, ProgressDraft::default());
        assert!(issues.is_empty());
    }

    #[tokio::test]
    async fn corrupt_document_is_reported() {
        let repo = InMemoryRepository::new();
        let store = store(&repo);
        repo.save_document(store.key(), "{ definitely not json")
            .await
            .unwrap();

        let (draft, issues) = store.load().await;
        assert_eq!(draft, ProgressDraft::default());
        assert!(matches!(issues.as_slice(), [HydrationIssue::Unreadable(_)]));
    }

    #[tokio::test]
    async fn one_bad_field_does_not_discard_the_document() {
        let repo = InMemoryRepository::new();
        let store = store(&repo);
        repo.save_document(
            store.key(),
            r#"{"currentLessonId":3,"completedLessonIds":[1,2],"userProgress":{"totalPoints":110.0,"timeSpent":"ten"}}"#,
        )
        .await
        .unwrap();

        let (draft, issues) = store.load().await;
        assert_eq!(draft.completed, vec![1, 2]);
        assert_eq!(draft.total_points, Some(110));
        assert_eq!(draft.time_spent_secs, None);
        assert_eq!(
            issues,
            vec![HydrationIssue::MalformedField {
                field: "userProgress.timeSpent".into()
            }]
        );
    }

    #[tokio::test]
    async fn save_then_load_and_clear() {
        let repo = InMemoryRepository::new();
        let store = store(&repo);
        let snapshot = ProgressSnapshot::new(LessonId::new(1));

        store.save(&snapshot).await.unwrap();
        let (draft, issues) = store.load().await;
        assert!(issues.is_empty());
        assert_eq!(draft.current_lesson, Some(1));

        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert!(repo.load_document(store.key()).await.unwrap().is_none());
    }
}
