//! Lesson reachability rules.
//!
//! Every check reads the snapshot as it is right now; nothing here is cached.

use crate::model::{LessonCatalog, LessonId, ProgressSnapshot, UnlockPolicy};

/// Completion-gated access: the first lesson is always open, any other lesson
/// opens once its predecessor is completed. Ids outside the catalog are closed.
#[must_use]
pub fn can_access(catalog: &LessonCatalog, snapshot: &ProgressSnapshot, id: LessonId) -> bool {
    AccessPolicy::default().can_access(catalog, snapshot, id)
}

/// Access rules parameterised by the week's [`UnlockPolicy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    unlock: UnlockPolicy,
}

impl AccessPolicy {
    #[must_use]
    pub fn new(unlock: UnlockPolicy) -> Self {
        Self { unlock }
    }

    #[must_use]
    pub fn unlock_policy(&self) -> UnlockPolicy {
        self.unlock
    }

    #[must_use]
    pub fn can_access(
        &self,
        catalog: &LessonCatalog,
        snapshot: &ProgressSnapshot,
        id: LessonId,
    ) -> bool {
        if !catalog.contains(id) {
            return false;
        }
        if id == catalog.first_id() {
            return true;
        }
        let Some(previous) = id.previous() else {
            return false;
        };
        match self.unlock {
            UnlockPolicy::OnCompletion => snapshot.is_completed(previous),
            UnlockPolicy::OnEntry => {
                snapshot.is_completed(previous) || snapshot.is_started(previous)
            }
        }
    }

    /// Navigation state of every lesson in catalog order.
    #[must_use]
    pub fn lesson_statuses(
        &self,
        catalog: &LessonCatalog,
        snapshot: &ProgressSnapshot,
    ) -> Vec<LessonNavItem> {
        catalog
            .iter()
            .map(|lesson| {
                let id = lesson.id();
                let status = if id == snapshot.current_lesson() {
                    LessonStatus::Current
                } else if snapshot.is_completed(id) {
                    LessonStatus::Completed
                } else if self.can_access(catalog, snapshot, id) {
                    LessonStatus::Unlocked
                } else {
                    LessonStatus::Locked
                };
                LessonNavItem {
                    id,
                    title: lesson.title().to_string(),
                    status,
                }
            })
            .collect()
    }
}

/// How a lesson should appear in the week's navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonStatus {
    Current,
    Completed,
    Unlocked,
    Locked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonNavItem {
    pub id: LessonId,
    pub title: String,
    pub status: LessonStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LessonDescriptor;

    fn catalog() -> LessonCatalog {
        let points = [50, 60, 80, 100, 60, 50];
        LessonCatalog::new(
            (1_u32..)
                .zip(points)
                .map(|(id, pts)| LessonDescriptor::new(LessonId::new(id), format!("L{id}"), 15, pts))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn first_lesson_is_always_open() {
        let snapshot = ProgressSnapshot::new(LessonId::new(1));
        assert!(can_access(&catalog(), &snapshot, LessonId::new(1)));
    }

    #[test]
    fn access_follows_predecessor_completion() {
        let catalog = catalog();
        let mut snapshot = ProgressSnapshot::new(LessonId::new(1));
        snapshot.insert_completed(LessonId::new(1));
        snapshot.insert_completed(LessonId::new(2));

        for n in 2..=6 {
            let id = LessonId::new(n);
            let expected = snapshot.is_completed(LessonId::new(n - 1));
            assert_eq!(can_access(&catalog, &snapshot, id), expected, "lesson {n}");
        }
    }

    #[test]
    fn unknown_lessons_are_closed() {
        let catalog = catalog();
        let mut snapshot = ProgressSnapshot::new(LessonId::new(1));
        for n in 1..=6 {
            snapshot.insert_completed(LessonId::new(n));
        }
        assert!(!can_access(&catalog, &snapshot, LessonId::new(7)));
        assert!(!can_access(&catalog, &snapshot, LessonId::new(0)));
        assert!(!can_access(&LessonCatalog::empty(), &snapshot, LessonId::new(1)));
    }

    #[test]
    fn entry_policy_opens_after_start() {
        let catalog = catalog();
        let mut snapshot = ProgressSnapshot::new(LessonId::new(1));
        snapshot.mark_started(LessonId::new(1));

        let eager = AccessPolicy::new(UnlockPolicy::OnEntry);
        assert!(eager.can_access(&catalog, &snapshot, LessonId::new(2)));
        assert!(!eager.can_access(&catalog, &snapshot, LessonId::new(3)));
        assert!(!can_access(&catalog, &snapshot, LessonId::new(2)));
    }

    #[test]
    fn statuses_reflect_progress() {
        let catalog = catalog();
        let mut snapshot = ProgressSnapshot::new(LessonId::new(1));
        snapshot.insert_completed(LessonId::new(1));
        snapshot.set_current_lesson(LessonId::new(2));

        let statuses: Vec<_> = AccessPolicy::default()
            .lesson_statuses(&catalog, &snapshot)
            .into_iter()
            .map(|item| item.status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                LessonStatus::Completed,
                LessonStatus::Current,
                LessonStatus::Locked,
                LessonStatus::Locked,
                LessonStatus::Locked,
                LessonStatus::Locked,
            ]
        );
    }
}
