use std::collections::HashSet;

use thiserror::Error;

use crate::model::ids::LessonId;
use crate::model::lesson::LessonDescriptor;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("lesson {0} is not in the catalog")]
    NotFound(LessonId),

    #[error("lesson {0} appears more than once")]
    DuplicateLesson(LessonId),

    #[error("lesson ids must be contiguous from 1: expected {expected}, found {found}")]
    NonContiguous { expected: LessonId, found: LessonId },

    #[error("lesson {0} must have a duration > 0")]
    InvalidDuration(LessonId),

    #[error("lesson {0} must be worth > 0 points")]
    InvalidPoints(LessonId),

    #[error("lesson {0} must have a title")]
    EmptyTitle(LessonId),
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Read-only, ordered list of the lessons in one course week.
///
/// Lessons are sorted by `(order, id)` and their ids are contiguous from 1, so
/// the lesson with id `n` lives at index `n - 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LessonCatalog {
    lessons: Vec<LessonDescriptor>,
}

impl LessonCatalog {
    /// Build a catalog from descriptors in any order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if ids repeat, are not contiguous from 1 in
    /// `order` sequence, or a lesson has an empty title, zero duration, or
    /// zero points.
    pub fn new(mut lessons: Vec<LessonDescriptor>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(lessons.len());
        for lesson in &lessons {
            if !seen.insert(lesson.id()) {
                return Err(CatalogError::DuplicateLesson(lesson.id()));
            }
            if lesson.title().trim().is_empty() {
                return Err(CatalogError::EmptyTitle(lesson.id()));
            }
            if lesson.duration_minutes() == 0 {
                return Err(CatalogError::InvalidDuration(lesson.id()));
            }
            if lesson.points() == 0 {
                return Err(CatalogError::InvalidPoints(lesson.id()));
            }
        }

        lessons.sort_by_key(|lesson| (lesson.order(), lesson.id()));

        for (expected, lesson) in (1_u32..).zip(&lessons) {
            if lesson.id().value() != expected {
                return Err(CatalogError::NonContiguous {
                    expected: LessonId::new(expected),
                    found: lesson.id(),
                });
            }
        }

        Ok(Self { lessons })
    }

    /// A catalog with no lessons. Used when week content could not be loaded;
    /// every lesson-dependent operation becomes inert.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a lesson.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for ids outside the catalog.
    pub fn get(&self, id: LessonId) -> Result<&LessonDescriptor, CatalogError> {
        let index = usize::try_from(id.value())
            .ok()
            .and_then(|value| value.checked_sub(1))
            .ok_or(CatalogError::NotFound(id))?;
        self.lessons.get(index).ok_or(CatalogError::NotFound(id))
    }

    #[must_use]
    pub fn contains(&self, id: LessonId) -> bool {
        self.get(id).is_ok()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.lessons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }

    /// Id of the first lesson. Always `1`; an empty catalog still reports `1`
    /// so that defaults stay well-formed, but `contains` is false for it.
    #[must_use]
    pub fn first_id(&self) -> LessonId {
        self.lessons
            .first()
            .map_or(LessonId::new(1), LessonDescriptor::id)
    }

    #[must_use]
    pub fn last_id(&self) -> Option<LessonId> {
        self.lessons.last().map(LessonDescriptor::id)
    }

    #[must_use]
    pub fn is_last(&self, id: LessonId) -> bool {
        self.last_id() == Some(id)
    }

    /// Sum of completion points over all lessons.
    #[must_use]
    pub fn total_points(&self) -> u64 {
        self.lessons
            .iter()
            .map(|lesson| u64::from(lesson.points()))
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LessonDescriptor> {
        self.lessons.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson(id: u32, points: u32) -> LessonDescriptor {
        LessonDescriptor::new(LessonId::new(id), format!("Lesson {id}"), 15, points)
    }

    #[test]
    fn catalog_sorts_and_indexes_by_id() {
        let catalog = LessonCatalog::new(vec![lesson(2, 60), lesson(1, 50), lesson(3, 80)]).unwrap();
        assert_eq!(catalog.count(), 3);
        assert_eq!(catalog.first_id(), LessonId::new(1));
        assert_eq!(catalog.get(LessonId::new(2)).unwrap().points(), 60);
        assert!(catalog.is_last(LessonId::new(3)));
        assert!(!catalog.is_last(LessonId::new(2)));
        assert_eq!(catalog.total_points(), 190);
    }

    #[test]
    fn unknown_lessons_are_not_found() {
        let catalog = LessonCatalog::new(vec![lesson(1, 50)]).unwrap();
        assert_eq!(
            catalog.get(LessonId::new(0)).unwrap_err(),
            CatalogError::NotFound(LessonId::new(0))
        );
        assert!(!catalog.contains(LessonId::new(2)));
    }

    #[test]
    fn gaps_are_rejected() {
        let err = LessonCatalog::new(vec![lesson(1, 50), lesson(3, 80)]).unwrap_err();
        assert_eq!(
            err,
            CatalogError::NonContiguous {
                expected: LessonId::new(2),
                found: LessonId::new(3),
            }
        );
    }

    #[test]
    fn order_must_agree_with_ids() {
        let swapped = vec![lesson(1, 50).with_order(2), lesson(2, 60).with_order(1)];
        assert!(matches!(
            LessonCatalog::new(swapped),
            Err(CatalogError::NonContiguous { .. })
        ));
    }

    #[test]
    fn invalid_fields_are_rejected() {
        assert_eq!(
            LessonCatalog::new(vec![lesson(1, 0)]).unwrap_err(),
            CatalogError::InvalidPoints(LessonId::new(1))
        );
        let no_time = LessonDescriptor::new(LessonId::new(1), "Intro", 0, 50);
        assert_eq!(
            LessonCatalog::new(vec![no_time]).unwrap_err(),
            CatalogError::InvalidDuration(LessonId::new(1))
        );
        assert_eq!(
            LessonCatalog::new(vec![lesson(1, 50), lesson(1, 50)]).unwrap_err(),
            CatalogError::DuplicateLesson(LessonId::new(1))
        );
    }

    #[test]
    fn empty_catalog_is_inert() {
        let catalog = LessonCatalog::empty();
        assert!(catalog.is_empty());
        assert_eq!(catalog.first_id(), LessonId::new(1));
        assert!(!catalog.contains(LessonId::new(1)));
        assert!(!catalog.is_last(LessonId::new(1)));
    }
}
