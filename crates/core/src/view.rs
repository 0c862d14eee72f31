use std::collections::BTreeSet;

use crate::model::{AchievementId, LessonCatalog, ProgressSnapshot};
use crate::time::format_time_spent;

/// Aggregated view of weekly progress, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressView {
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
    pub total_points: u64,
    pub time_spent_secs: u64,
    pub time_spent_label: String,
    pub achievements: BTreeSet<AchievementId>,
}

impl ProgressView {
    #[must_use]
    pub fn from_snapshot(catalog: &LessonCatalog, snapshot: &ProgressSnapshot) -> Self {
        let total = catalog.count();
        let completed = snapshot.completed().len().min(total);
        let percent = if total == 0 {
            0
        } else {
            u8::try_from((completed * 200 + total) / (2 * total)).unwrap_or(100)
        };
        Self {
            completed,
            total,
            percent,
            total_points: snapshot.total_points(),
            time_spent_secs: snapshot.time_spent_secs(),
            time_spent_label: format_time_spent(snapshot.time_spent_secs()),
            achievements: snapshot.achievements().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LessonDescriptor, LessonId};

    #[test]
    fn percent_is_rounded_share_of_lessons() {
        let catalog = LessonCatalog::new(
            (1..=6)
                .map(|id| LessonDescriptor::new(LessonId::new(id), format!("L{id}"), 10, 50))
                .collect(),
        )
        .unwrap();
        let mut snapshot = ProgressSnapshot::new(LessonId::new(1));
        snapshot.insert_completed(LessonId::new(1));

        let view = ProgressView::from_snapshot(&catalog, &snapshot);
        assert_eq!(view.completed, 1);
        assert_eq!(view.total, 6);
        assert_eq!(view.percent, 17);
        assert_eq!(view.time_spent_label, "0m");
    }

    #[test]
    fn empty_catalog_reports_zero_percent() {
        let snapshot = ProgressSnapshot::new(LessonId::new(1));
        let view = ProgressView::from_snapshot(&LessonCatalog::empty(), &snapshot);
        assert_eq!(view.percent, 0);
        assert_eq!(view.total, 0);
    }
}
