use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::catalog::LessonCatalog;
use crate::model::progress::ProgressSnapshot;

/// Completed lessons needed for [`AchievementId::Explorer`].
pub const EXPLORER_LESSONS: usize = 3;

/// Seconds of study needed for [`AchievementId::DedicatedStudent`].
pub const DEDICATED_STUDENT_SECS: u64 = 3_600;

/// Badges a learner can earn during a week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AchievementId {
    FirstStep,
    Explorer,
    WeekMaster,
    PerfectQuiz,
    DedicatedStudent,
}

impl AchievementId {
    pub const ALL: [AchievementId; 5] = [
        AchievementId::FirstStep,
        AchievementId::Explorer,
        AchievementId::WeekMaster,
        AchievementId::PerfectQuiz,
        AchievementId::DedicatedStudent,
    ];

    /// Stable key used in persisted documents.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            AchievementId::FirstStep => "first-step",
            AchievementId::Explorer => "explorer",
            AchievementId::WeekMaster => "week-master",
            AchievementId::PerfectQuiz => "perfect-quiz",
            AchievementId::DedicatedStudent => "dedicated-student",
        }
    }

    /// Human-readable badge name.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            AchievementId::FirstStep => "First Step",
            AchievementId::Explorer => "Explorer",
            AchievementId::WeekMaster => "Week Master",
            AchievementId::PerfectQuiz => "Perfect Quiz",
            AchievementId::DedicatedStudent => "Dedicated Student",
        }
    }

    /// Name older week pages stored in place of [`AchievementId::key`].
    #[must_use]
    pub fn legacy_label(self) -> &'static str {
        match self {
            AchievementId::FirstStep => "Primer Paso",
            AchievementId::Explorer => "Explorador Ágil",
            AchievementId::WeekMaster => "Maestro de la Semana",
            AchievementId::PerfectQuiz => "Quiz Perfecto",
            AchievementId::DedicatedStudent => "Estudiante Dedicado",
        }
    }

    /// Evaluate this badge's rule against the current state.
    #[must_use]
    pub fn is_earned(self, catalog: &LessonCatalog, snapshot: &ProgressSnapshot) -> bool {
        match self {
            AchievementId::FirstStep => true,
            AchievementId::Explorer => snapshot.completed().len() >= EXPLORER_LESSONS,
            AchievementId::WeekMaster => {
                !catalog.is_empty() && snapshot.completed().len() >= catalog.count()
            }
            AchievementId::PerfectQuiz => snapshot
                .quiz_records_for(snapshot.current_lesson())
                .any(|record| record.correct),
            AchievementId::DedicatedStudent => {
                snapshot.time_spent_secs() >= DEDICATED_STUDENT_SECS
            }
        }
    }

    /// Whether a stored copy of this badge is still backed by `snapshot`.
    ///
    /// Same as [`AchievementId::is_earned`], except that `PerfectQuiz` only
    /// needs a correct answer in any lesson.
    #[must_use]
    pub fn is_supported(self, catalog: &LessonCatalog, snapshot: &ProgressSnapshot) -> bool {
        match self {
            AchievementId::PerfectQuiz => snapshot.quiz_records().iter().any(|r| r.correct),
            other => other.is_earned(catalog, snapshot),
        }
    }
}

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a stored achievement key is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAchievement(pub String);

impl fmt::Display for UnknownAchievement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown achievement: {}", self.0)
    }
}

impl std::error::Error for UnknownAchievement {}

impl FromStr for AchievementId {
    type Err = UnknownAchievement;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        AchievementId::ALL
            .into_iter()
            .find(|id| id.key() == needle || id.label() == needle || id.legacy_label() == needle)
            .ok_or_else(|| UnknownAchievement(needle.to_string()))
    }
}

/// Badges whose rules currently hold.
#[must_use]
pub fn derive_achievements(
    catalog: &LessonCatalog,
    snapshot: &ProgressSnapshot,
) -> BTreeSet<AchievementId> {
    AchievementId::ALL
        .into_iter()
        .filter(|id| id.is_earned(catalog, snapshot))
        .collect()
}

/// Badges read from storage, split into those the snapshot still supports
/// and those it does not.
#[must_use]
pub fn restore_achievements(
    stored: &BTreeSet<AchievementId>,
    catalog: &LessonCatalog,
    snapshot: &ProgressSnapshot,
) -> (BTreeSet<AchievementId>, Vec<AchievementId>) {
    let (kept, dropped): (BTreeSet<_>, BTreeSet<_>) = stored
        .iter()
        .copied()
        .partition(|id| id.is_supported(catalog, snapshot));
    (kept, dropped.into_iter().collect())
}

/// Result of folding freshly derived badges into an already-earned set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementUpdate {
    pub achievements: BTreeSet<AchievementId>,
    pub newly_unlocked: Vec<AchievementId>,
}

/// Merge the currently earned badges into `previous`.
///
/// Earned badges are kept even if their rule later stops holding, so each one
/// is reported in `newly_unlocked` at most once.
#[must_use]
pub fn merge_achievements(
    previous: &BTreeSet<AchievementId>,
    catalog: &LessonCatalog,
    snapshot: &ProgressSnapshot,
) -> AchievementUpdate {
    let derived = derive_achievements(catalog, snapshot);
    let newly_unlocked: Vec<_> = derived.difference(previous).copied().collect();
    let achievements = previous.union(&derived).copied().collect();
    AchievementUpdate {
        achievements,
        newly_unlocked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LessonDescriptor, LessonId, QuizRecord};
    use crate::time::fixed_now;

    fn catalog(count: u32) -> LessonCatalog {
        LessonCatalog::new(
            (1..=count)
                .map(|id| LessonDescriptor::new(LessonId::new(id), format!("L{id}"), 10, 50))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn fresh_snapshot_only_earns_first_step() {
        let catalog = catalog(6);
        let snapshot = ProgressSnapshot::new(LessonId::new(1));
        let derived = derive_achievements(&catalog, &snapshot);
        assert_eq!(derived.into_iter().collect::<Vec<_>>(), vec![AchievementId::FirstStep]);
    }

    #[test]
    fn explorer_needs_three_lessons() {
        let catalog = catalog(6);
        let mut snapshot = ProgressSnapshot::new(LessonId::new(1));
        snapshot.insert_completed(LessonId::new(1));
        snapshot.insert_completed(LessonId::new(2));
        assert!(!AchievementId::Explorer.is_earned(&catalog, &snapshot));
        snapshot.insert_completed(LessonId::new(3));
        assert!(AchievementId::Explorer.is_earned(&catalog, &snapshot));
    }

    #[test]
    fn week_master_is_never_earned_on_empty_catalog() {
        let snapshot = ProgressSnapshot::new(LessonId::new(1));
        assert!(!AchievementId::WeekMaster.is_earned(&LessonCatalog::empty(), &snapshot));
    }

    #[test]
    fn perfect_quiz_tracks_current_lesson() {
        let catalog = catalog(6);
        let mut snapshot = ProgressSnapshot::new(LessonId::new(1));
        snapshot.push_quiz_record(QuizRecord::new(LessonId::new(1), true, None, fixed_now()));
        assert!(AchievementId::PerfectQuiz.is_earned(&catalog, &snapshot));
        snapshot.set_current_lesson(LessonId::new(2));
        assert!(!AchievementId::PerfectQuiz.is_earned(&catalog, &snapshot));
    }

    #[test]
    fn merge_keeps_earned_badges_and_reports_once() {
        let catalog = catalog(6);
        let mut snapshot = ProgressSnapshot::new(LessonId::new(1));
        snapshot.push_quiz_record(QuizRecord::new(LessonId::new(1), true, None, fixed_now()));

        let first = merge_achievements(&BTreeSet::new(), &catalog, &snapshot);
        assert!(first.newly_unlocked.contains(&AchievementId::PerfectQuiz));

        snapshot.set_current_lesson(LessonId::new(2));
        let second = merge_achievements(&first.achievements, &catalog, &snapshot);
        assert!(second.newly_unlocked.is_empty());
        assert!(second.achievements.contains(&AchievementId::PerfectQuiz));
    }

    #[test]
    fn parses_keys_and_labels() {
        assert_eq!("week-master".parse::<AchievementId>().unwrap(), AchievementId::WeekMaster);
        assert_eq!("Dedicated Student".parse::<AchievementId>().unwrap(), AchievementId::DedicatedStudent);
        assert!("Top Student".parse::<AchievementId>().is_err());
    }

    #[test]
    fn parses_legacy_spanish_labels() {
        let parsed: Vec<AchievementId> = [
            "Primer Paso",
            "Explorador Ágil",
            "Maestro de la Semana",
            "Quiz Perfecto",
            "Estudiante Dedicado",
        ]
        .into_iter()
        .map(|label| label.parse().unwrap())
        .collect();
        assert_eq!(parsed, AchievementId::ALL.to_vec());
    }

    #[test]
    fn restore_drops_badges_without_backing_progress() {
        let catalog = catalog(6);
        let snapshot = ProgressSnapshot::new(LessonId::new(1));
        let stored = BTreeSet::from([
            AchievementId::FirstStep,
            AchievementId::WeekMaster,
            AchievementId::DedicatedStudent,
        ]);
        let (kept, dropped) = restore_achievements(&stored, &catalog, &snapshot);
        assert_eq!(kept, BTreeSet::from([AchievementId::FirstStep]));
        assert_eq!(dropped, vec![AchievementId::WeekMaster, AchievementId::DedicatedStudent]);
    }

    #[test]
    fn restored_perfect_quiz_needs_any_correct_answer() {
        let catalog = catalog(6);
        let stored = BTreeSet::from([AchievementId::PerfectQuiz]);
        let mut snapshot = ProgressSnapshot::new(LessonId::new(2));
        let (kept, _) = restore_achievements(&stored, &catalog, &snapshot);
        assert!(kept.is_empty());

        snapshot.push_quiz_record(QuizRecord::new(LessonId::new(1), true, None, fixed_now()));
        let (kept, dropped) = restore_achievements(&stored, &catalog, &snapshot);
        assert_eq!(kept, stored);
        assert!(dropped.is_empty());
    }
}
