use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::achievement::AchievementId;
use crate::model::ids::LessonId;

//
// ─── QUIZ RECORD ───────────────────────────────────────────────────────────────
//

/// One entry of the append-only quiz log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizRecord {
    pub lesson_id: LessonId,
    pub correct: bool,
    pub score_percent: Option<u8>,
    pub recorded_at: DateTime<Utc>,
}

impl QuizRecord {
    #[must_use]
    pub fn new(
        lesson_id: LessonId,
        correct: bool,
        score_percent: Option<u8>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            lesson_id,
            correct,
            score_percent,
            recorded_at,
        }
    }
}

//
// ─── SNAPSHOT ──────────────────────────────────────────────────────────────────
//

/// Complete progress state of one learner in one course week.
///
/// Only [`Progression`](crate::progression::Progression) mutates a snapshot;
/// everything else reads it through the accessors below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    current_lesson: LessonId,
    completed: BTreeSet<LessonId>,
    started: BTreeSet<LessonId>,
    total_points: u64,
    time_spent_secs: u64,
    quiz_records: Vec<QuizRecord>,
    achievements: BTreeSet<AchievementId>,
    notes: String,
    weekly_evaluation_passed: bool,
}

impl ProgressSnapshot {
    /// Fresh progress positioned on `first_lesson`.
    #[must_use]
    pub fn new(first_lesson: LessonId) -> Self {
        Self {
            current_lesson: first_lesson,
            completed: BTreeSet::new(),
            started: BTreeSet::new(),
            total_points: 0,
            time_spent_secs: 0,
            quiz_records: Vec::new(),
            achievements: BTreeSet::new(),
            notes: String::new(),
            weekly_evaluation_passed: false,
        }
    }

    #[must_use]
    pub fn current_lesson(&self) -> LessonId {
        self.current_lesson
    }

    #[must_use]
    pub fn completed(&self) -> &BTreeSet<LessonId> {
        &self.completed
    }

    #[must_use]
    pub fn is_completed(&self, id: LessonId) -> bool {
        self.completed.contains(&id)
    }

    #[must_use]
    pub fn started(&self) -> &BTreeSet<LessonId> {
        &self.started
    }

    #[must_use]
    pub fn is_started(&self, id: LessonId) -> bool {
        self.started.contains(&id)
    }

    #[must_use]
    pub fn total_points(&self) -> u64 {
        self.total_points
    }

    #[must_use]
    pub fn time_spent_secs(&self) -> u64 {
        self.time_spent_secs
    }

    #[must_use]
    pub fn quiz_records(&self) -> &[QuizRecord] {
        &self.quiz_records
    }

    /// Quiz log entries for a single lesson, oldest first.
    pub fn quiz_records_for(&self, id: LessonId) -> impl Iterator<Item = &QuizRecord> {
        self.quiz_records
            .iter()
            .filter(move |record| record.lesson_id == id)
    }

    #[must_use]
    pub fn achievements(&self) -> &BTreeSet<AchievementId> {
        &self.achievements
    }

    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }

    #[must_use]
    pub fn weekly_evaluation_passed(&self) -> bool {
        self.weekly_evaluation_passed
    }

    pub(crate) fn set_current_lesson(&mut self, id: LessonId) {
        self.current_lesson = id;
    }

    pub(crate) fn insert_completed(&mut self, id: LessonId) -> bool {
        self.completed.insert(id)
    }

    pub(crate) fn mark_started(&mut self, id: LessonId) -> bool {
        self.started.insert(id)
    }

    pub(crate) fn add_points(&mut self, amount: u64) {
        self.total_points = self.total_points.saturating_add(amount);
    }

    pub(crate) fn add_second(&mut self) -> u64 {
        self.time_spent_secs = self.time_spent_secs.saturating_add(1);
        self.time_spent_secs
    }

    pub(crate) fn push_quiz_record(&mut self, record: QuizRecord) {
        self.quiz_records.push(record);
    }

    pub(crate) fn set_achievements(&mut self, achievements: BTreeSet<AchievementId>) {
        self.achievements = achievements;
    }

    pub(crate) fn set_notes(&mut self, notes: String) {
        self.notes = notes;
    }

    pub(crate) fn set_weekly_evaluation_passed(&mut self) {
        self.weekly_evaluation_passed = true;
    }

    /// Assemble a snapshot from already-sanitized parts.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        current_lesson: LessonId,
        completed: BTreeSet<LessonId>,
        started: BTreeSet<LessonId>,
        total_points: u64,
        time_spent_secs: u64,
        quiz_records: Vec<QuizRecord>,
        notes: String,
        weekly_evaluation_passed: bool,
    ) -> Self {
        Self {
            current_lesson,
            completed,
            started,
            total_points,
            time_spent_secs,
            quiz_records,
            achievements: BTreeSet::new(),
            notes,
            weekly_evaluation_passed,
        }
    }
}

//
// ─── PERSISTED DRAFT ───────────────────────────────────────────────────────────
//

/// A quiz log entry exactly as read from storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuizRecordDraft {
    pub lesson_id: i64,
    pub correct: Option<bool>,
    pub score_percent: Option<f64>,
    pub recorded_at: Option<DateTime<Utc>>,
}

/// Progress values exactly as read from storage, before any validation.
///
/// Signed and optional fields let hydration see (and repair) values a
/// well-formed snapshot could never hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressDraft {
    pub current_lesson: Option<i64>,
    pub completed: Vec<i64>,
    pub started: Vec<i64>,
    pub total_points: Option<i64>,
    pub time_spent_secs: Option<i64>,
    pub quiz_records: Vec<QuizRecordDraft>,
    pub achievements: Vec<String>,
    pub notes: Option<String>,
    pub weekly_evaluation_passed: bool,
}

/// A correction applied while hydrating a persisted draft.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HydrationIssue {
    #[error("stored progress could not be read: {0}")]
    Unreadable(String),

    #[error("{field} was negative and has been reset to 0")]
    NegativeValue { field: &'static str },

    #[error("lesson id {raw} is not a valid lesson and was dropped")]
    InvalidLessonId { raw: i64 },

    #[error("lesson {0} is completed but its predecessor is not; dropped")]
    OutOfSequence(LessonId),

    #[error("current lesson {0} is not accessible; moved to the first lesson")]
    InaccessibleCurrentLesson(LessonId),

    #[error("lesson {0} is marked started but was never reachable; dropped")]
    UnreachableStart(LessonId),

    #[error("unknown achievement {0:?} was dropped")]
    UnknownAchievement(String),

    #[error("achievement {0} is not backed by the stored progress; dropped")]
    UnearnedAchievement(AchievementId),

    #[error("stored field {field} had an unexpected value and was ignored")]
    MalformedField { field: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn new_snapshot_is_empty() {
        let snapshot = ProgressSnapshot::new(LessonId::new(1));
        assert_eq!(snapshot.current_lesson(), LessonId::new(1));
        assert!(snapshot.completed().is_empty());
        assert_eq!(snapshot.total_points(), 0);
        assert!(snapshot.notes().is_empty());
        assert!(!snapshot.weekly_evaluation_passed());
    }

    #[test]
    fn points_saturate() {
        let mut snapshot = ProgressSnapshot::new(LessonId::new(1));
        snapshot.add_points(u64::MAX);
        snapshot.add_points(10);
        assert_eq!(snapshot.total_points(), u64::MAX);
    }

    #[test]
    fn quiz_records_filter_by_lesson() {
        let mut snapshot = ProgressSnapshot::new(LessonId::new(1));
        snapshot.push_quiz_record(QuizRecord::new(LessonId::new(1), false, None, fixed_now()));
        snapshot.push_quiz_record(QuizRecord::new(LessonId::new(2), true, Some(80), fixed_now()));
        snapshot.push_quiz_record(QuizRecord::new(LessonId::new(1), true, None, fixed_now()));

        let first: Vec<_> = snapshot.quiz_records_for(LessonId::new(1)).collect();
        assert_eq!(first.len(), 2);
        assert!(first[1].correct);
    }
}
