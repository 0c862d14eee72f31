//! Pure lesson-progression transitions.
//!
//! [`Progression`] owns a week's catalog and settings and applies operations
//! to a [`ProgressSnapshot`]. Every operation validates first and mutates
//! second, so a returned error always means the snapshot is untouched.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::access::{AccessPolicy, LessonNavItem};
use crate::evaluator::{AnswerSheet, EvaluationError, QuizScore, check_answer, evaluate_with_threshold};
use crate::model::{
    AchievementId, CourseSettings, HydrationIssue, LessonCatalog, LessonId, ProgressDraft,
    ProgressSnapshot, QuizQuestion, QuizRecord, QuizRecordDraft, UnlockPolicy, merge_achievements,
    restore_achievements,
};
use crate::view::ProgressView;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressionError {
    #[error("lesson {0} does not exist")]
    UnknownLesson(LessonId),

    #[error("lesson {0} is locked; complete the previous lesson first")]
    LessonLocked(LessonId),

    #[error("this is the last lesson of the week")]
    EndOfCourse,

    #[error("this is the first lesson of the week")]
    StartOfCourse,

    #[error("lesson {0} requires its evaluation before it can be completed")]
    EvaluationPending(LessonId),

    #[error("lesson {0} has no question-based evaluation")]
    NoEvaluation(LessonId),

    #[error("all lessons must be completed first ({completed}/{total})")]
    LessonsIncomplete { completed: usize, total: usize },

    #[error("the weekly evaluation has already been passed")]
    WeeklyEvaluationAlreadyPassed,

    #[error("points to award must be > 0")]
    InvalidPoints,

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

//
// ─── EVENTS ────────────────────────────────────────────────────────────────────
//

/// Something that happened while applying an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A lesson other than the first was entered for the first time.
    LessonStarted(LessonId),
    LessonCompleted { lesson: LessonId, points: u32 },
    /// `complete_lesson` was called for a lesson that is already done.
    AlreadyCompleted(LessonId),
    NextLessonUnlocked(LessonId),
    /// The last lesson of the week was completed.
    CourseCompleted,
    PointsAwarded { amount: u32 },
    QuizRecorded {
        lesson: LessonId,
        correct: bool,
        score_percent: Option<u8>,
    },
    AchievementUnlocked(AchievementId),
    WeeklyEvaluationPassed { percent: u8, bonus: u32 },
    WeeklyEvaluationFailed { percent: u8 },
    ProgressReset,
}

/// Outcome of a successful operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    pub events: Vec<ProgressEvent>,
    /// The snapshot changed in a way that must be written to storage now.
    pub persist: bool,
}

impl Transition {
    fn changed() -> Self {
        Self {
            events: Vec::new(),
            persist: true,
        }
    }

    fn unchanged(event: ProgressEvent) -> Self {
        Self {
            events: vec![event],
            persist: false,
        }
    }

    fn push(&mut self, event: ProgressEvent) {
        self.events.push(event);
    }

    /// Achievements unlocked by this transition, in rule order.
    pub fn unlocked_achievements(&self) -> impl Iterator<Item = AchievementId> + '_ {
        self.events.iter().filter_map(|event| match event {
            ProgressEvent::AchievementUnlocked(id) => Some(*id),
            _ => None,
        })
    }
}

//
// ─── PROGRESSION ───────────────────────────────────────────────────────────────
//

/// State machine for one course week.
#[derive(Debug, Clone)]
pub struct Progression {
    catalog: LessonCatalog,
    settings: CourseSettings,
    policy: AccessPolicy,
}

impl Progression {
    #[must_use]
    pub fn new(catalog: LessonCatalog, settings: CourseSettings) -> Self {
        let policy = AccessPolicy::new(settings.unlock_policy());
        Self {
            catalog,
            settings,
            policy,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &LessonCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn settings(&self) -> &CourseSettings {
        &self.settings
    }

    #[must_use]
    pub fn can_access(&self, snapshot: &ProgressSnapshot, id: LessonId) -> bool {
        self.policy.can_access(&self.catalog, snapshot, id)
    }

    #[must_use]
    pub fn navigation(&self, snapshot: &ProgressSnapshot) -> Vec<LessonNavItem> {
        self.policy.lesson_statuses(&self.catalog, snapshot)
    }

    #[must_use]
    pub fn view(&self, snapshot: &ProgressSnapshot) -> ProgressView {
        ProgressView::from_snapshot(&self.catalog, snapshot)
    }

    /// Default progress for a learner who has not started the week.
    #[must_use]
    pub fn fresh_snapshot(&self) -> ProgressSnapshot {
        let mut snapshot = ProgressSnapshot::new(self.catalog.first_id());
        snapshot.mark_started(self.catalog.first_id());
        let update = merge_achievements(&BTreeSet::new(), &self.catalog, &snapshot);
        snapshot.set_achievements(update.achievements);
        snapshot
    }

    /// Turn a persisted draft into a valid snapshot.
    ///
    /// Negative counters are clamped to zero, unknown or out-of-sequence
    /// lessons are dropped, and an inaccessible current lesson falls back to
    /// the first lesson. Stored achievements are kept only while the restored
    /// progress still backs them. Each correction is reported. While the catalog is
    /// empty, lesson ids are kept as stored so that progress is not discarded
    /// because content failed to load.
    #[must_use]
    pub fn hydrate(
        &self,
        draft: ProgressDraft,
        now: DateTime<Utc>,
    ) -> (ProgressSnapshot, Vec<HydrationIssue>) {
        let mut issues = Vec::new();

        let total_points = non_negative(draft.total_points, "totalPoints", &mut issues);
        let time_spent_secs = non_negative(draft.time_spent_secs, "timeSpent", &mut issues);
        let completed = self.lesson_ids(draft.completed, &mut issues);
        let started = self.lesson_ids(draft.started, &mut issues);
        let (completed, started) = self.in_sequence(completed, started, &mut issues);
        let quiz_records = draft
            .quiz_records
            .into_iter()
            .filter_map(|record| self.quiz_record(record, now, &mut issues))
            .collect();

        let mut snapshot = ProgressSnapshot::from_parts(
            self.catalog.first_id(),
            completed,
            started,
            total_points,
            time_spent_secs,
            quiz_records,
            draft.notes.unwrap_or_default(),
            draft.weekly_evaluation_passed,
        );

        let current = match draft.current_lesson {
            None => self.catalog.first_id(),
            Some(raw) => match self.lesson_id(raw) {
                Some(id) if self.catalog.is_empty() || self.can_access(&snapshot, id) => id,
                Some(id) => {
                    issues.push(HydrationIssue::InaccessibleCurrentLesson(id));
                    self.catalog.first_id()
                }
                None => {
                    issues.push(HydrationIssue::InvalidLessonId { raw });
                    self.catalog.first_id()
                }
            },
        };
        snapshot.set_current_lesson(current);
        snapshot.mark_started(current);

        let mut stored = BTreeSet::new();
        for name in draft.achievements {
            match name.parse::<AchievementId>() {
                Ok(id) => {
                    stored.insert(id);
                }
                Err(err) => issues.push(HydrationIssue::UnknownAchievement(err.0)),
            }
        }
        let (restored, unearned) = restore_achievements(&stored, &self.catalog, &snapshot);
        issues.extend(unearned.into_iter().map(HydrationIssue::UnearnedAchievement));
        let update = merge_achievements(&restored, &self.catalog, &snapshot);
        snapshot.set_achievements(update.achievements);

        (snapshot, issues)
    }

    /// Move to `id`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownLesson` or `LessonLocked`.
    pub fn switch_to_lesson(
        &self,
        snapshot: &mut ProgressSnapshot,
        id: LessonId,
    ) -> Result<Transition, ProgressionError> {
        self.ensure_accessible(snapshot, id)?;

        let mut transition = Transition::changed();
        snapshot.set_current_lesson(id);
        let first_entry = snapshot.mark_started(id);
        if first_entry && id != self.catalog.first_id() && !snapshot.is_completed(id) {
            transition.push(ProgressEvent::LessonStarted(id));
        }
        self.refresh_achievements(snapshot, &mut transition);
        Ok(transition)
    }

    /// Mark `id` completed and award its points. Completing a lesson twice is
    /// reported with [`ProgressEvent::AlreadyCompleted`] and changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `UnknownLesson`, `LessonLocked`, or `EvaluationPending` when the
    /// week requires a quiz attempt before completion.
    pub fn complete_lesson(
        &self,
        snapshot: &mut ProgressSnapshot,
        id: LessonId,
    ) -> Result<Transition, ProgressionError> {
        let lesson = self
            .catalog
            .get(id)
            .map_err(|_| ProgressionError::UnknownLesson(id))?;
        if snapshot.is_completed(id) {
            return Ok(Transition::unchanged(ProgressEvent::AlreadyCompleted(id)));
        }
        if !self.can_access(snapshot, id) {
            return Err(ProgressionError::LessonLocked(id));
        }
        if self.settings.require_evaluation()
            && lesson.has_question_evaluation()
            && snapshot.quiz_records_for(id).next().is_none()
        {
            return Err(ProgressionError::EvaluationPending(id));
        }

        let points = lesson.points();
        let mut transition = Transition::changed();
        snapshot.insert_completed(id);
        snapshot.add_points(u64::from(points));
        transition.push(ProgressEvent::LessonCompleted { lesson: id, points });
        self.refresh_achievements(snapshot, &mut transition);

        match id.next().filter(|_| !self.catalog.is_last(id)) {
            Some(next) => transition.push(ProgressEvent::NextLessonUnlocked(next)),
            None => transition.push(ProgressEvent::CourseCompleted),
        }
        Ok(transition)
    }

    /// Append an entry to the quiz log. Never completes the lesson.
    ///
    /// # Errors
    ///
    /// Returns `UnknownLesson` if `lesson` is not in the catalog.
    pub fn record_quiz_answer(
        &self,
        snapshot: &mut ProgressSnapshot,
        lesson: LessonId,
        correct: bool,
        score_percent: Option<u8>,
        now: DateTime<Utc>,
    ) -> Result<Transition, ProgressionError> {
        if !self.catalog.contains(lesson) {
            return Err(ProgressionError::UnknownLesson(lesson));
        }
        let score_percent = score_percent.map(|score| score.min(100));

        let mut transition = Transition::changed();
        snapshot.push_quiz_record(QuizRecord::new(lesson, correct, score_percent, now));
        transition.push(ProgressEvent::QuizRecorded {
            lesson,
            correct,
            score_percent,
        });
        self.refresh_achievements(snapshot, &mut transition);
        Ok(transition)
    }

    /// Answer one inline question of `lesson`'s evaluation with immediate
    /// feedback. The first correct answer per lesson earns the inline bonus.
    ///
    /// # Errors
    ///
    /// Returns `UnknownLesson`, `NoEvaluation`, or an evaluation error when the
    /// question or option does not exist.
    pub fn answer_inline_question(
        &self,
        snapshot: &mut ProgressSnapshot,
        lesson: LessonId,
        question_index: usize,
        selected: usize,
        now: DateTime<Utc>,
    ) -> Result<(Transition, bool), ProgressionError> {
        let questions = self.questions_for(lesson)?;
        let correct = check_answer(questions, question_index, selected)?;
        let first_success = correct && !snapshot.quiz_records_for(lesson).any(|r| r.correct);

        let mut transition = self.record_quiz_answer(snapshot, lesson, correct, None, now)?;
        let bonus = self.settings.inline_quiz_bonus();
        if first_success && bonus > 0 {
            snapshot.add_points(u64::from(bonus));
            transition.push(ProgressEvent::PointsAwarded { amount: bonus });
        }
        Ok((transition, correct))
    }

    /// Score the lesson's own multi-question evaluation and log the result.
    ///
    /// # Errors
    ///
    /// Returns `UnknownLesson` or `NoEvaluation`.
    pub fn submit_lesson_quiz(
        &self,
        snapshot: &mut ProgressSnapshot,
        lesson: LessonId,
        answers: &BTreeMap<usize, usize>,
        now: DateTime<Utc>,
    ) -> Result<(Transition, QuizScore), ProgressionError> {
        let questions = self.questions_for(lesson)?;
        let score =
            evaluate_with_threshold(questions, answers, self.settings.pass_threshold_percent())?;
        let transition =
            self.record_quiz_answer(snapshot, lesson, score.passed, Some(score.percent), now)?;
        Ok((transition, score))
    }

    /// Open a timed answer sheet for the end-of-week evaluation.
    ///
    /// # Errors
    ///
    /// Returns `LessonsIncomplete` until every lesson is completed,
    /// `WeeklyEvaluationAlreadyPassed` once passed, and `EmptyQuiz` for an
    /// empty question list.
    pub fn start_weekly_evaluation(
        &self,
        snapshot: &ProgressSnapshot,
        questions: Vec<QuizQuestion>,
        now: DateTime<Utc>,
    ) -> Result<AnswerSheet, ProgressionError> {
        self.ensure_all_completed(snapshot)?;
        if snapshot.weekly_evaluation_passed() {
            return Err(ProgressionError::WeeklyEvaluationAlreadyPassed);
        }
        Ok(AnswerSheet::new(
            questions,
            now,
            self.settings.weekly_evaluation_limit(),
        )?)
    }

    /// Score a weekly evaluation sheet. Passing awards the weekly bonus once.
    /// Expired sheets are scored as they stand.
    ///
    /// # Errors
    ///
    /// Same preconditions as [`Progression::start_weekly_evaluation`].
    pub fn submit_weekly_evaluation(
        &self,
        snapshot: &mut ProgressSnapshot,
        sheet: &AnswerSheet,
    ) -> Result<(Transition, QuizScore), ProgressionError> {
        self.ensure_all_completed(snapshot)?;
        if snapshot.weekly_evaluation_passed() {
            return Err(ProgressionError::WeeklyEvaluationAlreadyPassed);
        }
        let score = sheet.score(self.settings.pass_threshold_percent())?;

        if !score.passed {
            return Ok((
                Transition::unchanged(ProgressEvent::WeeklyEvaluationFailed {
                    percent: score.percent,
                }),
                score,
            ));
        }

        let bonus = self.settings.weekly_evaluation_bonus();
        let mut transition = Transition::changed();
        snapshot.set_weekly_evaluation_passed();
        snapshot.add_points(u64::from(bonus));
        transition.push(ProgressEvent::WeeklyEvaluationPassed {
            percent: score.percent,
            bonus,
        });
        self.refresh_achievements(snapshot, &mut transition);
        Ok((transition, score))
    }

    /// Go to the lesson after the current one.
    ///
    /// # Errors
    ///
    /// Returns `EndOfCourse` past the last lesson, `LessonLocked` if the next
    /// lesson is not reachable yet.
    pub fn advance_to_next(
        &self,
        snapshot: &mut ProgressSnapshot,
    ) -> Result<Transition, ProgressionError> {
        let next = snapshot
            .current_lesson()
            .next()
            .filter(|next| self.catalog.contains(*next))
            .ok_or(ProgressionError::EndOfCourse)?;
        if !self.can_access(snapshot, next) {
            return Err(ProgressionError::LessonLocked(next));
        }
        self.switch_to_lesson(snapshot, next)
    }

    /// Go to the lesson before the current one.
    ///
    /// # Errors
    ///
    /// Returns `StartOfCourse` on the first lesson.
    pub fn retreat_to_previous(
        &self,
        snapshot: &mut ProgressSnapshot,
    ) -> Result<Transition, ProgressionError> {
        let current = snapshot.current_lesson();
        if current <= self.catalog.first_id() {
            return Err(ProgressionError::StartOfCourse);
        }
        let previous = current.previous().ok_or(ProgressionError::StartOfCourse)?;
        self.switch_to_lesson(snapshot, previous)
    }

    /// Award points from an ad-hoc exercise. Does not complete anything.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPoints` for zero.
    pub fn award_points(
        &self,
        snapshot: &mut ProgressSnapshot,
        amount: u32,
    ) -> Result<Transition, ProgressionError> {
        if amount == 0 {
            return Err(ProgressionError::InvalidPoints);
        }
        let mut transition = Transition::changed();
        snapshot.add_points(u64::from(amount));
        transition.push(ProgressEvent::PointsAwarded { amount });
        Ok(transition)
    }

    /// Count one second of study time. Asks for a flush on every
    /// `flush_every_ticks`-th second or when a badge unlocks.
    pub fn tick(&self, snapshot: &mut ProgressSnapshot) -> Transition {
        let elapsed = snapshot.add_second();
        let mut transition = Transition::default();
        self.refresh_achievements(snapshot, &mut transition);
        let flush_every = u64::from(self.settings.flush_every_ticks());
        transition.persist = elapsed % flush_every == 0 || !transition.events.is_empty();
        transition
    }

    /// Replace the learner's notes.
    pub fn update_notes(&self, snapshot: &mut ProgressSnapshot, notes: String) -> Transition {
        if snapshot.notes() == notes {
            return Transition::default();
        }
        snapshot.set_notes(notes);
        Transition::changed()
    }

    /// Discard all progress for the week.
    pub fn reset(&self, snapshot: &mut ProgressSnapshot) -> Transition {
        *snapshot = self.fresh_snapshot();
        let mut transition = Transition::changed();
        transition.push(ProgressEvent::ProgressReset);
        transition
    }

    fn ensure_accessible(
        &self,
        snapshot: &ProgressSnapshot,
        id: LessonId,
    ) -> Result<(), ProgressionError> {
        if !self.catalog.contains(id) {
            return Err(ProgressionError::UnknownLesson(id));
        }
        if !self.can_access(snapshot, id) {
            return Err(ProgressionError::LessonLocked(id));
        }
        Ok(())
    }

    fn ensure_all_completed(&self, snapshot: &ProgressSnapshot) -> Result<(), ProgressionError> {
        let total = self.catalog.count();
        let completed = self
            .catalog
            .iter()
            .filter(|lesson| snapshot.is_completed(lesson.id()))
            .count();
        if total == 0 || completed < total {
            return Err(ProgressionError::LessonsIncomplete { completed, total });
        }
        Ok(())
    }

    fn questions_for(&self, lesson: LessonId) -> Result<&[QuizQuestion], ProgressionError> {
        let descriptor = self
            .catalog
            .get(lesson)
            .map_err(|_| ProgressionError::UnknownLesson(lesson))?;
        match descriptor.evaluation() {
            Some(eval) if descriptor.has_question_evaluation() => Ok(eval.questions.as_slice()),
            _ => Err(ProgressionError::NoEvaluation(lesson)),
        }
    }

    fn refresh_achievements(&self, snapshot: &mut ProgressSnapshot, transition: &mut Transition) {
        let update = merge_achievements(snapshot.achievements(), &self.catalog, snapshot);
        for id in update.newly_unlocked {
            transition.push(ProgressEvent::AchievementUnlocked(id));
        }
        snapshot.set_achievements(update.achievements);
    }

    fn lesson_id(&self, raw: i64) -> Option<LessonId> {
        u32::try_from(raw)
            .ok()
            .filter(|value| *value >= 1)
            .map(LessonId::new)
            .filter(|id| self.catalog.is_empty() || self.catalog.contains(*id))
    }

    fn lesson_ids(&self, raw: Vec<i64>, issues: &mut Vec<HydrationIssue>) -> BTreeSet<LessonId> {
        let mut ids = BTreeSet::new();
        for value in raw {
            match self.lesson_id(value) {
                Some(id) => {
                    ids.insert(id);
                }
                None => issues.push(HydrationIssue::InvalidLessonId { raw: value }),
            }
        }
        ids
    }

    // Walk the catalog in order and keep a stored completion (or, when entry
    // unlocks, a stored start) only if its predecessor was kept.
    fn in_sequence(
        &self,
        completed: BTreeSet<LessonId>,
        started: BTreeSet<LessonId>,
        issues: &mut Vec<HydrationIssue>,
    ) -> (BTreeSet<LessonId>, BTreeSet<LessonId>) {
        if self.catalog.is_empty() {
            return (completed, started);
        }
        let on_entry = self.settings.unlock_policy() == UnlockPolicy::OnEntry;
        let mut kept_completed = BTreeSet::new();
        let mut kept_started = BTreeSet::new();
        for lesson in self.catalog.iter() {
            let id = lesson.id();
            let reachable = id == self.catalog.first_id()
                || id.previous().is_some_and(|previous| {
                    kept_completed.contains(&previous)
                        || (on_entry && kept_started.contains(&previous))
                });
            if completed.contains(&id) {
                if reachable {
                    kept_completed.insert(id);
                } else {
                    issues.push(HydrationIssue::OutOfSequence(id));
                }
            }
            if started.contains(&id) {
                if reachable || !on_entry {
                    kept_started.insert(id);
                } else {
                    issues.push(HydrationIssue::UnreachableStart(id));
                }
            }
        }
        (kept_completed, kept_started)
    }

    fn quiz_record(
        &self,
        draft: QuizRecordDraft,
        now: DateTime<Utc>,
        issues: &mut Vec<HydrationIssue>,
    ) -> Option<QuizRecord> {
        let Some(lesson_id) = self.lesson_id(draft.lesson_id) else {
            issues.push(HydrationIssue::InvalidLessonId {
                raw: draft.lesson_id,
            });
            return None;
        };
        let score_percent = draft
            .score_percent
            .filter(|score| score.is_finite())
            .map(|score| score.clamp(0.0, 100.0).round() as u8);
        let threshold = self.settings.pass_threshold_percent();
        let correct = draft
            .correct
            .unwrap_or_else(|| score_percent.is_some_and(|score| score >= threshold));
        Some(QuizRecord::new(
            lesson_id,
            correct,
            score_percent,
            draft.recorded_at.unwrap_or(now),
        ))
    }
}

fn non_negative(value: Option<i64>, field: &'static str, issues: &mut Vec<HydrationIssue>) -> u64 {
    match value {
        None => 0,
        Some(raw) => u64::try_from(raw).unwrap_or_else(|_| {
            issues.push(HydrationIssue::NegativeValue { field });
            0
        }),
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
