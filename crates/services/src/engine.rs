//! Async orchestration around the pure progression rules.
//!
//! [`ProgressionEngine`] owns the live snapshot of one course week. Each
//! operation applies a [`Progression`] transition, writes the snapshot when the
//! transition asks for it, and tells the [`RenderGateway`] what to show. A
//! failed write is logged and the in-memory change stands.

use std::collections::BTreeMap;
use std::sync::Arc;

use course_core::access::LessonNavItem;
use course_core::evaluator::{AnswerSheet, QuizScore};
use course_core::model::{LessonId, ProgressSnapshot, QuizQuestion};
use course_core::progression::{ProgressEvent, Progression, ProgressionError, Transition};
use course_core::{Clock, ProgressView};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::gateway::{RenderGateway, Severity};
use crate::progress_store::ProgressStore;

/// Engine handle shared between the host, the time tracker and the notes debouncer.
pub type SharedEngine = Arc<Mutex<ProgressionEngine>>;

pub struct ProgressionEngine {
    clock: Clock,
    progression: Progression,
    snapshot: ProgressSnapshot,
    store: ProgressStore,
    gateway: Arc<dyn RenderGateway>,
}

impl ProgressionEngine {
    /// Load stored progress, repair it against the catalog and render the
    /// initial state.
    pub async fn open(
        clock: Clock,
        progression: Progression,
        store: ProgressStore,
        gateway: Arc<dyn RenderGateway>,
    ) -> Self {
        let (draft, mut issues) = store.load().await;
        let (snapshot, corrections) = progression.hydrate(draft, clock.now());
        issues.extend(corrections);
        for issue in &issues {
            warn!(key = %store.key(), %issue, "stored progress corrected");
        }
        info!(
            key = %store.key(),
            current = %snapshot.current_lesson(),
            completed = snapshot.completed().len(),
            points = snapshot.total_points(),
            "progress hydrated"
        );

        let engine = Self {
            clock,
            progression,
            snapshot,
            store,
            gateway,
        };
        engine.refresh();
        engine.gateway.render_achievements(engine.snapshot.achievements());
        engine
    }

    #[must_use]
    pub fn into_shared(self) -> SharedEngine {
        Arc::new(Mutex::new(self))
    }

    #[must_use]
    pub fn snapshot(&self) -> &ProgressSnapshot {
        &self.snapshot
    }

    #[must_use]
    pub fn progression(&self) -> &Progression {
        &self.progression
    }

    #[must_use]
    pub fn can_access(&self, id: LessonId) -> bool {
        self.progression.can_access(&self.snapshot, id)
    }

    #[must_use]
    pub fn view(&self) -> ProgressView {
        self.progression.view(&self.snapshot)
    }

    #[must_use]
    pub fn navigation(&self) -> Vec<LessonNavItem> {
        self.progression.navigation(&self.snapshot)
    }

    /// # Errors
    ///
    /// Returns `EngineError::Progression` when the lesson is unknown or locked.
    pub async fn switch_to_lesson(&mut self, id: LessonId) -> Result<Transition, EngineError> {
        let result = self.progression.switch_to_lesson(&mut self.snapshot, id);
        self.finish(result).await
    }

    /// # Errors
    ///
    /// Returns `EngineError::Progression` when the lesson is unknown, locked or
    /// still waiting for its evaluation.
    pub async fn complete_lesson(&mut self, id: LessonId) -> Result<Transition, EngineError> {
        let result = self.progression.complete_lesson(&mut self.snapshot, id);
        self.finish(result).await
    }

    /// # Errors
    ///
    /// Returns `EngineError::Progression` for an unknown lesson.
    pub async fn record_quiz_answer(
        &mut self,
        lesson: LessonId,
        correct: bool,
        score_percent: Option<u8>,
    ) -> Result<Transition, EngineError> {
        let now = self.clock.now();
        let result = self.progression.record_quiz_answer(
            &mut self.snapshot,
            lesson,
            correct,
            score_percent,
            now,
        );
        self.finish(result).await
    }

    /// Returns whether the answer was correct.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Progression` if the lesson has no such question.
    pub async fn answer_inline_question(
        &mut self,
        lesson: LessonId,
        question_index: usize,
        selected: usize,
    ) -> Result<bool, EngineError> {
        let now = self.clock.now();
        let result = self.progression.answer_inline_question(
            &mut self.snapshot,
            lesson,
            question_index,
            selected,
            now,
        );
        let (_, correct) = self.finish_with(result).await?;
        Ok(correct)
    }

    /// # Errors
    ///
    /// Returns `EngineError::Progression` if the lesson has no quiz.
    pub async fn submit_lesson_quiz(
        &mut self,
        lesson: LessonId,
        answers: &BTreeMap<usize, usize>,
    ) -> Result<QuizScore, EngineError> {
        let now = self.clock.now();
        let result = self
            .progression
            .submit_lesson_quiz(&mut self.snapshot, lesson, answers, now);
        let (_, score) = self.finish_with(result).await?;
        Ok(score)
    }

    /// # Errors
    ///
    /// Returns `EngineError::Progression` until every lesson is completed or
    /// once the evaluation has been passed.
    pub fn start_weekly_evaluation(
        &self,
        questions: Vec<QuizQuestion>,
    ) -> Result<AnswerSheet, EngineError> {
        match self
            .progression
            .start_weekly_evaluation(&self.snapshot, questions, self.clock.now())
        {
            Ok(sheet) => Ok(sheet),
            Err(err) => {
                self.report(&err);
                Err(err.into())
            }
        }
    }

    /// # Errors
    ///
    /// Same preconditions as [`ProgressionEngine::start_weekly_evaluation`].
    pub async fn submit_weekly_evaluation(
        &mut self,
        sheet: &AnswerSheet,
    ) -> Result<QuizScore, EngineError> {
        let result = self
            .progression
            .submit_weekly_evaluation(&mut self.snapshot, sheet);
        let (_, score) = self.finish_with(result).await?;
        Ok(score)
    }

    /// # Errors
    ///
    /// Returns `EngineError::Progression` on the last lesson or when the next
    /// lesson is locked.
    pub async fn advance_to_next(&mut self) -> Result<Transition, EngineError> {
        let result = self.progression.advance_to_next(&mut self.snapshot);
        self.finish(result).await
    }

    /// # Errors
    ///
    /// Returns `EngineError::Progression` on the first lesson.
    pub async fn retreat_to_previous(&mut self) -> Result<Transition, EngineError> {
        let result = self.progression.retreat_to_previous(&mut self.snapshot);
        self.finish(result).await
    }

    /// # Errors
    ///
    /// Returns `EngineError::Progression` for zero points.
    pub async fn award_points(&mut self, amount: u32) -> Result<Transition, EngineError> {
        let result = self.progression.award_points(&mut self.snapshot, amount);
        self.finish(result).await
    }

    /// One second of study time.
    pub async fn tick(&mut self) -> Transition {
        let transition = self.progression.tick(&mut self.snapshot);
        if transition.persist {
            debug!(
                seconds = self.snapshot.time_spent_secs(),
                "flushing study time"
            );
        }
        self.apply(&transition).await;
        transition
    }

    pub async fn update_notes(&mut self, notes: String) -> Transition {
        let transition = self.progression.update_notes(&mut self.snapshot, notes);
        if transition.persist {
            debug!(chars = self.snapshot.notes().chars().count(), "notes updated");
        }
        self.apply(&transition).await;
        transition
    }

    /// Forget everything for this week, in memory and in storage.
    pub async fn reset_progress(&mut self) -> Transition {
        let transition = self.progression.reset(&mut self.snapshot);
        if let Err(err) = self.store.clear().await {
            warn!(key = %self.store.key(), error = %err, "failed to clear stored progress");
        }
        info!(key = %self.store.key(), "progress reset");
        self.apply(&transition).await;
        transition
    }

    /// Write the snapshot now, e.g. before the host shuts down.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Storage` if the write fails.
    pub async fn flush(&self) -> Result<(), EngineError> {
        self.store.save(&self.snapshot).await?;
        Ok(())
    }

    async fn finish(
        &mut self,
        result: Result<Transition, ProgressionError>,
    ) -> Result<Transition, EngineError> {
        match result {
            Ok(transition) => {
                self.apply(&transition).await;
                Ok(transition)
            }
            Err(err) => {
                self.report(&err);
                Err(err.into())
            }
        }
    }

    async fn finish_with<T>(
        &mut self,
        result: Result<(Transition, T), ProgressionError>,
    ) -> Result<(Transition, T), EngineError> {
        match result {
            Ok((transition, value)) => {
                self.apply(&transition).await;
                Ok((transition, value))
            }
            Err(err) => {
                self.report(&err);
                Err(err.into())
            }
        }
    }

    async fn apply(&mut self, transition: &Transition) {
        if transition.persist {
            if let Err(err) = self.store.save(&self.snapshot).await {
                warn!(key = %self.store.key(), error = %err, "failed to persist progress");
            }
        }

        let mut achievements_changed = false;
        for event in &transition.events {
            if let ProgressEvent::AchievementUnlocked(_) = event {
                achievements_changed = true;
            }
            self.log_event(event);
            let (message, severity) = self.notification(event);
            self.gateway.show_notification(&message, severity);
        }

        if transition.persist || !transition.events.is_empty() {
            self.refresh();
        }
        if achievements_changed {
            self.gateway.render_achievements(self.snapshot.achievements());
        }
    }

    fn refresh(&self) {
        self.gateway.refresh_progress_display(&self.view());
        self.gateway.refresh_lesson_navigation(&self.navigation());
    }

    fn report(&self, err: &ProgressionError) {
        debug!(error = %err, "operation rejected");
        let severity = match err {
            ProgressionError::EndOfCourse
            | ProgressionError::StartOfCourse
            | ProgressionError::WeeklyEvaluationAlreadyPassed => Severity::Info,
            ProgressionError::LessonLocked(_)
            | ProgressionError::EvaluationPending(_)
            | ProgressionError::LessonsIncomplete { .. } => Severity::Warning,
            _ => Severity::Error,
        };
        self.gateway.show_notification(&err.to_string(), severity);
    }

    fn log_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::LessonStarted(id) => info!(lesson = %id, "lesson started"),
            ProgressEvent::LessonCompleted { lesson, points } => {
                info!(lesson = %lesson, points, "lesson completed");
            }
            ProgressEvent::CourseCompleted => info!("all lessons completed"),
            ProgressEvent::AchievementUnlocked(id) => info!(achievement = id.key(), "achievement unlocked"),
            ProgressEvent::WeeklyEvaluationPassed { percent, bonus } => {
                info!(percent, bonus, "weekly evaluation passed");
            }
            other => debug!(event = ?other, "progress event"),
        }
    }

    fn notification(&self, event: &ProgressEvent) -> (String, Severity) {
        let catalog = self.progression.catalog();
        match event {
            ProgressEvent::LessonStarted(id) => {
                let title = catalog.get(*id).map(|l| l.title()).unwrap_or_default();
                (format!("Starting lesson {id}: {title}"), Severity::Info)
            }
            ProgressEvent::LessonCompleted { lesson, points } => (
                format!("Lesson {lesson} completed! +{points} points"),
                Severity::Success,
            ),
            ProgressEvent::AlreadyCompleted(_) => (
                "This lesson is already marked as completed".to_owned(),
                Severity::Info,
            ),
            ProgressEvent::NextLessonUnlocked(id) => {
                (format!("Lesson {id} unlocked"), Severity::Info)
            }
            ProgressEvent::CourseCompleted => (
                "Congratulations! You have completed every lesson this week".to_owned(),
                Severity::Success,
            ),
            ProgressEvent::PointsAwarded { amount } => {
                (format!("+{amount} points"), Severity::Success)
            }
            ProgressEvent::QuizRecorded {
                correct,
                score_percent,
                ..
            } => match (score_percent, correct) {
                (Some(score), true) => (format!("Quiz passed with {score}%"), Severity::Success),
                (Some(score), false) => (
                    format!(
                        "Quiz score {score}%; {}% needed to pass",
                        self.progression.settings().pass_threshold_percent()
                    ),
                    Severity::Warning,
                ),
                (None, true) => ("Correct answer!".to_owned(), Severity::Success),
                (None, false) => ("Not quite, try again".to_owned(), Severity::Warning),
            },
            ProgressEvent::AchievementUnlocked(id) => (
                format!("New achievement unlocked: {}", id.label()),
                Severity::Success,
            ),
            ProgressEvent::WeeklyEvaluationPassed { percent, bonus } => (
                format!("Weekly evaluation passed with {percent}%! +{bonus} points"),
                Severity::Success,
            ),
            ProgressEvent::WeeklyEvaluationFailed { percent } => (
                format!("Weekly evaluation not passed ({percent}%). Review the material and try again"),
                Severity::Warning,
            ),
            ProgressEvent::ProgressReset => ("Progress reset".to_owned(), Severity::Info),
        }
    }
}
