use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::{PASS_THRESHOLD_PERCENT, QuizQuestion};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EvaluationError {
    #[error("quiz has no questions")]
    EmptyQuiz,

    #[error("question {index} does not exist (quiz has {total})")]
    QuestionOutOfRange { index: usize, total: usize },

    #[error("option {option} does not exist for question {index}")]
    OptionOutOfRange { index: usize, option: usize },
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

/// Outcome of scoring a set of answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizScore {
    pub correct: usize,
    pub total: usize,
    pub percent: u8,
    pub passed: bool,
}

/// Score `answers` (question index → selected option) against the key using
/// the standard 70 % pass mark.
///
/// Unanswered questions and answers for unknown questions count as incorrect.
///
/// # Errors
///
/// Returns `EvaluationError::EmptyQuiz` if there are no questions.
pub fn evaluate(
    questions: &[QuizQuestion],
    answers: &BTreeMap<usize, usize>,
) -> Result<QuizScore, EvaluationError> {
    evaluate_with_threshold(questions, answers, PASS_THRESHOLD_PERCENT)
}

/// Like [`evaluate`] with a custom pass mark.
///
/// # Errors
///
/// Returns `EvaluationError::EmptyQuiz` if there are no questions.
pub fn evaluate_with_threshold(
    questions: &[QuizQuestion],
    answers: &BTreeMap<usize, usize>,
    pass_threshold_percent: u8,
) -> Result<QuizScore, EvaluationError> {
    if questions.is_empty() {
        return Err(EvaluationError::EmptyQuiz);
    }

    let correct = questions
        .iter()
        .enumerate()
        .filter(|(index, question)| {
            answers
                .get(index)
                .is_some_and(|selected| question.is_correct(*selected))
        })
        .count();
    let total = questions.len();
    let percent = rounded_percent(correct, total);

    Ok(QuizScore {
        correct,
        total,
        percent,
        passed: percent >= pass_threshold_percent,
    })
}

/// Immediate feedback for question `index` of `questions`. There is no pass mark.
///
/// # Errors
///
/// Returns `QuestionOutOfRange` if `index` is not a question and
/// `OptionOutOfRange` if `selected` is not one of its options.
pub fn check_answer(
    questions: &[QuizQuestion],
    index: usize,
    selected: usize,
) -> Result<bool, EvaluationError> {
    let question = questions.get(index).ok_or(EvaluationError::QuestionOutOfRange {
        index,
        total: questions.len(),
    })?;
    if selected >= question.options.len() {
        return Err(EvaluationError::OptionOutOfRange {
            index,
            option: selected,
        });
    }
    Ok(question.is_correct(selected))
}

// round(100 * correct / total), halves rounded up
fn rounded_percent(correct: usize, total: usize) -> u8 {
    let correct = correct.min(total) as u128;
    let total = total as u128;
    let percent = (200 * correct + total) / (2 * total);
    u8::try_from(percent).unwrap_or(100)
}

//
// ─── ANSWER SHEET ──────────────────────────────────────────────────────────────
//

/// A timed, in-progress attempt at a multi-question evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSheet {
    questions: Vec<QuizQuestion>,
    answers: BTreeMap<usize, usize>,
    started_at: DateTime<Utc>,
    time_limit: Duration,
}

impl AnswerSheet {
    /// Open a sheet for `questions`.
    ///
    /// # Errors
    ///
    /// Returns `EvaluationError::EmptyQuiz` if there are no questions.
    pub fn new(
        questions: Vec<QuizQuestion>,
        started_at: DateTime<Utc>,
        time_limit: Duration,
    ) -> Result<Self, EvaluationError> {
        if questions.is_empty() {
            return Err(EvaluationError::EmptyQuiz);
        }
        Ok(Self {
            questions,
            answers: BTreeMap::new(),
            started_at,
            time_limit,
        })
    }

    /// Record (or change) the answer for one question.
    ///
    /// # Errors
    ///
    /// Returns `EvaluationError` if the question or option does not exist.
    pub fn select(&mut self, index: usize, option: usize) -> Result<(), EvaluationError> {
        let total = self.questions.len();
        let question = self
            .questions
            .get(index)
            .ok_or(EvaluationError::QuestionOutOfRange { index, total })?;
        if option >= question.options.len() {
            return Err(EvaluationError::OptionOutOfRange { index, option });
        }
        self.answers.insert(index, option);
        Ok(())
    }

    #[must_use]
    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<usize, usize> {
        &self.answers
    }

    #[must_use]
    pub fn answer(&self, index: usize) -> Option<usize> {
        self.answers.get(&index).copied()
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Every question has an answer.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.answers.len() == self.questions.len()
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.started_at + self.time_limit
    }

    /// Time left before the sheet expires, never negative.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.deadline() - now).max(Duration::zero())
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline()
    }

    /// Score the answers given so far.
    ///
    /// # Errors
    ///
    /// Never fails for a constructed sheet; the signature mirrors [`evaluate`].
    pub fn score(&self, pass_threshold_percent: u8) -> Result<QuizScore, EvaluationError> {
        evaluate_with_threshold(&self.questions, &self.answers, pass_threshold_percent)
    }
}
