use serde::{Deserialize, Serialize};

use crate::model::ids::LessonId;

//
// ─── EVALUATION ────────────────────────────────────────────────────────────────
//

/// The kind of evaluation attached to a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationKind {
    /// Multiple-choice questions checked together.
    Quiz,
    /// Drag items onto their matching targets.
    DragDrop,
    /// Pair items from two columns.
    Matching,
    /// Pick the best response to a described situation.
    Scenario,
    /// End-of-week multiple-choice quiz.
    #[serde(rename = "quiz_final")]
    FinalQuiz,
}

impl EvaluationKind {
    /// Whether this kind is scored from a question list.
    #[must_use]
    pub fn is_question_based(self) -> bool {
        matches!(self, EvaluationKind::Quiz | EvaluationKind::FinalQuiz)
    }
}

/// A single multiple-choice question with its answer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    #[serde(alias = "question", alias = "pregunta")]
    pub prompt: String,
    #[serde(alias = "opciones")]
    pub options: Vec<String>,
    #[serde(alias = "correct_answer", alias = "respuesta_correcta")]
    pub correct_index: usize,
    #[serde(default, alias = "explicacion", skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuizQuestion {
    #[must_use]
    pub fn new(prompt: impl Into<String>, options: Vec<String>, correct_index: usize) -> Self {
        Self {
            prompt: prompt.into(),
            options,
            correct_index,
            explanation: None,
        }
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// True when `selected` is the keyed answer.
    #[must_use]
    pub fn is_correct(&self, selected: usize) -> bool {
        selected == self.correct_index
    }
}

/// Evaluation step of a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(rename = "type", alias = "tipo")]
    pub kind: EvaluationKind,
    #[serde(default, alias = "preguntas")]
    pub questions: Vec<QuizQuestion>,
}

impl Evaluation {
    #[must_use]
    pub fn new(kind: EvaluationKind, questions: Vec<QuizQuestion>) -> Self {
        Self { kind, questions }
    }
}

//
// ─── DESCRIPTOR ────────────────────────────────────────────────────────────────
//

/// Immutable description of one lesson in a week's catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonDescriptor {
    id: LessonId,
    title: String,
    duration_minutes: u32,
    points: u32,
    order: u32,
    evaluation: Option<Evaluation>,
}

impl LessonDescriptor {
    /// Creates a descriptor ordered by its id.
    ///
    /// Field validation happens when the descriptor is added to a
    /// [`LessonCatalog`](crate::model::LessonCatalog).
    #[must_use]
    pub fn new(id: LessonId, title: impl Into<String>, duration_minutes: u32, points: u32) -> Self {
        Self {
            id,
            title: title.into(),
            duration_minutes,
            points,
            order: id.value(),
            evaluation: None,
        }
    }

    #[must_use]
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn with_evaluation(mut self, evaluation: Evaluation) -> Self {
        self.evaluation = Some(evaluation);
        self
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    #[must_use]
    pub fn evaluation(&self) -> Option<&Evaluation> {
        self.evaluation.as_ref()
    }

    /// Whether completing this lesson can be gated on a recorded quiz attempt.
    #[must_use]
    pub fn has_question_evaluation(&self) -> bool {
        self.evaluation
            .as_ref()
            .is_some_and(|eval| eval.kind.is_question_based() && !eval.questions.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_kind_uses_wire_names() {
        let kind: EvaluationKind = serde_json::from_str("\"quiz_final\"").unwrap();
        assert_eq!(kind, EvaluationKind::FinalQuiz);
        let kind: EvaluationKind = serde_json::from_str("\"drag_drop\"").unwrap();
        assert_eq!(kind, EvaluationKind::DragDrop);
        assert!(!kind.is_question_based());
    }

    #[test]
    fn evaluation_accepts_legacy_keys() {
        let json = r#"{
            "tipo": "quiz",
            "preguntas": [
                { "pregunta": "Q", "opciones": ["a", "b"], "respuesta_correcta": 1 }
            ]
        }"#;
        let eval: Evaluation = serde_json::from_str(json).unwrap();
        assert_eq!(eval.kind, EvaluationKind::Quiz);
        assert_eq!(eval.questions[0].correct_index, 1);
        assert!(eval.questions[0].is_correct(1));
    }

    #[test]
    fn descriptor_defaults_order_to_id() {
        let lesson = LessonDescriptor::new(LessonId::new(3), "Events", 25, 85);
        assert_eq!(lesson.order(), 3);
        assert!(!lesson.has_question_evaluation());
    }

    #[test]
    fn drag_drop_evaluation_is_not_question_gated() {
        let lesson = LessonDescriptor::new(LessonId::new(1), "Roles", 20, 60)
            .with_evaluation(Evaluation::new(EvaluationKind::DragDrop, Vec::new()));
        assert!(!lesson.has_question_evaluation());
    }
}
