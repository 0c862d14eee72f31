//! Wire format of a persisted week-progress document.
//!
//! Field names are camelCase. Older documents used `currentLesson`,
//! `completedLessons`, and per-score `lesson` / `date`; those are still read.
//! Reading is lenient: a field of the wrong type is dropped and reported, the
//! rest of the document is kept. Numbers are read as signed integers so that
//! negative values reach hydration, which clamps them.

use chrono::{DateTime, Utc};
use course_core::model::{
    HydrationIssue, ProgressDraft, ProgressSnapshot, QuizRecord, QuizRecordDraft,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::repository::StorageError;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDocument {
    pub current_lesson_id: Option<i64>,
    pub completed_lesson_ids: Vec<i64>,
    pub started_lesson_ids: Vec<i64>,
    pub user_progress: UserProgressDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgressDocument {
    pub total_points: Option<i64>,
    pub time_spent: Option<i64>,
    pub quiz_scores: Vec<QuizScoreDocument>,
    pub notes: Option<String>,
    pub achievements: Vec<String>,
    pub weekly_evaluation_passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizScoreDocument {
    pub lesson_id: i64,
    pub correct: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// A stored document as hydration input, plus every field that had to be
/// dropped while reading it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedProgress {
    pub draft: ProgressDraft,
    pub issues: Vec<HydrationIssue>,
}

impl ProgressDocument {
    /// Capture `snapshot` for storage, stamped with `saved_at`.
    #[must_use]
    pub fn from_snapshot(snapshot: &ProgressSnapshot, saved_at: DateTime<Utc>) -> Self {
        Self {
            current_lesson_id: Some(i64::from(snapshot.current_lesson().value())),
            completed_lesson_ids: snapshot
                .completed()
                .iter()
                .map(|id| i64::from(id.value()))
                .collect(),
            started_lesson_ids: snapshot
                .started()
                .iter()
                .map(|id| i64::from(id.value()))
                .collect(),
            user_progress: UserProgressDocument {
                total_points: Some(saturating_i64(snapshot.total_points())),
                time_spent: Some(saturating_i64(snapshot.time_spent_secs())),
                quiz_scores: snapshot
                    .quiz_records()
                    .iter()
                    .map(QuizScoreDocument::from_record)
                    .collect(),
                notes: Some(snapshot.notes().to_owned()),
                achievements: snapshot
                    .achievements()
                    .iter()
                    .map(|id| id.key().to_owned())
                    .collect(),
                weekly_evaluation_passed: snapshot.weekly_evaluation_passed(),
            },
            timestamp: Some(saved_at),
        }
    }

    /// Read a stored document into an unvalidated draft.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the text is not a JSON object.
    pub fn decode(raw: &str) -> Result<DecodedProgress, StorageError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|err| StorageError::Serialization(err.to_string()))?;
        let Value::Object(root) = value else {
            return Err(StorageError::Serialization(
                "progress document is not a JSON object".into(),
            ));
        };

        let mut reader = FieldReader::default();
        let current_lesson = reader.integer(
            field(&root, &["currentLessonId", "currentLesson"]),
            "currentLessonId",
        );
        let completed = reader.integers(
            field(&root, &["completedLessonIds", "completedLessons"]),
            "completedLessonIds",
        );
        let started = reader.integers(field(&root, &["startedLessonIds"]), "startedLessonIds");

        let empty = Map::new();
        let progress = reader
            .object(field(&root, &["userProgress"]), "userProgress")
            .unwrap_or(&empty);
        let total_points = reader.integer(field(progress, &["totalPoints"]), "userProgress.totalPoints");
        let time_spent_secs = reader.integer(field(progress, &["timeSpent"]), "userProgress.timeSpent");
        let quiz_records = reader.quiz_scores(field(progress, &["quizScores"]));
        let notes = reader.text(field(progress, &["notes"]), "userProgress.notes");
        let achievements = reader.texts(field(progress, &["achievements"]), "userProgress.achievements");
        let weekly_evaluation_passed = reader
            .boolean(
                field(progress, &["weeklyEvaluationPassed"]),
                "userProgress.weeklyEvaluationPassed",
            )
            .unwrap_or(false);

        Ok(DecodedProgress {
            draft: ProgressDraft {
                current_lesson,
                completed,
                started,
                total_points,
                time_spent_secs,
                quiz_records,
                achievements,
                notes,
                weekly_evaluation_passed,
            },
            issues: reader.issues,
        })
    }

    /// Encode for storage.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String, StorageError> {
        serde_json::to_string(self).map_err(|err| StorageError::Serialization(err.to_string()))
    }
}

impl QuizScoreDocument {
    fn from_record(record: &QuizRecord) -> Self {
        Self {
            lesson_id: i64::from(record.lesson_id.value()),
            correct: Some(record.correct),
            score: record.score_percent.map(f64::from),
            timestamp: Some(record.recorded_at),
        }
    }
}

//
// ─── LENIENT READING ───────────────────────────────────────────────────────────
//

#[derive(Default)]
struct FieldReader {
    issues: Vec<HydrationIssue>,
}

impl FieldReader {
    fn malformed(&mut self, field: impl Into<String>) {
        self.issues.push(HydrationIssue::MalformedField {
            field: field.into(),
        });
    }

    fn integer(&mut self, value: Option<&Value>, name: &str) -> Option<i64> {
        match value? {
            Value::Null => None,
            value => integer(value).or_else(|| {
                self.malformed(name);
                None
            }),
        }
    }

    fn integers(&mut self, value: Option<&Value>, name: &str) -> Vec<i64> {
        match value {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| {
                    integer(item).or_else(|| {
                        self.malformed(format!("{name}[{index}]"));
                        None
                    })
                })
                .collect(),
            Some(_) => {
                self.malformed(name);
                Vec::new()
            }
        }
    }

    fn boolean(&mut self, value: Option<&Value>, name: &str) -> Option<bool> {
        match value? {
            Value::Null => None,
            Value::Bool(flag) => Some(*flag),
            _ => {
                self.malformed(name);
                None
            }
        }
    }

    fn text(&mut self, value: Option<&Value>, name: &str) -> Option<String> {
        match value? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            _ => {
                self.malformed(name);
                None
            }
        }
    }

    fn texts(&mut self, value: Option<&Value>, name: &str) -> Vec<String> {
        match value {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| match item {
                    Value::String(text) => Some(text.clone()),
                    _ => {
                        self.malformed(format!("{name}[{index}]"));
                        None
                    }
                })
                .collect(),
            Some(_) => {
                self.malformed(name);
                Vec::new()
            }
        }
    }

    fn number(&mut self, value: Option<&Value>, name: &str) -> Option<f64> {
        let parsed = match value? {
            Value::Null => return None,
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        };
        parsed.or_else(|| {
            self.malformed(name);
            None
        })
    }

    fn timestamp(&mut self, value: Option<&Value>, name: &str) -> Option<DateTime<Utc>> {
        match value? {
            Value::Null => None,
            Value::String(text) => match DateTime::parse_from_rfc3339(text) {
                Ok(at) => Some(at.with_timezone(&Utc)),
                Err(_) => {
                    self.malformed(name);
                    None
                }
            },
            _ => {
                self.malformed(name);
                None
            }
        }
    }

    fn object<'a>(&mut self, value: Option<&'a Value>, name: &str) -> Option<&'a Map<String, Value>> {
        match value? {
            Value::Null => None,
            Value::Object(object) => Some(object),
            _ => {
                self.malformed(name);
                None
            }
        }
    }

    fn quiz_scores(&mut self, value: Option<&Value>) -> Vec<QuizRecordDraft> {
        const NAME: &str = "userProgress.quizScores";
        let items = match value {
            None | Some(Value::Null) => return Vec::new(),
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.malformed(NAME);
                return Vec::new();
            }
        };

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let entry = format!("{NAME}[{index}]");
            let Some(score) = self.object(Some(item), &entry) else {
                continue;
            };
            let Some(lesson_id) = field(score, &["lessonId", "lesson"]).and_then(integer) else {
                self.malformed(format!("{entry}.lessonId"));
                continue;
            };
            records.push(QuizRecordDraft {
                lesson_id,
                correct: self.boolean(field(score, &["correct"]), &format!("{entry}.correct")),
                score_percent: self.number(field(score, &["score"]), &format!("{entry}.score")),
                recorded_at: self.timestamp(
                    field(score, &["timestamp", "date"]),
                    &format!("{entry}.timestamp"),
                ),
            });
        }
        records
    }
}

fn field<'a>(object: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| object.get(*name))
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_u64().map(|_| i64::MAX))
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|float| float.is_finite())
                    .map(|float| float.round() as i64)
            }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
