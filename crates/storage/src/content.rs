use std::path::PathBuf;

use async_trait::async_trait;
use course_core::model::{
    CatalogError, CourseSettings, CourseSettingsDraft, Evaluation, LessonCatalog,
    LessonDescriptor, LessonId, SettingsError,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentLoadError {
    #[error("content could not be read: {0}")]
    Io(String),

    #[error("content is not valid week JSON: {0}")]
    Parse(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Everything a week needs before progress can be tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekContent {
    pub title: String,
    pub catalog: LessonCatalog,
    pub settings: CourseSettings,
}

/// Source of a week's lesson catalog.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Load and validate the week's content.
    ///
    /// # Errors
    ///
    /// Returns `ContentLoadError` if the content cannot be read, parsed or validated.
    async fn load_week(&self) -> Result<WeekContent, ContentLoadError>;
}

/// Content held in memory as a JSON string.
#[derive(Debug, Clone)]
pub struct JsonContentProvider {
    body: String,
}

impl JsonContentProvider {
    #[must_use]
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

#[async_trait]
impl ContentProvider for JsonContentProvider {
    async fn load_week(&self) -> Result<WeekContent, ContentLoadError> {
        parse_week_content(&self.body)
    }
}

/// Content read from a JSON file on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileContentProvider {
    path: PathBuf,
}

impl FileContentProvider {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ContentProvider for FileContentProvider {
    async fn load_week(&self) -> Result<WeekContent, ContentLoadError> {
        let body = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|err| ContentLoadError::Io(format!("{}: {err}", self.path.display())))?;
        debug!(path = %self.path.display(), bytes = body.len(), "read week content");
        parse_week_content(&body)
    }
}

#[derive(Debug, Deserialize)]
struct WeekContentDocument {
    #[serde(default, alias = "titulo")]
    title: String,
    #[serde(alias = "lecciones")]
    lessons: Vec<LessonDocument>,
    #[serde(default, alias = "configuracion")]
    settings: Option<CourseSettingsDraft>,
}

#[derive(Debug, Deserialize)]
struct LessonDocument {
    id: u32,
    #[serde(alias = "titulo")]
    title: String,
    #[serde(alias = "duracion")]
    duration: u32,
    #[serde(alias = "puntos")]
    points: u32,
    #[serde(default, alias = "orden")]
    order: Option<u32>,
    #[serde(default, alias = "evaluacion")]
    evaluation: Option<Evaluation>,
}

impl LessonDocument {
    fn into_descriptor(self) -> LessonDescriptor {
        let mut lesson =
            LessonDescriptor::new(LessonId::new(self.id), self.title, self.duration, self.points);
        if let Some(order) = self.order {
            lesson = lesson.with_order(order);
        }
        if let Some(evaluation) = self.evaluation {
            lesson = lesson.with_evaluation(evaluation);
        }
        lesson
    }
}

/// Parse and validate a week content document.
///
/// # Errors
///
/// Returns `ContentLoadError::Parse` for malformed JSON, `Catalog` or
/// `Settings` when the values fail validation.
pub fn parse_week_content(body: &str) -> Result<WeekContent, ContentLoadError> {
    let document: WeekContentDocument =
        serde_json::from_str(body).map_err(|err| ContentLoadError::Parse(err.to_string()))?;
    let catalog = LessonCatalog::new(
        document
            .lessons
            .into_iter()
            .map(LessonDocument::into_descriptor)
            .collect(),
    )?;
    let settings = match document.settings {
        Some(draft) => draft.validate()?,
        None => CourseSettings::default(),
    };
    Ok(WeekContent {
        title: document.title,
        catalog,
        settings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::{EvaluationKind, UnlockPolicy};

    const WEEK_TWO: &str = r#"{
        "titulo": "Semana 2: Scrum",
        "lecciones": [
            { "id": 1, "titulo": "Introducción a Scrum", "duracion": 18, "puntos": 55,
              "evaluacion": { "tipo": "quiz", "preguntas": [
                { "pregunta": "¿Cuántos roles define Scrum?", "opciones": ["2", "3", "4"], "respuesta_correcta": 1 }
              ] } },
            { "id": 2, "titulo": "Roles en Scrum", "duracion": 22, "puntos": 70 }
        ],
        "settings": { "unlockPolicy": "on_entry", "requireEvaluation": true }
    }"#;

    #[test]
    fn parses_spanish_keys_and_settings() {
        let content = parse_week_content(WEEK_TWO).unwrap();
        assert_eq!(content.title, "Semana 2: Scrum");
        assert_eq!(content.catalog.count(), 2);
        assert_eq!(content.catalog.total_points(), 125);

        let first = content.catalog.get(LessonId::new(1)).unwrap();
        let evaluation = first.evaluation().unwrap();
        assert_eq!(evaluation.kind, EvaluationKind::Quiz);
        assert_eq!(evaluation.questions[0].correct_index, 1);

        assert_eq!(content.settings.unlock_policy(), UnlockPolicy::OnEntry);
        assert!(content.settings.require_evaluation());
        assert_eq!(content.settings.pass_threshold_percent(), 70);
    }

    #[test]
    fn parses_english_keys_without_settings() {
        let body = r#"{
            "title": "Week 1",
            "lessons": [
                { "id": 2, "title": "History", "duration": 20, "points": 60 },
                { "id": 1, "title": "What is Agile?", "duration": 15, "points": 50 }
            ]
        }"#;
        let content = parse_week_content(body).unwrap();
        let ids: Vec<_> = content.catalog.iter().map(|l| l.id().value()).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(content.settings, CourseSettings::default());
    }

    #[test]
    fn rejects_invalid_content() {
        assert!(matches!(
            parse_week_content("not json"),
            Err(ContentLoadError::Parse(_))
        ));
        let gap = r#"{ "lessons": [
            { "id": 1, "title": "A", "duration": 10, "points": 10 },
            { "id": 3, "title": "C", "duration": 10, "points": 10 }
        ] }"#;
        assert!(matches!(
            parse_week_content(gap),
            Err(ContentLoadError::Catalog(_))
        ));
        let threshold = r#"{ "lessons": [], "settings": { "passThresholdPercent": 0 } }"#;
        assert!(matches!(
            parse_week_content(threshold),
            Err(ContentLoadError::Settings(_))
        ));
    }

    #[tokio::test]
    async fn file_provider_reports_missing_file() {
        let provider = FileContentProvider::new("/nonexistent/contenido.json");
        assert!(matches!(
            provider.load_week().await,
            Err(ContentLoadError::Io(_))
        ));
    }

    #[tokio::test]
    async fn json_provider_loads_week() {
        let provider = JsonContentProvider::new(WEEK_TWO);
        let content = provider.load_week().await.unwrap();
        assert_eq!(content.catalog.count(), 2);
    }
}
