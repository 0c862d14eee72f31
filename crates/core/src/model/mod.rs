pub mod achievement;
mod catalog;
mod ids;
mod lesson;
mod progress;
mod settings;

pub use achievement::{
    AchievementId, AchievementUpdate, derive_achievements, merge_achievements, restore_achievements,
};
pub use catalog::{CatalogError, LessonCatalog};
pub use ids::{LessonId, ParseIdError, WeekId};
pub use lesson::{Evaluation, EvaluationKind, LessonDescriptor, QuizQuestion};
pub use progress::{HydrationIssue, ProgressDraft, ProgressSnapshot, QuizRecord, QuizRecordDraft};
pub use settings::{
    CourseSettings, CourseSettingsDraft, PASS_THRESHOLD_PERCENT, SettingsError, UnlockPolicy,
};
