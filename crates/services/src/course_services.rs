use std::sync::Arc;

use course_core::Clock;
use course_core::model::{CourseSettings, LessonCatalog, WeekId};
use course_core::progression::Progression;
use storage::content::{ContentProvider, WeekContent};
use storage::repository::{Storage, StorageKey};
use tracing::{info, warn};

use crate::engine::{ProgressionEngine, SharedEngine};
use crate::error::CourseServicesError;
use crate::gateway::RenderGateway;
use crate::notes::NotesDebouncer;
use crate::progress_store::ProgressStore;
use crate::time_tracker::TimeTracker;

/// Assembles everything one course week needs.
#[derive(Clone)]
pub struct CourseServices {
    week: WeekId,
    title: String,
    settings: CourseSettings,
    engine: SharedEngine,
}

impl CourseServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `CourseServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        week: WeekId,
        content: &dyn ContentProvider,
        gateway: Arc<dyn RenderGateway>,
    ) -> Result<Self, CourseServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, week, content, gateway).await)
    }

    /// Build services that keep progress in memory only.
    pub async fn in_memory(
        clock: Clock,
        week: WeekId,
        content: &dyn ContentProvider,
        gateway: Arc<dyn RenderGateway>,
    ) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, week, content, gateway).await
    }

    /// Load the week's content and stored progress from `storage`.
    ///
    /// Content that fails to load leaves the week with an empty catalog: the
    /// engine still starts, and every lesson operation is rejected.
    pub async fn from_storage(
        storage: &Storage,
        clock: Clock,
        week: WeekId,
        content: &dyn ContentProvider,
        gateway: Arc<dyn RenderGateway>,
    ) -> Self {
        let WeekContent {
            title,
            catalog,
            settings,
        } = match content.load_week().await {
            Ok(content) => content,
            Err(err) => {
                warn!(%week, error = %err, "week content unavailable; lessons disabled");
                WeekContent {
                    title: String::new(),
                    catalog: LessonCatalog::empty(),
                    settings: CourseSettings::default(),
                }
            }
        };
        info!(%week, lessons = catalog.count(), "week content loaded");

        let store = ProgressStore::new(
            clock,
            StorageKey::for_week(week),
            Arc::clone(&storage.progress),
        );
        let progression = Progression::new(catalog, settings.clone());
        let engine = ProgressionEngine::open(clock, progression, store, gateway)
            .await
            .into_shared();

        Self {
            week,
            title,
            settings,
            engine,
        }
    }

    #[must_use]
    pub fn week(&self) -> WeekId {
        self.week
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn settings(&self) -> &CourseSettings {
        &self.settings
    }

    #[must_use]
    pub fn engine(&self) -> SharedEngine {
        Arc::clone(&self.engine)
    }

    /// Start counting study time at the week's tick interval.
    #[must_use]
    pub fn start_time_tracker(&self) -> TimeTracker {
        TimeTracker::start(self.engine(), self.settings.tick_interval())
    }

    #[must_use]
    pub fn notes_debouncer(&self) -> NotesDebouncer {
        NotesDebouncer::new(self.engine(), self.settings.notes_debounce())
    }
}
