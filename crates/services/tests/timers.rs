use std::sync::Arc;
use std::time::Duration;

use course_core::model::{AchievementId, WeekId};
use course_core::time::fixed_clock;
use services::{CourseServices, NotesDebouncer, NullGateway, RecordingGateway};
use storage::content::JsonContentProvider;
use storage::document::ProgressDocument;
use storage::repository::{ProgressRepository, Storage, StorageKey};

const WEEK: &str = r#"{
    "title": "Week 2",
    "lessons": [
        { "id": 1, "title": "Introduction to Scrum", "duration": 18, "points": 55 },
        { "id": 2, "title": "Scrum roles", "duration": 22, "points": 70 }
    ]
}"#;

async fn open(storage: &Storage, gateway: Arc<dyn services::RenderGateway>) -> CourseServices {
    CourseServices::from_storage(
        storage,
        fixed_clock(),
        WeekId::new(2),
        &JsonContentProvider::new(WEEK),
        gateway,
    )
    .await
}

async fn stored_time_spent(storage: &Storage) -> Option<i64> {
    let raw = storage
        .progress
        .load_document(&StorageKey::for_week(WeekId::new(2)))
        .await
        .unwrap()?;
    ProgressDocument::decode(&raw).unwrap().draft.time_spent_secs
}

#[tokio::test(start_paused = true)]
async fn tracker_counts_seconds_and_flushes_every_minute() {
    let storage = Storage::in_memory();
    let services = open(&storage, Arc::new(NullGateway)).await;
    let tracker = services.start_time_tracker();

    tokio::time::sleep(Duration::from_millis(59_500)).await;
    assert_eq!(services.engine().lock().await.snapshot().time_spent_secs(), 59);
    assert_eq!(stored_time_spent(&storage).await, None);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(services.engine().lock().await.snapshot().time_spent_secs(), 60);
    assert_eq!(stored_time_spent(&storage).await, Some(60));

    tracker.stop();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(!tracker.is_running());
    assert_eq!(services.engine().lock().await.snapshot().time_spent_secs(), 60);
}

#[tokio::test(start_paused = true)]
async fn dropping_tracker_stops_ticking() {
    let services = open(&Storage::in_memory(), Arc::new(NullGateway)).await;
    {
        let _tracker = services.start_time_tracker();
        tokio::time::sleep(Duration::from_millis(5_500)).await;
    }
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(services.engine().lock().await.snapshot().time_spent_secs(), 5);
}

#[tokio::test(start_paused = true)]
async fn an_hour_of_study_unlocks_dedicated_student() {
    let gateway = RecordingGateway::new();
    let services = open(&Storage::in_memory(), Arc::new(gateway.clone())).await;
    let _tracker = services.start_time_tracker();

    tokio::time::sleep(Duration::from_millis(3_600_500)).await;
    let engine = services.engine();
    let engine = engine.lock().await;
    assert!(engine
        .snapshot()
        .achievements()
        .contains(&AchievementId::DedicatedStudent));
    assert_eq!(engine.view().time_spent_label, "1h 0m");
    let announced = gateway
        .notifications()
        .into_iter()
        .filter(|(message, _)| message.contains(AchievementId::DedicatedStudent.label()))
        .count();
    assert_eq!(announced, 1);
}

#[tokio::test(start_paused = true)]
async fn notes_are_written_after_a_quiet_second() {
    let services = open(&Storage::in_memory(), Arc::new(NullGateway)).await;
    let notes = services.notes_debouncer();

    notes.edit("Scrum");
    tokio::time::sleep(Duration::from_millis(500)).await;
    notes.edit("Scrum has three roles");
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(services.engine().lock().await.snapshot().notes(), "");
    assert_eq!(notes.pending().as_deref(), Some("Scrum has three roles"));

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(
        services.engine().lock().await.snapshot().notes(),
        "Scrum has three roles"
    );
    assert!(notes.pending().is_none());
}

#[tokio::test(start_paused = true)]
async fn flushing_notes_writes_immediately() {
    let storage = Storage::in_memory();
    let services = open(&storage, Arc::new(NullGateway)).await;
    let notes = services.notes_debouncer();

    notes.edit("sprint review");
    notes.flush().await;
    assert_eq!(
        services.engine().lock().await.snapshot().notes(),
        "sprint review"
    );

    tokio::time::sleep(Duration::from_secs(2)).await;
    let raw = storage
        .progress
        .load_document(&StorageKey::for_week(WeekId::new(2)))
        .await
        .unwrap()
        .expect("notes persisted");
    let draft = ProgressDocument::decode(&raw).unwrap().draft;
    assert_eq!(draft.notes.as_deref(), Some("sprint review"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn busy_engine_never_receives_an_older_note_after_a_flush() {
    let services = open(&Storage::in_memory(), Arc::new(NullGateway)).await;
    let notes = NotesDebouncer::new(services.engine(), Duration::from_millis(20));
    let engine = services.engine();

    let busy = engine.lock().await;
    notes.edit("draft one");
    tokio::time::sleep(Duration::from_millis(100)).await;
    // the quiet period is over but the write is still waiting for the engine
    assert_eq!(notes.pending().as_deref(), Some("draft one"));

    notes.edit("draft two");
    let flushing = tokio::spawn({
        let notes = notes.clone();
        async move { notes.flush().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(busy);
    flushing.await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(engine.lock().await.snapshot().notes(), "draft two");
    assert!(notes.pending().is_none());
}
