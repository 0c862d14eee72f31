use chrono::Duration;
use course_core::model::{
    CourseSettings, LessonCatalog, LessonDescriptor, LessonId, WeekId,
};
use course_core::progression::Progression;
use course_core::time::fixed_now;
use storage::document::ProgressDocument;
use storage::repository::{ProgressRepository, Storage, StorageError, StorageKey};
use storage::sqlite::SqliteRepository;

fn progression() -> Progression {
    let points = [50, 60, 80, 100, 60, 50];
    let catalog = LessonCatalog::new(
        (1_u32..)
            .zip(points)
            .map(|(id, pts)| LessonDescriptor::new(LessonId::new(id), format!("Lesson {id}"), 15, pts))
            .collect(),
    )
    .unwrap();
    Progression::new(catalog, CourseSettings::default())
}

#[tokio::test]
async fn sqlite_roundtrip_restores_progress() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_progress_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let progression = progression();
    let mut snapshot = progression.fresh_snapshot();
    progression.complete_lesson(&mut snapshot, LessonId::new(1)).unwrap();
    progression.complete_lesson(&mut snapshot, LessonId::new(2)).unwrap();
    progression.switch_to_lesson(&mut snapshot, LessonId::new(3)).unwrap();
    progression
        .record_quiz_answer(&mut snapshot, LessonId::new(2), true, Some(90), fixed_now())
        .unwrap();
    for _ in 0..125 {
        progression.tick(&mut snapshot);
    }
    progression.update_notes(&mut snapshot, "Scrum has three roles".into());

    let key = StorageKey::for_week(WeekId::new(1));
    let body = ProgressDocument::from_snapshot(&snapshot, fixed_now())
        .to_json()
        .unwrap();
    repo.save_document(&key, &body).await.unwrap();

    let stored = repo.load_document(&key).await.unwrap().expect("document");
    let draft = ProgressDocument::decode(&stored).unwrap().draft;
    let (restored, issues) = progression.hydrate(draft, fixed_now() + Duration::days(1));

    assert!(issues.is_empty(), "{issues:?}");
    assert_eq!(restored.completed(), snapshot.completed());
    assert_eq!(restored.total_points(), 110);
    assert_eq!(restored.time_spent_secs(), 125);
    assert_eq!(restored.quiz_records().len(), 1);
    assert_eq!(restored.current_lesson(), LessonId::new(3));
    assert_eq!(restored, snapshot);
}

#[tokio::test]
async fn sqlite_save_overwrites_and_clear_removes() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_progress_clear?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo.migrate().await.expect("migrations are idempotent");

    let key = StorageKey::for_week(WeekId::new(2));
    assert!(repo.load_document(&key).await.unwrap().is_none());

    repo.save_document(&key, r#"{"currentLessonId":1}"#).await.unwrap();
    repo.save_document(&key, r#"{"currentLessonId":2}"#).await.unwrap();
    assert_eq!(
        repo.load_document(&key).await.unwrap().as_deref(),
        Some(r#"{"currentLessonId":2}"#)
    );

    repo.clear_document(&key).await.unwrap();
    assert!(repo.load_document(&key).await.unwrap().is_none());
    assert!(matches!(
        repo.clear_document(&key).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sqlite_storage_scopes_weeks() {
    let storage = Storage::sqlite("sqlite:file:memdb_progress_weeks?mode=memory&cache=shared")
        .await
        .expect("storage");

    let week1 = StorageKey::for_week(WeekId::new(1));
    let week2 = StorageKey::for_week(WeekId::new(2));
    storage.progress.save_document(&week1, "{}").await.unwrap();

    assert!(storage.progress.load_document(&week1).await.unwrap().is_some());
    assert!(storage.progress.load_document(&week2).await.unwrap().is_none());
}
