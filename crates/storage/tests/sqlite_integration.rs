use learn_core::model::{CourseId, CourseInteraction, CourseProgress, InteractionKind};
use learn_core::time::fixed_now;
use storage::repository::{KeyLayout, KeyValueStore, Revision, Storage, StorageError, WriteMode};
use storage::sqlite::SqliteRepository;

fn course(id: &str) -> CourseId {
    CourseId::new(id).unwrap()
}

#[tokio::test]
async fn sqlite_kv_tracks_revisions_and_conflicts() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv_revisions?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    // Migrations are idempotent.
    repo.migrate().await.expect("migrate twice");

    assert!(repo.get("missing").await.unwrap().is_none());

    let first = repo.put("k", "one").await.unwrap();
    assert_eq!(first, Revision::new(1));
    let second = repo.put("k", "two").await.unwrap();
    assert_eq!(second, Revision::new(2));

    let stale = repo.compare_and_swap("k", Some(first), "three").await;
    assert!(matches!(stale, Err(StorageError::Conflict)));
    let third = repo.compare_and_swap("k", Some(second), "three").await.unwrap();
    assert_eq!(third, Revision::new(3));

    let created = repo.compare_and_swap("fresh", None, "x").await.unwrap();
    assert_eq!(created, Revision::new(1));
    assert!(matches!(
        repo.compare_and_swap("fresh", None, "y").await,
        Err(StorageError::Conflict)
    ));

    let stored = repo.get("k").await.unwrap().unwrap();
    assert_eq!(stored.value, "three");
    assert_eq!(stored.revision, third);

    repo.delete("fresh").await.unwrap();
    assert!(repo.get("fresh").await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_prefix_listing_is_literal() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv_prefix?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    for key in ["a_1/x", "a_1/y", "a%1/z", "b/x"] {
        repo.put(key, "{}").await.unwrap();
    }
    let keys = repo.keys_with_prefix("a_1/").await.unwrap();
    assert_eq!(keys, vec!["a_1/x".to_string(), "a_1/y".to_string()]);
}

#[tokio::test]
async fn sqlite_storage_round_trips_progress_in_both_layouts() {
    for (layout, url) in [
        (
            KeyLayout::PerCourse,
            "sqlite:file:memdb_progress_per_course?mode=memory&cache=shared",
        ),
        (
            KeyLayout::SharedBlob,
            "sqlite:file:memdb_progress_blob?mode=memory&cache=shared",
        ),
    ] {
        let storage = Storage::sqlite(url, layout).await.expect("storage");

        let mut progress = CourseProgress::new();
        progress.mark_lesson_complete(0);
        progress.mark_lesson_complete(1);
        progress.set_current_lesson(2);
        progress.touch(fixed_now());

        storage
            .progress
            .save_progress(&course("rust-101"), &progress, WriteMode::Overwrite)
            .await
            .unwrap();
        let loaded = storage
            .progress
            .load_progress(&course("rust-101"))
            .await
            .unwrap()
            .value
            .expect("saved progress");
        assert_eq!(loaded, progress, "{layout:?}");

        let mut log = CourseInteraction::new();
        log.record(InteractionKind::View, fixed_now());
        storage
            .interactions
            .save_interactions(&course("rust-101"), &log, WriteMode::IfRevision(None))
            .await
            .unwrap();
        let all = storage.interactions.list_interactions().await.unwrap();
        assert_eq!(all.get(&course("rust-101")), Some(&log), "{layout:?}");
    }
}
