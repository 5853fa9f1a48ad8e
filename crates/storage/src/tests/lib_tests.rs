use super::*;
use shared::domain::{ConversionErrorCode, ConversionStatusCode, DEFAULT_PRESENTATION_NAME};

fn record(id: &str, filename: &str, is_current: bool) -> ServerPresentationRecord {
    ServerPresentationRecord {
        id: PresentationId::new(id),
        filename: filename.to_string(),
        is_current,
        conversion: ConversionState {
            done: false,
            error: None,
            pages_completed: 2,
            num_pages: 9,
            status: Some(ConversionStatusCode::GeneratingThumbnail),
        },
    }
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let store = PresentationStore::new("sqlite::memory:").await.expect("db");
    store.health_check().await.expect("health check");
}

#[tokio::test]
async fn upsert_and_list_roundtrip() {
    let store = PresentationStore::new("sqlite::memory:").await.expect("db");
    let meeting = MeetingId::new("meeting-1");

    let default = record("srv-default", DEFAULT_PRESENTATION_NAME, true);
    let slides = record("srv-1", "slides.pdf", false);
    store.upsert_record(&meeting, &default).await.expect("upsert");
    store.upsert_record(&meeting, &slides).await.expect("upsert");

    let listed = store.list_records(&meeting).await.expect("list");
    assert_eq!(listed, vec![default, slides]);
}

#[tokio::test]
async fn upsert_replaces_record_for_same_filename() {
    let store = PresentationStore::new("sqlite::memory:").await.expect("db");
    let meeting = MeetingId::new("meeting-1");

    store
        .upsert_record(&meeting, &record("srv-1", "slides.pdf", false))
        .await
        .expect("first upsert");

    let mut updated = record("srv-1", "slides.pdf", true);
    updated.conversion.done = true;
    updated.conversion.pages_completed = 9;
    updated.conversion.status = None;
    updated.conversion.error = Some(ConversionErrorCode::PageLimitExceeded);
    store.upsert_record(&meeting, &updated).await.expect("second upsert");

    let listed = store.list_records(&meeting).await.expect("list");
    assert_eq!(listed, vec![updated]);
}

#[tokio::test]
async fn snapshot_carries_all_meeting_records() {
    let store = PresentationStore::new("sqlite::memory:").await.expect("db");
    let meeting = MeetingId::new("meeting-1");
    store
        .upsert_record(&meeting, &record("srv-1", "slides.pdf", true))
        .await
        .expect("upsert");

    let snapshot = store.snapshot(&meeting).await.expect("snapshot");
    assert_eq!(snapshot.records.len(), 1);
    assert_eq!(snapshot.records[0].filename, "slides.pdf");
}

#[tokio::test]
async fn clear_by_meeting_leaves_other_meetings_untouched() {
    let store = PresentationStore::new("sqlite::memory:").await.expect("db");
    let meeting_a = MeetingId::new("meeting-a");
    let meeting_b = MeetingId::new("meeting-b");
    store
        .upsert_record(&meeting_a, &record("srv-1", "a.pdf", true))
        .await
        .expect("upsert");
    store
        .upsert_record(&meeting_b, &record("srv-2", "b.pdf", true))
        .await
        .expect("upsert");

    let removed = store
        .clear_presentations(Some(&meeting_a))
        .await
        .expect("clear");

    assert_eq!(removed, 1);
    assert!(store.list_records(&meeting_a).await.expect("list").is_empty());
    assert_eq!(store.list_records(&meeting_b).await.expect("list").len(), 1);
}

#[tokio::test]
async fn clear_without_meeting_removes_everything() {
    let store = PresentationStore::new("sqlite::memory:").await.expect("db");
    let meeting_a = MeetingId::new("meeting-a");
    let meeting_b = MeetingId::new("meeting-b");
    store
        .upsert_record(&meeting_a, &record("srv-1", "a.pdf", true))
        .await
        .expect("upsert");
    store
        .upsert_record(&meeting_b, &record("srv-2", "b.pdf", true))
        .await
        .expect("upsert");

    let removed = store.clear_presentations(None).await.expect("clear");

    assert_eq!(removed, 2);
    assert!(store.list_records(&meeting_a).await.expect("list").is_empty());
    assert!(store.list_records(&meeting_b).await.expect("list").is_empty());
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("presentation_store_test_{suffix}"));
    let db_path = temp_root.join("nested").join("store.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let store = PresentationStore::new(&database_url).await.expect("db");
    drop(store);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    std::fs::remove_dir_all(temp_root).expect("cleanup");
}
