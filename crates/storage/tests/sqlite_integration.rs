use storage::repository::{ProgressStore, Storage};
use storage::sqlite::SqliteStore;

#[tokio::test]
async fn sqlite_roundtrips_values_by_key() {
    let store = SqliteStore::connect("sqlite:file:memdb_kv_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    store.migrate().await.expect("migrate");

    assert_eq!(store.read("typescript-tutor-progress").await.unwrap(), None);

    store.write("typescript-tutor-progress", r#"{"completedLessons":[]}"#)
        .await
        .unwrap();
    let stored = store.read("typescript-tutor-progress").await.unwrap();
    assert_eq!(stored.as_deref(), Some(r#"{"completedLessons":[]}"#));
}

#[tokio::test]
async fn sqlite_write_overwrites_unconditionally() {
    let store = SqliteStore::connect("sqlite:file:memdb_kv_overwrite?mode=memory&cache=shared")
        .await
        .expect("connect");
    store.migrate().await.expect("migrate");

    store.write("k", "first").await.unwrap();
    store.write("k", "second").await.unwrap();
    assert_eq!(store.read("k").await.unwrap().as_deref(), Some("second"));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM kv_store")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let store = SqliteStore::connect("sqlite:file:memdb_kv_migrate?mode=memory&cache=shared")
        .await
        .expect("connect");
    store.migrate().await.expect("first migrate");
    store.write("kept", "value").await.unwrap();
    store.migrate().await.expect("second migrate");

    assert_eq!(store.read("kept").await.unwrap().as_deref(), Some("value"));
}

#[tokio::test]
async fn storage_sqlite_exposes_progress_store() {
    let storage = Storage::sqlite("sqlite:file:memdb_kv_storage?mode=memory&cache=shared")
        .await
        .expect("storage");
    storage.progress.write("a", "1").await.unwrap();
    assert_eq!(storage.progress.read("a").await.unwrap().as_deref(), Some("1"));
}

#[tokio::test]
async fn connect_creates_missing_database_file() {
    let path = std::env::temp_dir().join(format!("tutor-kv-{}.sqlite3", std::process::id()));
    let _ = std::fs::remove_file(&path);

    let url = format!("sqlite://{}", path.display());
    let storage = Storage::sqlite(&url).await.expect("storage");
    storage.progress.write("persisted", "yes").await.unwrap();
    drop(storage);
    assert!(path.exists());

    let reopened = Storage::sqlite(&url).await.expect("reopen");
    assert_eq!(
        reopened.progress.read("persisted").await.unwrap().as_deref(),
        Some("yes")
    );
    drop(reopened);
    let _ = std::fs::remove_file(&path);
}
