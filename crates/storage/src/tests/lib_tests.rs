use super::*;

#[tokio::test]
async fn empty_database_has_no_session_token() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let token = storage.load_session_token().await.expect("load");
    assert_eq!(token, None);
}

#[tokio::test]
async fn saves_and_reloads_session_token() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.save_session_token("tok-1").await.expect("save");
    let token = storage.load_session_token().await.expect("load");
    assert_eq!(token.as_deref(), Some("tok-1"));
}

#[tokio::test]
async fn save_overwrites_the_single_slot() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.save_session_token("tok-1").await.expect("save");
    storage.save_session_token("tok-2").await.expect("save");
    let token = storage.load_session_token().await.expect("load");
    assert_eq!(token.as_deref(), Some("tok-2"));
}

#[tokio::test]
async fn clear_removes_the_persisted_token() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.save_session_token("tok-1").await.expect("save");
    storage.clear_session_token().await.expect("clear");
    let token = storage.load_session_token().await.expect("load");
    assert_eq!(token, None);
}

#[tokio::test]
async fn clear_on_empty_database_is_a_no_op() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.clear_session_token().await.expect("clear");
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_and_parent_dirs_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("session.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    storage.save_session_token("tok-disk").await.expect("save");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    let reopened = Storage::new(&database_url).await.expect("reopen");
    let token = reopened.load_session_token().await.expect("load");
    assert_eq!(token.as_deref(), Some("tok-disk"));
}
