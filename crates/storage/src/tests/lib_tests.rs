use super::*;

async fn temp_db() -> (tempfile::TempDir, SessionDb) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}/session.db", dir.path().display());
    let db = SessionDb::new(&url).await.expect("open session db");
    (dir, db)
}

#[tokio::test]
async fn fresh_store_has_no_token() {
    let (_dir, db) = temp_db().await;
    db.health_check().await.expect("health check");
    assert_eq!(db.load_token().await.expect("load"), None);
}

#[tokio::test]
async fn token_survives_reopening_the_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}/session.db", dir.path().display());

    {
        let db = SessionDb::new(&url).await.expect("open session db");
        db.save_token("jwt-abc").await.expect("save");
    }

    let reopened = SessionDb::new(&url).await.expect("reopen session db");
    assert_eq!(
        reopened.load_token().await.expect("load"),
        Some("jwt-abc".to_string())
    );
}

#[tokio::test]
async fn save_overwrites_the_previous_token() {
    let (_dir, db) = temp_db().await;
    db.save_token("first").await.expect("save first");
    db.save_token("second").await.expect("save second");
    assert_eq!(
        db.load_token().await.expect("load"),
        Some("second".to_string())
    );
}

#[tokio::test]
async fn clear_removes_the_token() {
    let (_dir, db) = temp_db().await;
    db.save_token("jwt-abc").await.expect("save");
    db.clear_token().await.expect("clear");
    assert_eq!(db.load_token().await.expect("load"), None);

    // Clearing an already-empty store is a no-op.
    db.clear_token().await.expect("clear again");
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/session.db"),
        "sqlite://./data/session.db"
    );
    assert_eq!(
        normalize_database_url("sqlite:./data/session.db"),
        "sqlite://./data/session.db"
    );
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
}
