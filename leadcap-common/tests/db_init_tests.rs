//! Unit tests for database initialization and graceful degradation
//!
//! Covers automatic database creation, idempotent re-initialization,
//! seeded default settings, NULL value recovery and the uniqueness
//! constraints on the lead identity columns.

use leadcap_common::db::init::init_database;
use std::path::PathBuf;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let test_db = format!("/tmp/leadcap-test-db-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    // Ensure database doesn't exist
    let _ = std::fs::remove_file(&db_path);

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");

    // Cleanup
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_database_opens_existing() {
    let test_db = format!("/tmp/leadcap-test-db-existing-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);

    // Create database first time
    let pool1 = init_database(&db_path).await;
    assert!(pool1.is_ok());

    // Open database second time (should succeed)
    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());

    drop(pool1);
    drop(pool2);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_default_settings_initialized() {
    let test_db = format!("/tmp/leadcap-test-db-settings-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    let test_cases = vec![
        ("score_threshold_hot", "24"),
        ("score_threshold_warm", "15"),
        ("score_threshold_cold", "8"),
        ("lead_abandonment_window_hours", "24"),
        ("lead_default_status", "new"),
    ];

    for (key, expected_value) in test_cases {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&pool)
            .await
            .unwrap();

        assert!(value.is_some(), "Setting '{}' not initialized", key);
        assert_eq!(value.unwrap(), expected_value, "Setting '{}' has wrong default value", key);
    }

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_idempotent_initialization() {
    let test_db = format!("/tmp/leadcap-test-db-idempotent-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);

    let pool1 = init_database(&db_path).await.unwrap();

    let count1: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM settings")
        .fetch_one(&pool1)
        .await
        .unwrap();

    drop(pool1);

    // Initialize database second time (should not error)
    let pool2 = init_database(&db_path).await.unwrap();

    let count2: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM settings")
        .fetch_one(&pool2)
        .await
        .unwrap();

    assert_eq!(count1, count2, "Settings count changed on second initialization");

    drop(pool2);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_null_value_handling() {
    let test_db = format!("/tmp/leadcap-test-db-null-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    // Manually set a setting to NULL
    sqlx::query("UPDATE settings SET value = NULL WHERE key = 'score_threshold_hot'")
        .execute(&pool)
        .await
        .unwrap();

    drop(pool);

    // Re-initialize database (should reset NULL to default)
    let pool2 = init_database(&db_path).await.unwrap();

    let value: Option<String> = sqlx::query_scalar(
        "SELECT value FROM settings WHERE key = 'score_threshold_hot'",
    )
    .fetch_one(&pool2)
    .await
    .unwrap();

    assert!(value.is_some(), "NULL value was not reset to default");
    assert_eq!(value.unwrap(), "24", "NULL value was not reset to correct default");

    drop(pool2);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_session_id_unique_constraint() {
    let test_db = format!("/tmp/leadcap-test-db-unique-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    sqlx::query("INSERT INTO leads (guid, session_id) VALUES ('g1', 's1')")
        .execute(&pool)
        .await
        .unwrap();

    // Second insert for the same session must violate the unique constraint
    let result = sqlx::query("INSERT INTO leads (guid, session_id) VALUES ('g2', 's1')")
        .execute(&pool)
        .await;

    assert!(result.is_err(), "Duplicate session_id insert should fail");
    let err = result.unwrap_err();
    let is_unique = err
        .as_database_error()
        .map(|d| d.is_unique_violation())
        .unwrap_or(false);
    assert!(is_unique, "Expected a unique violation, got: {:?}", err);

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_conversation_id_allows_multiple_nulls() {
    // A UNIQUE column in SQLite permits any number of NULLs: form-only leads
    // never block each other on the absent conversation id
    let test_db = format!("/tmp/leadcap-test-db-convnull-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    sqlx::query("INSERT INTO leads (guid, session_id) VALUES ('g1', 's1')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO leads (guid, session_id) VALUES ('g2', 's2')")
        .execute(&pool)
        .await
        .unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leads")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 2);

    // But a duplicated conversation id must fail
    sqlx::query("UPDATE leads SET conversation_id = 'c1' WHERE guid = 'g1'")
        .execute(&pool)
        .await
        .unwrap();
    let result = sqlx::query("UPDATE leads SET conversation_id = 'c1' WHERE guid = 'g2'")
        .execute(&pool)
        .await;
    assert!(result.is_err(), "Duplicate conversation_id should fail");

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_foreign_keys_enabled() {
    let test_db = format!("/tmp/leadcap-test-db-fk-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    let fk_enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
        .fetch_one(&pool)
        .await
        .unwrap();

    assert_eq!(fk_enabled, 1, "Foreign keys should be enabled");

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_concurrent_initialization() {
    let test_db = format!("/tmp/leadcap-test-db-concurrent-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);

    // Spawn multiple concurrent initialization tasks
    let mut handles = vec![];

    for _ in 0..5 {
        let db_path_clone = db_path.clone();
        let handle = tokio::spawn(async move { init_database(&db_path_clone).await });
        handles.push(handle);
    }

    let mut results = vec![];
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    for result in &results {
        assert!(result.is_ok(), "Concurrent initialization failed: {:?}", result);
    }

    // Verify database is in consistent state
    let pool = results[0].as_ref().unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM settings")
        .fetch_one(pool)
        .await
        .unwrap();

    assert!(count >= 5, "Settings not properly initialized after concurrent access");

    for result in results {
        drop(result);
    }
    let _ = std::fs::remove_file(&db_path);
}
