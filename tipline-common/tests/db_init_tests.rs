//! Database initialization integration tests
//!
//! Exercises schema creation against a real file-backed database, including
//! the uniqueness constraints that claim and reputation semantics lean on.

use tipline_common::db::{init_database, settings};
use tipline_common::models::ReputationEventKind;
use tipline_common::Error;

async fn insert_user(pool: &sqlx::SqlitePool, guid: &str, role: &str) {
    sqlx::query("INSERT INTO users (guid, role) VALUES (?, ?)")
        .bind(guid)
        .bind(role)
        .execute(pool)
        .await
        .unwrap();
}

async fn insert_tip(pool: &sqlx::SqlitePool, guid: &str, author: &str) {
    sqlx::query(
        "INSERT INTO tips (guid, author_id, title, body) VALUES (?, ?, 'title', 'body')",
    )
    .bind(guid)
    .bind(author)
    .execute(pool)
    .await
    .unwrap();
}

#[tokio::test]
async fn creates_database_file_and_schema() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("tipline.db");

    let pool = init_database(&db_path).await.unwrap();
    assert!(db_path.exists());

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for expected in [
        "audit_log",
        "payments",
        "picks",
        "reputation",
        "reputation_events",
        "settings",
        "subscriptions",
        "tips",
        "users",
        "verifications",
    ] {
        assert!(
            tables.iter().any(|t| t == expected),
            "missing table {expected}, got {tables:?}"
        );
    }
}

#[tokio::test]
async fn seeds_default_settings() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("tipline.db")).await.unwrap();

    assert_eq!(settings::embargo_hours(&pool).await.unwrap(), 48);
    assert_eq!(
        settings::reputation_delta(&pool, ReputationEventKind::ArticleCompleted)
            .await
            .unwrap(),
        10
    );
    assert_eq!(
        settings::reputation_delta(&pool, ReputationEventKind::ProposalIgnored)
            .await
            .unwrap(),
        -2
    );
    assert_eq!(settings::subscription_days(&pool).await.unwrap(), 30);
}

#[tokio::test]
async fn reinit_is_idempotent_and_preserves_tuned_settings() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("tipline.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query("UPDATE settings SET value = '12' WHERE key = 'embargo_hours'")
        .execute(&pool)
        .await
        .unwrap();
    drop(pool);

    // Second startup must not clobber the operator's tuning
    let pool = init_database(&db_path).await.unwrap();
    assert_eq!(settings::embargo_hours(&pool).await.unwrap(), 12);

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM settings WHERE key = 'embargo_hours'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
#[serial_test::serial]
async fn env_override_writes_through_to_settings() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("tipline.db");

    std::env::set_var("TIPLINE_EMBARGO_HOURS", "6");
    let pool = init_database(&db_path).await.unwrap();
    std::env::remove_var("TIPLINE_EMBARGO_HOURS");

    assert_eq!(settings::embargo_hours(&pool).await.unwrap(), 6);
    drop(pool);

    // Write-through: the value persists after the env var is gone
    let pool = init_database(&db_path).await.unwrap();
    assert_eq!(settings::embargo_hours(&pool).await.unwrap(), 6);
}

#[tokio::test]
#[serial_test::serial]
async fn non_numeric_env_override_is_ignored() {
    let dir = tempfile::tempdir().unwrap();

    std::env::set_var("TIPLINE_EMBARGO_HOURS", "soon");
    let pool = init_database(&dir.path().join("tipline.db")).await.unwrap();
    std::env::remove_var("TIPLINE_EMBARGO_HOURS");

    assert_eq!(settings::embargo_hours(&pool).await.unwrap(), 48);
}

#[tokio::test]
async fn duplicate_pick_violates_unique_index() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("tipline.db")).await.unwrap();

    insert_user(&pool, "u-reporter", "REPORTER").await;
    insert_user(&pool, "u-informant", "INFORMANT").await;
    insert_tip(&pool, "t-1", "u-informant").await;

    sqlx::query("INSERT INTO picks (guid, reporter_id, tip_id) VALUES ('p-1', 'u-reporter', 't-1')")
        .execute(&pool)
        .await
        .unwrap();

    let err = sqlx::query(
        "INSERT INTO picks (guid, reporter_id, tip_id) VALUES ('p-2', 'u-reporter', 't-1')",
    )
    .execute(&pool)
    .await
    .unwrap_err();

    assert!(Error::Database(err).is_unique_violation());
}

#[tokio::test]
async fn claim_scoped_reputation_events_dedup_but_moderation_events_do_not() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("tipline.db")).await.unwrap();

    insert_user(&pool, "u-reporter", "REPORTER").await;
    insert_user(&pool, "u-informant", "INFORMANT").await;
    insert_tip(&pool, "t-1", "u-informant").await;
    sqlx::query("INSERT INTO picks (guid, reporter_id, tip_id) VALUES ('p-1', 'u-reporter', 't-1')")
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query(
        "INSERT INTO reputation_events (user_id, pick_id, kind, delta)
         VALUES ('u-reporter', 'p-1', 'ARTICLE_COMPLETED', 10)",
    )
    .execute(&pool)
    .await
    .unwrap();

    // Same (pick, kind) pair: rejected
    let err = sqlx::query(
        "INSERT INTO reputation_events (user_id, pick_id, kind, delta)
         VALUES ('u-reporter', 'p-1', 'ARTICLE_COMPLETED', 10)",
    )
    .execute(&pool)
    .await
    .unwrap_err();
    assert!(Error::Database(err).is_unique_violation());

    // Unscoped moderation events (NULL pick_id) insert freely
    for _ in 0..2 {
        sqlx::query(
            "INSERT INTO reputation_events (user_id, pick_id, kind, delta)
             VALUES ('u-reporter', NULL, 'WARNING_ISSUED', -30)",
        )
        .execute(&pool)
        .await
        .unwrap();
    }

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM reputation_events WHERE kind = 'WARNING_ISSUED'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn deleting_a_pick_detaches_its_ledger_rows() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("tipline.db")).await.unwrap();

    insert_user(&pool, "u-reporter", "REPORTER").await;
    insert_user(&pool, "u-informant", "INFORMANT").await;
    insert_tip(&pool, "t-1", "u-informant").await;
    sqlx::query("INSERT INTO picks (guid, reporter_id, tip_id) VALUES ('p-1', 'u-reporter', 't-1')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO reputation_events (user_id, pick_id, kind, delta)
         VALUES ('u-reporter', 'p-1', 'ARTICLE_COMPLETED', 10)",
    )
    .execute(&pool)
    .await
    .unwrap();

    // The ledger must never block a withdrawal; the row detaches instead
    sqlx::query("DELETE FROM picks WHERE guid = 'p-1'")
        .execute(&pool)
        .await
        .unwrap();

    let rows: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM reputation_events WHERE user_id = 'u-reporter'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(rows, 1);

    let detached: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM reputation_events WHERE user_id = 'u-reporter' AND pick_id IS NULL",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(detached, 1);
}
