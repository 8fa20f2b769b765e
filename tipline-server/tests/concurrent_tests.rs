//! Integration tests for concurrent access patterns
//!
//! Exercises the store-level guards that keep the race-sensitive writes
//! correct under contention:
//! - embargo arming (at most one claim wins the window)
//! - duplicate claim rejection (unique index)
//! - verification request collision (unique user_id)
//! - completion award (applied exactly once)
//! - payment confirmation replay (unique order_id)

use std::sync::Arc;

use sqlx::SqlitePool;
use tempfile::TempDir;
use tokio::task::JoinSet;
use uuid::Uuid;

use tipline_common::db::init_database;
use tipline_common::models::{Role, Visibility};
use tipline_common::Error;
use tipline_server::db;

/// Test helper: file-backed database so writers genuinely contend.
///
/// The TempDir must stay alive for the duration of the test.
async fn setup_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("Should create temp dir");
    let pool = init_database(&temp_dir.path().join("tipline.db"))
        .await
        .expect("Should initialize database");
    (temp_dir, pool)
}

async fn seed_user(pool: &SqlitePool, role: Role) -> Uuid {
    let id = Uuid::new_v4();
    db::users::ensure_user(pool, id, role).await.expect("Should seed user");
    id
}

async fn seed_approved_tip(pool: &SqlitePool, author: Uuid, visibility: Visibility) -> Uuid {
    let tip = db::tips::insert_tip(
        pool,
        db::tips::NewTip {
            author_id: author,
            title: "Contended tip".to_string(),
            body: "body".to_string(),
            category: None,
            region: None,
            visibility,
            anonymous: true,
        },
    )
    .await
    .expect("Should insert tip");

    let decided = db::tips::decide(
        pool,
        tip.guid,
        tipline_common::models::ReviewDecision::Approved,
        None,
    )
    .await
    .expect("Should approve tip");
    assert!(decided);

    tip.guid
}

// ============================================================================
// Embargo arming race
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_exclusive_claims_arm_embargo_once() {
    let (_temp_dir, pool) = setup_db().await;
    let author = seed_user(&pool, Role::Informant).await;
    let tip_id = seed_approved_tip(&pool, author, Visibility::Exclusive).await;

    let reporters = [
        seed_user(&pool, Role::Reporter).await,
        seed_user(&pool, Role::Reporter).await,
    ];

    let pool = Arc::new(pool);
    let mut join_set = JoinSet::new();
    for reporter in reporters {
        let pool_clone = Arc::clone(&pool);
        join_set.spawn(async move {
            db::picks::create_claim(&pool_clone, reporter, tip_id, None, true, 48).await
        });
    }

    let mut outcomes = Vec::new();
    while let Some(result) = join_set.join_next().await {
        let outcome = result
            .expect("Task panicked")
            .expect("Both claims should insert");
        outcomes.push(outcome);
    }

    // Exactly one claim observed the arming write
    let winners: Vec<_> = outcomes.iter().filter(|o| o.embargo_set).collect();
    assert_eq!(winners.len(), 1, "exactly one claim must arm the window");

    // Both picks exist
    let pick_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM picks WHERE tip_id = ?")
        .bind(tip_id.to_string())
        .fetch_one(pool.as_ref())
        .await
        .unwrap();
    assert_eq!(pick_count, 2);

    // The stored deadline is the winner's
    let stored: Option<String> = sqlx::query_scalar("SELECT embargo_ends FROM tips WHERE guid = ?")
        .bind(tip_id.to_string())
        .fetch_one(pool.as_ref())
        .await
        .unwrap();
    let stored = chrono::DateTime::parse_from_rfc3339(&stored.expect("deadline stored"))
        .unwrap()
        .with_timezone(&chrono::Utc);
    assert_eq!(Some(stored), winners[0].embargo_ends);
}

// ============================================================================
// Duplicate claim race
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_duplicate_claims_one_conflict() {
    let (_temp_dir, pool) = setup_db().await;
    let author = seed_user(&pool, Role::Informant).await;
    let reporter = seed_user(&pool, Role::Reporter).await;
    let tip_id = seed_approved_tip(&pool, author, Visibility::Open).await;

    let pool = Arc::new(pool);
    let mut join_set = JoinSet::new();
    for _ in 0..2 {
        let pool_clone = Arc::clone(&pool);
        join_set.spawn(async move {
            db::picks::create_claim(&pool_clone, reporter, tip_id, None, false, 48).await
        });
    }

    let mut ok_count = 0;
    let mut conflict_count = 0;
    while let Some(result) = join_set.join_next().await {
        match result.expect("Task panicked") {
            Ok(_) => ok_count += 1,
            Err(Error::Conflict(_)) => conflict_count += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(ok_count, 1);
    assert_eq!(conflict_count, 1);

    let pick_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM picks WHERE tip_id = ?")
        .bind(tip_id.to_string())
        .fetch_one(pool.as_ref())
        .await
        .unwrap();
    assert_eq!(pick_count, 1);
}

// ============================================================================
// Verification request race
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_verification_requests_one_conflict() {
    let (_temp_dir, pool) = setup_db().await;
    let user = seed_user(&pool, Role::Informant).await;

    // Both callers pass any status pre-check (no row yet); the unique index
    // on user_id must turn the losing insert into a conflict, not a 503
    let pool = Arc::new(pool);
    let mut join_set = JoinSet::new();
    for _ in 0..2 {
        let pool_clone = Arc::clone(&pool);
        join_set.spawn(async move {
            db::verifications::request(&pool_clone, user, Some("press card")).await
        });
    }

    let mut ok_count = 0;
    let mut conflict_count = 0;
    while let Some(result) = join_set.join_next().await {
        match result.expect("Task panicked") {
            Ok(_) => ok_count += 1,
            Err(Error::Conflict(_)) => conflict_count += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(ok_count, 1);
    assert_eq!(conflict_count, 1);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM verifications WHERE user_id = ?")
        .bind(user.to_string())
        .fetch_one(pool.as_ref())
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

// ============================================================================
// Completion award race
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_completions_award_once() {
    let (_temp_dir, pool) = setup_db().await;
    let author = seed_user(&pool, Role::Informant).await;
    let reporter = seed_user(&pool, Role::Reporter).await;
    let tip_id = seed_approved_tip(&pool, author, Visibility::Open).await;

    let outcome = db::picks::create_claim(&pool, reporter, tip_id, None, false, 48)
        .await
        .expect("Should claim");
    let pick = outcome.pick;

    let pool = Arc::new(pool);
    let mut join_set = JoinSet::new();
    for _ in 0..2 {
        let pool_clone = Arc::clone(&pool);
        let pick = pick.clone();
        join_set.spawn(async move {
            db::picks::complete_pick(&pool_clone, &pick, "https://news.example/story", 10).await
        });
    }

    let mut applied_count = 0;
    while let Some(result) = join_set.join_next().await {
        let outcome = result
            .expect("Task panicked")
            .expect("Both completions should succeed");
        if outcome.reputation_applied {
            applied_count += 1;
        }
    }
    assert_eq!(applied_count, 1, "the award must land exactly once");

    let reputation = db::reputation::get(&pool, reporter)
        .await
        .unwrap()
        .expect("reputation row provisioned by the award");
    assert_eq!(reputation.score, 10);
    assert_eq!(reputation.articles_count, 1);

    let ledger_rows: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM reputation_events WHERE pick_id = ?")
            .bind(pick.guid.to_string())
            .fetch_one(pool.as_ref())
            .await
            .unwrap();
    assert_eq!(ledger_rows, 1);
}

// ============================================================================
// Payment confirmation replay race
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_payment_confirmations_record_once() {
    use tipline_common::models::SubscriptionPlan;

    let (_temp_dir, pool) = setup_db().await;
    let payer = seed_user(&pool, Role::Informant).await;

    let pool = Arc::new(pool);
    let mut join_set = JoinSet::new();
    for _ in 0..2 {
        let pool_clone = Arc::clone(&pool);
        join_set.spawn(async move {
            db::payments::record_confirmed(
                &pool_clone,
                db::payments::NewPayment {
                    user_id: payer,
                    order_id: "ord-race-1".to_string(),
                    kind: tipline_common::models::PaymentKind::Subscription,
                    amount: 59_000,
                    tip_id: None,
                },
                SubscriptionPlan::Premium,
                30,
            )
            .await
        });
    }

    let mut recorded = 0;
    let mut replayed = 0;
    while let Some(result) = join_set.join_next().await {
        match result.expect("Task panicked").expect("Both calls should succeed") {
            db::payments::PaymentOutcome::Recorded { subscription, .. } => {
                assert!(subscription.is_some(), "first record opens the window");
                recorded += 1;
            }
            db::payments::PaymentOutcome::Replayed { payment } => {
                assert_eq!(payment.order_id, "ord-race-1");
                replayed += 1;
            }
        }
    }

    assert_eq!(recorded, 1);
    assert_eq!(replayed, 1);

    let payment_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments")
        .fetch_one(pool.as_ref())
        .await
        .unwrap();
    assert_eq!(payment_rows, 1);

    let subscription_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions")
        .fetch_one(pool.as_ref())
        .await
        .unwrap();
    assert_eq!(subscription_rows, 1);
}
