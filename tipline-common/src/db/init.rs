//! Database initialization
//!
//! Creates the schema on first run and reconciles seeded settings on every
//! start, so a fresh deployment needs nothing beyond a writable root folder.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{info, warn};

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use sqlite options to create database if it doesn't exist
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create tables, indexes, and seeded settings on an already-open pool.
///
/// Split out from [`init_database`] so tests can run the production schema
/// against an in-memory pool.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    // WAL allows concurrent readers with one writer, which matters once
    // list endpoints and claim writes contend
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;

    // Initial busy timeout; re-applied from settings once they exist
    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;

    // Schema creation (idempotent - safe to call multiple times)
    create_schema_version_table(pool).await?;
    create_settings_table(pool).await?;
    create_users_table(pool).await?;
    create_tips_table(pool).await?;
    create_picks_table(pool).await?;
    create_verifications_table(pool).await?;
    create_reputation_table(pool).await?;
    create_reputation_events_table(pool).await?;
    create_audit_log_table(pool).await?;
    create_payments_table(pool).await?;
    create_subscriptions_table(pool).await?;

    init_default_settings(pool).await?;
    apply_env_overrides(pool).await?;

    // Apply configurable busy timeout from settings
    let timeout_ms: i64 = sqlx::query_scalar(
        "SELECT CAST(value AS INTEGER) FROM settings WHERE key = 'db_busy_timeout_ms'",
    )
    .fetch_optional(pool)
    .await?
    .unwrap_or(5000);

    let pragma_sql = format!("PRAGMA busy_timeout = {}", timeout_ms);
    sqlx::query(&pragma_sql).execute(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (1)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores policy knobs as key-value pairs so embargo length and reputation
/// deltas can be retuned without a code change.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the users table
///
/// Rows are provisioned lazily from the identity collaborator's trusted
/// headers; this service stores only what authorization needs.
pub async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            role TEXT NOT NULL DEFAULT 'INFORMANT'
                CHECK (role IN ('INFORMANT', 'REPORTER', 'ADMIN')),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the tips table
///
/// `embargo_ends` is armed exactly once, by the first pick on an EXCLUSIVE
/// tip, and never cleared; expiry is derived at read time.
pub async fn create_tips_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tips (
            guid TEXT PRIMARY KEY,
            author_id TEXT NOT NULL REFERENCES users(guid),
            title TEXT NOT NULL,
            body TEXT NOT NULL,
            category TEXT,
            region TEXT,
            visibility TEXT NOT NULL DEFAULT 'OPEN'
                CHECK (visibility IN ('OPEN', 'EXCLUSIVE')),
            status TEXT NOT NULL DEFAULT 'PENDING'
                CHECK (status IN ('PENDING', 'APPROVED', 'REJECTED')),
            anonymous INTEGER NOT NULL DEFAULT 1 CHECK (anonymous IN (0, 1)),
            boosted INTEGER NOT NULL DEFAULT 0 CHECK (boosted IN (0, 1)),
            view_count INTEGER NOT NULL DEFAULT 0 CHECK (view_count >= 0),
            embargo_ends TIMESTAMP,
            reject_reason TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (length(title) > 0),
            CHECK (length(body) > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tips_status ON tips(status)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tips_author ON tips(author_id)")
        .execute(pool)
        .await?;
    // Listing order: boosted first, then newest
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tips_listing ON tips(status, boosted DESC, created_at DESC)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tips_category ON tips(category)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tips_region ON tips(region)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the picks table
///
/// The unique index on (reporter_id, tip_id) is the authority on duplicate
/// claims; application code maps its violation to a conflict error.
pub async fn create_picks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS picks (
            guid TEXT PRIMARY KEY,
            reporter_id TEXT NOT NULL REFERENCES users(guid),
            tip_id TEXT NOT NULL REFERENCES tips(guid) ON DELETE CASCADE,
            proposal TEXT,
            accepted INTEGER NOT NULL DEFAULT 0 CHECK (accepted IN (0, 1)),
            completed INTEGER NOT NULL DEFAULT 0 CHECK (completed IN (0, 1)),
            article_url TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (reporter_id, tip_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_picks_tip ON picks(tip_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_picks_reporter ON picks(reporter_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the verifications table
///
/// One row per user (resubmission after rejection updates in place), so
/// "at most one non-terminal application" holds structurally.
pub async fn create_verifications_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS verifications (
            guid TEXT PRIMARY KEY,
            user_id TEXT NOT NULL UNIQUE REFERENCES users(guid),
            status TEXT NOT NULL DEFAULT 'PENDING'
                CHECK (status IN ('PENDING', 'APPROVED', 'REJECTED')),
            docs TEXT,
            comment TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the reputation table
pub async fn create_reputation_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reputation (
            user_id TEXT PRIMARY KEY REFERENCES users(guid),
            score INTEGER NOT NULL DEFAULT 0,
            articles_count INTEGER NOT NULL DEFAULT 0 CHECK (articles_count >= 0),
            last_active_at TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the reputation_events table
///
/// Ledger backing score adjustments. The unique index over (pick_id, kind)
/// makes claim-scoped events idempotent; unscoped moderation events carry a
/// NULL pick_id, and SQLite treats NULLs as distinct, so they always insert.
/// Deleting a pick detaches its ledger rows (SET NULL) rather than blocking
/// the delete: earned history outlives the withdrawn claim.
pub async fn create_reputation_events_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reputation_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL REFERENCES users(guid),
            pick_id TEXT REFERENCES picks(guid) ON DELETE SET NULL,
            kind TEXT NOT NULL CHECK (kind IN (
                'ARTICLE_COMPLETED', 'EXCELLENT_RESPONSE', 'PROPOSAL_IGNORED',
                'REPORT_RECEIVED', 'WARNING_ISSUED')),
            delta INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (pick_id, kind)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reputation_events_user ON reputation_events(user_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the audit_log table
///
/// Append-only by convention: no UPDATE or DELETE statement for this table
/// exists anywhere in the codebase.
pub async fn create_audit_log_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            action TEXT NOT NULL,
            target_type TEXT NOT NULL,
            target_id TEXT NOT NULL,
            detail TEXT,
            actor_id TEXT NOT NULL,
            subject_id TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_log_target ON audit_log(target_type, target_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the payments table
///
/// Confirmed payments only; `order_id` uniqueness is the replay guard.
pub async fn create_payments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS payments (
            guid TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(guid),
            order_id TEXT NOT NULL UNIQUE,
            kind TEXT NOT NULL CHECK (kind IN ('SUBSCRIPTION', 'BOOST')),
            amount INTEGER NOT NULL CHECK (amount > 0),
            tip_id TEXT REFERENCES tips(guid),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_payments_user ON payments(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the subscriptions table
pub async fn create_subscriptions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subscriptions (
            guid TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(guid),
            plan TEXT NOT NULL CHECK (plan IN ('FREE', 'BASIC', 'PREMIUM')),
            status TEXT NOT NULL DEFAULT 'ACTIVE'
                CHECK (status IN ('ACTIVE', 'CANCELLED', 'EXPIRED')),
            started_at TIMESTAMP NOT NULL,
            ends_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_subscriptions_user ON subscriptions(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// This function ensures all policy knobs exist with default values.
/// It also handles NULL values by resetting them to defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    // Embargo policy
    ensure_setting(pool, "embargo_hours", "48").await?;

    // Reputation deltas
    ensure_setting(pool, "rep_article_completed", "10").await?;
    ensure_setting(pool, "rep_excellent_response", "5").await?;
    ensure_setting(pool, "rep_proposal_ignored", "-2").await?;
    ensure_setting(pool, "rep_report_received", "-20").await?;
    ensure_setting(pool, "rep_warning_issued", "-30").await?;

    // Review SLA policy (informational; frontends display these)
    ensure_setting(pool, "report_sla_normal_hours", "72").await?;
    ensure_setting(pool, "report_sla_high_risk_hours", "24").await?;

    // Subscription policy
    ensure_setting(pool, "subscription_days", "30").await?;
    ensure_setting(pool, "plan_basic_amount", "29000").await?;
    ensure_setting(pool, "plan_premium_amount", "59000").await?;

    // Database tuning
    ensure_setting(pool, "db_busy_timeout_ms", "5000").await?;

    info!("Default settings initialized");
    Ok(())
}

/// Settings that accept a boot-time environment override.
///
/// `TIPLINE_<KEY>` (key uppercased) writes through to the table, so a
/// container deployment can retune policy without touching the database.
const ENV_OVERRIDABLE_SETTINGS: &[&str] = &[
    "embargo_hours",
    "rep_article_completed",
    "rep_excellent_response",
    "rep_proposal_ignored",
    "rep_report_received",
    "rep_warning_issued",
    "report_sla_normal_hours",
    "report_sla_high_risk_hours",
    "subscription_days",
    "plan_basic_amount",
    "plan_premium_amount",
    "db_busy_timeout_ms",
];

async fn apply_env_overrides(pool: &SqlitePool) -> Result<()> {
    for key in ENV_OVERRIDABLE_SETTINGS {
        let env_name = format!("TIPLINE_{}", key.to_uppercase());
        if let Ok(value) = std::env::var(&env_name) {
            if value.trim().is_empty() {
                continue;
            }
            if value.trim().parse::<i64>().is_err() {
                warn!(
                    "Ignoring {}: '{}' is not an integer",
                    env_name, value
                );
                continue;
            }
            sqlx::query(
                "INSERT INTO settings (key, value) VALUES (?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            )
            .bind(key)
            .bind(value.trim())
            .execute(pool)
            .await?;
            info!("Setting '{}' overridden from {}", key, env_name);
        }
    }
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // INSERT OR IGNORE handles concurrent initialization races: multiple
        // connections may pass the exists check simultaneously
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;

        return Ok(());
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}
