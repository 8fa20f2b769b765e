//! Settings database operations
//!
//! Typed accessors over the settings key-value table. Every getter falls
//! back to the compiled default when the row is missing; a present but
//! unparsable value is a configuration error, not a silent default.

use crate::models::ReputationEventKind;
use crate::{Error, Result};
use sqlx::{Pool, Sqlite};

/// Exclusivity window length granted to the winning pick, in hours.
pub async fn embargo_hours(db: &Pool<Sqlite>) -> Result<i64> {
    get_setting(db, "embargo_hours")
        .await
        .map(|opt| opt.unwrap_or(48))
}

/// Score delta for a reputation event kind.
pub async fn reputation_delta(db: &Pool<Sqlite>, kind: ReputationEventKind) -> Result<i64> {
    get_setting(db, kind.settings_key())
        .await
        .map(|opt| opt.unwrap_or_else(|| kind.default_delta()))
}

/// Subscription period granted per confirmed payment, in days.
pub async fn subscription_days(db: &Pool<Sqlite>) -> Result<i64> {
    get_setting(db, "subscription_days")
        .await
        .map(|opt| opt.unwrap_or(30))
}

/// Minimum confirmed amount that maps to the BASIC plan.
pub async fn plan_basic_amount(db: &Pool<Sqlite>) -> Result<i64> {
    get_setting(db, "plan_basic_amount")
        .await
        .map(|opt| opt.unwrap_or(29_000))
}

/// Minimum confirmed amount that maps to the PREMIUM plan.
pub async fn plan_premium_amount(db: &Pool<Sqlite>) -> Result<i64> {
    get_setting(db, "plan_premium_amount")
        .await
        .map(|opt| opt.unwrap_or(59_000))
}

/// Generic setting getter (internal)
async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((Some(value),)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting '{}' failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

/// Generic setting setter (internal)
#[cfg(test)]
async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;

    /// Setup in-memory test database with settings table
    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::init::create_settings_table(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_defaults_when_unset() {
        let pool = setup_test_db().await;

        assert_eq!(embargo_hours(&pool).await.unwrap(), 48);
        assert_eq!(subscription_days(&pool).await.unwrap(), 30);
        assert_eq!(plan_basic_amount(&pool).await.unwrap(), 29_000);
        assert_eq!(plan_premium_amount(&pool).await.unwrap(), 59_000);
        assert_eq!(
            reputation_delta(&pool, ReputationEventKind::ArticleCompleted)
                .await
                .unwrap(),
            10
        );
        assert_eq!(
            reputation_delta(&pool, ReputationEventKind::WarningIssued)
                .await
                .unwrap(),
            -30
        );
    }

    #[tokio::test]
    async fn test_stored_value_wins() {
        let pool = setup_test_db().await;

        set_setting(&pool, "embargo_hours", 12).await.unwrap();
        assert_eq!(embargo_hours(&pool).await.unwrap(), 12);

        set_setting(&pool, "rep_article_completed", 25).await.unwrap();
        assert_eq!(
            reputation_delta(&pool, ReputationEventKind::ArticleCompleted)
                .await
                .unwrap(),
            25
        );
    }

    #[tokio::test]
    async fn test_upsert_keeps_single_row() {
        let pool = setup_test_db().await;

        set_setting(&pool, "embargo_hours", 12).await.unwrap();
        set_setting(&pool, "embargo_hours", 24).await.unwrap();

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM settings WHERE key = 'embargo_hours'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 1);
        assert_eq!(embargo_hours(&pool).await.unwrap(), 24);
    }

    #[tokio::test]
    async fn test_unparsable_value_is_config_error() {
        let pool = setup_test_db().await;

        set_setting(&pool, "embargo_hours", "not-a-number").await.unwrap();
        let err = embargo_hours(&pool).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
