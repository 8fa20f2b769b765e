//! Reputation scores and the append-only event ledger

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tipline_common::models::{Reputation, ReputationEventKind};
use tipline_common::Result;
use uuid::Uuid;

use super::{parse_opt_timestamp, parse_timestamp, parse_uuid};

fn map_reputation(row: &SqliteRow) -> Result<Reputation> {
    let user_id: String = row.get("user_id");
    let last_active_at: Option<String> = row.get("last_active_at");
    let updated_at: String = row.get("updated_at");

    Ok(Reputation {
        user_id: parse_uuid(&user_id, "reputation.user_id")?,
        score: row.get("score"),
        articles_count: row.get("articles_count"),
        last_active_at: parse_opt_timestamp(last_active_at, "reputation.last_active_at")?,
        updated_at: parse_timestamp(&updated_at, "reputation.updated_at")?,
    })
}

/// A user's reputation row, if one has been provisioned.
pub async fn get(pool: &SqlitePool, user_id: Uuid) -> Result<Option<Reputation>> {
    let row = sqlx::query(
        "SELECT user_id, score, articles_count, last_active_at, updated_at \
         FROM reputation WHERE user_id = ?",
    )
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(map_reputation).transpose()
}

/// Record a reputation event and fold its delta into the score.
///
/// Claim-scoped kinds carry a pick id and are deduplicated by the ledger's
/// UNIQUE(pick_id, kind) index; a replay returns false and leaves the score
/// untouched. Moderation kinds (NULL pick id) always apply.
pub async fn apply_event(
    pool: &SqlitePool,
    user_id: Uuid,
    pick_id: Option<Uuid>,
    kind: ReputationEventKind,
    delta: i64,
) -> Result<bool> {
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        "INSERT OR IGNORE INTO reputation_events (user_id, pick_id, kind, delta, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id.to_string())
    .bind(pick_id.map(|id| id.to_string()))
    .bind(kind.as_str())
    .bind(delta)
    .bind(now.to_rfc3339())
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if inserted == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    sqlx::query(
        r#"
        INSERT INTO reputation (user_id, score, articles_count, last_active_at, updated_at)
        VALUES (?, ?, 0, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            score = score + excluded.score,
            last_active_at = excluded.last_active_at,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(user_id.to_string())
    .bind(delta)
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(true)
}
