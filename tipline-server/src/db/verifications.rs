//! Reporter verification requests

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tipline_common::models::{ReviewDecision, Role, Verification, VerifyStatus};
use tipline_common::{Error, Result};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid};

const VERIFICATION_COLUMNS: &str =
    "guid, user_id, status, docs, comment, created_at, updated_at";

fn map_verification(row: &SqliteRow) -> Result<Verification> {
    let guid: String = row.get("guid");
    let user_id: String = row.get("user_id");
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Verification {
        guid: parse_uuid(&guid, "verifications.guid")?,
        user_id: parse_uuid(&user_id, "verifications.user_id")?,
        status: VerifyStatus::parse(&status)
            .ok_or_else(|| Error::Internal(format!("unexpected verification status: {status}")))?,
        docs: row.get("docs"),
        comment: row.get("comment"),
        created_at: parse_timestamp(&created_at, "verifications.created_at")?,
        updated_at: parse_timestamp(&updated_at, "verifications.updated_at")?,
    })
}

pub async fn get_by_user(pool: &SqlitePool, user_id: Uuid) -> Result<Option<Verification>> {
    let sql = format!("SELECT {VERIFICATION_COLUMNS} FROM verifications WHERE user_id = ?");
    let row = sqlx::query(&sql)
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(map_verification).transpose()
}

pub async fn get_by_id(pool: &SqlitePool, verification_id: Uuid) -> Result<Option<Verification>> {
    let sql = format!("SELECT {VERIFICATION_COLUMNS} FROM verifications WHERE guid = ?");
    let row = sqlx::query(&sql)
        .bind(verification_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(map_verification).transpose()
}

/// File (or re-file) a verification request.
///
/// One row per user. A fresh request inserts a PENDING row; after a
/// rejection the same row is reset to PENDING with the new documents and the
/// reviewer comment cleared. The UNIQUE(user_id) index is the authority on
/// simultaneous first requests: the losing INSERT surfaces as a conflict, so
/// callers racing past the status pre-check still get the right answer.
pub async fn request(pool: &SqlitePool, user_id: Uuid, docs: Option<&str>) -> Result<Verification> {
    let now = Utc::now();

    let result = sqlx::query(
        "UPDATE verifications \
         SET status = 'PENDING', docs = ?, comment = NULL, updated_at = ? \
         WHERE user_id = ? AND status = 'REJECTED'",
    )
    .bind(docs)
    .bind(now.to_rfc3339())
    .bind(user_id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        sqlx::query(
            r#"
            INSERT INTO verifications (guid, user_id, status, docs, created_at, updated_at)
            VALUES (?, ?, 'PENDING', ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id.to_string())
        .bind(docs)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(pool)
        .await
        .map_err(|e| {
            let e = Error::Database(e);
            if e.is_unique_violation() {
                Error::Conflict("already under review".to_string())
            } else {
                e
            }
        })?;
    }

    get_by_user(pool, user_id)
        .await?
        .ok_or_else(|| Error::Internal("verification row missing after write".to_string()))
}

pub async fn count_all(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM verifications")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Verification queue, newest first.
pub async fn list(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<Verification>> {
    let sql = format!(
        "SELECT {VERIFICATION_COLUMNS} FROM verifications \
         ORDER BY created_at DESC LIMIT ? OFFSET ?"
    );
    let rows = sqlx::query(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    rows.iter().map(map_verification).collect()
}

/// Decide a PENDING verification. Returns false when the row was already
/// decided (the WHERE clause is the only arbiter; no prior read is trusted).
///
/// Approval promotes the user to REPORTER and provisions a zeroed reputation
/// row in the same transaction, so a freshly approved reporter is visible to
/// the scoring endpoints immediately.
pub async fn decide(
    pool: &SqlitePool,
    verification_id: Uuid,
    decision: ReviewDecision,
    comment: Option<&str>,
) -> Result<bool> {
    let now = Utc::now();
    let status = match decision {
        ReviewDecision::Approved => VerifyStatus::Approved,
        ReviewDecision::Rejected => VerifyStatus::Rejected,
    };

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE verifications SET status = ?, comment = ?, updated_at = ? \
         WHERE guid = ? AND status = 'PENDING'",
    )
    .bind(status.as_str())
    .bind(comment)
    .bind(now.to_rfc3339())
    .bind(verification_id.to_string())
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    if decision == ReviewDecision::Approved {
        let user_id: String =
            sqlx::query_scalar("SELECT user_id FROM verifications WHERE guid = ?")
                .bind(verification_id.to_string())
                .fetch_one(&mut *tx)
                .await?;

        sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE guid = ?")
            .bind(Role::Reporter.as_str())
            .bind(now.to_rfc3339())
            .bind(&user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO reputation (user_id, score, articles_count, updated_at)
            VALUES (?, 0, 0, ?)
            "#,
        )
        .bind(&user_id)
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(true)
}
