//! Append-only audit log for moderation actions

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tipline_common::models::AuditEntry;
use tipline_common::Result;
use uuid::Uuid;

use super::{parse_opt_uuid, parse_timestamp, parse_uuid};

fn map_entry(row: &SqliteRow) -> Result<AuditEntry> {
    let actor_id: String = row.get("actor_id");
    let subject_id: Option<String> = row.get("subject_id");
    let created_at: String = row.get("created_at");

    Ok(AuditEntry {
        id: row.get("id"),
        action: row.get("action"),
        target_type: row.get("target_type"),
        target_id: row.get("target_id"),
        detail: row.get("detail"),
        actor_id: parse_uuid(&actor_id, "audit_log.actor_id")?,
        subject_id: parse_opt_uuid(subject_id, "audit_log.subject_id")?,
        created_at: parse_timestamp(&created_at, "audit_log.created_at")?,
    })
}

/// Append one audit entry.
///
/// Callers decide what a write failure means; moderation handlers log it and
/// degrade rather than roll back the action already committed.
pub async fn append(
    pool: &SqlitePool,
    action: &str,
    target_type: &str,
    target_id: Uuid,
    detail: Option<&str>,
    actor_id: Uuid,
    subject_id: Option<Uuid>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (action, target_type, target_id, detail, actor_id, subject_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(action)
    .bind(target_type)
    .bind(target_id.to_string())
    .bind(detail)
    .bind(actor_id.to_string())
    .bind(subject_id.map(|id| id.to_string()))
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn count(pool: &SqlitePool, target_type: Option<&str>) -> Result<i64> {
    let count: i64 = match target_type {
        Some(t) => {
            sqlx::query_scalar("SELECT COUNT(*) FROM audit_log WHERE target_type = ?")
                .bind(t)
                .fetch_one(pool)
                .await?
        }
        None => {
            sqlx::query_scalar("SELECT COUNT(*) FROM audit_log")
                .fetch_one(pool)
                .await?
        }
    };
    Ok(count)
}

/// Audit entries, newest first.
pub async fn list(
    pool: &SqlitePool,
    target_type: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<AuditEntry>> {
    const COLUMNS: &str =
        "id, action, target_type, target_id, detail, actor_id, subject_id, created_at";

    let rows = match target_type {
        Some(t) => {
            let sql = format!(
                "SELECT {COLUMNS} FROM audit_log WHERE target_type = ? \
                 ORDER BY id DESC LIMIT ? OFFSET ?"
            );
            sqlx::query(&sql)
                .bind(t)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
        }
        None => {
            let sql = format!("SELECT {COLUMNS} FROM audit_log ORDER BY id DESC LIMIT ? OFFSET ?");
            sqlx::query(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
        }
    };

    rows.iter().map(map_entry).collect()
}
