//! User directory operations
//!
//! Rows exist so foreign keys and role promotion have something to hang off;
//! identity and profile data live with the identity collaborator.

use chrono::Utc;
use sqlx::SqlitePool;
use tipline_common::models::Role;
use tipline_common::Result;
use uuid::Uuid;

/// Provision a directory row for an identity on its first qualifying write.
///
/// Deliberately INSERT OR IGNORE, not an upsert: the stored role is owned by
/// the verification workflow (promotion on approval), so a stale role header
/// must never demote it.
pub async fn ensure_user(pool: &SqlitePool, user_id: Uuid, role: Role) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    sqlx::query("INSERT OR IGNORE INTO users (guid, role, created_at, updated_at) VALUES (?, ?, ?, ?)")
        .bind(user_id.to_string())
        .bind(role.as_str())
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;
    Ok(())
}

/// Stored role, if the user has a directory row.
pub async fn get_role(pool: &SqlitePool, user_id: Uuid) -> Result<Option<Role>> {
    let raw: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE guid = ?")
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?;

    Ok(raw.and_then(|r| Role::parse(&r)))
}
