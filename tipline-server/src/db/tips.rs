//! Tip entity store operations

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tipline_common::models::{ReviewDecision, Tip, TipStatus, Visibility};
use tipline_common::{Error, Result};
use uuid::Uuid;

use super::{parse_opt_timestamp, parse_timestamp, parse_uuid};

/// Fields accepted from a submission; everything else is server-assigned.
#[derive(Debug)]
pub struct NewTip {
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    pub region: Option<String>,
    pub visibility: Visibility,
    pub anonymous: bool,
}

/// Optional filters for the public listing.
#[derive(Debug, Default)]
pub struct TipFilter {
    pub category: Option<String>,
    pub region: Option<String>,
    pub visibility: Option<Visibility>,
}

pub(crate) const TIP_COLUMNS: &str = "guid, author_id, title, body, category, region, \
     visibility, status, anonymous, boosted, view_count, embargo_ends, reject_reason, \
     created_at, updated_at";

pub(crate) fn map_tip(row: &SqliteRow) -> Result<Tip> {
    let visibility: String = row.get("visibility");
    let visibility = Visibility::parse(&visibility)
        .ok_or_else(|| Error::Internal(format!("Unexpected visibility '{}'", visibility)))?;

    let status: String = row.get("status");
    let status = TipStatus::parse(&status)
        .ok_or_else(|| Error::Internal(format!("Unexpected tip status '{}'", status)))?;

    let guid: String = row.get("guid");
    let author_id: String = row.get("author_id");
    let embargo_ends: Option<String> = row.get("embargo_ends");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Tip {
        guid: parse_uuid(&guid, "tips.guid")?,
        author_id: Some(parse_uuid(&author_id, "tips.author_id")?),
        title: row.get("title"),
        body: row.get("body"),
        category: row.get("category"),
        region: row.get("region"),
        visibility,
        status,
        anonymous: row.get::<i64, _>("anonymous") != 0,
        boosted: row.get::<i64, _>("boosted") != 0,
        view_count: row.get("view_count"),
        embargo_ends: parse_opt_timestamp(embargo_ends, "tips.embargo_ends")?,
        reject_reason: row.get("reject_reason"),
        created_at: parse_timestamp(&created_at, "tips.created_at")?,
        updated_at: parse_timestamp(&updated_at, "tips.updated_at")?,
    })
}

/// Insert a new PENDING tip and return it.
pub async fn insert_tip(pool: &SqlitePool, new: NewTip) -> Result<Tip> {
    let now = Utc::now();
    let tip = Tip {
        guid: Uuid::new_v4(),
        author_id: Some(new.author_id),
        title: new.title,
        body: new.body,
        category: new.category,
        region: new.region,
        visibility: new.visibility,
        status: TipStatus::Pending,
        anonymous: new.anonymous,
        boosted: false,
        view_count: 0,
        embargo_ends: None,
        reject_reason: None,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO tips (
            guid, author_id, title, body, category, region,
            visibility, status, anonymous, boosted, view_count,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, 'PENDING', ?, 0, 0, ?, ?)
        "#,
    )
    .bind(tip.guid.to_string())
    .bind(new.author_id.to_string())
    .bind(&tip.title)
    .bind(&tip.body)
    .bind(&tip.category)
    .bind(&tip.region)
    .bind(tip.visibility.as_str())
    .bind(tip.anonymous as i64)
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(tip)
}

/// Count APPROVED tips matching the filter (for pagination).
pub async fn count_approved(pool: &SqlitePool, filter: &TipFilter) -> Result<i64> {
    let mut sql = String::from("SELECT COUNT(*) FROM tips WHERE status = 'APPROVED'");
    push_filter_clauses(&mut sql, filter);

    let mut query = sqlx::query_scalar(&sql);
    if let Some(category) = &filter.category {
        query = query.bind(category);
    }
    if let Some(region) = &filter.region {
        query = query.bind(region);
    }
    if let Some(visibility) = filter.visibility {
        query = query.bind(visibility.as_str());
    }

    Ok(query.fetch_one(pool).await?)
}

/// List APPROVED tips, boosted first then newest, with per-tip pick counts.
pub async fn list_approved(
    pool: &SqlitePool,
    filter: &TipFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<(Tip, i64)>> {
    let mut sql = format!(
        "SELECT {TIP_COLUMNS}, \
         (SELECT COUNT(*) FROM picks WHERE picks.tip_id = tips.guid) AS pick_count \
         FROM tips WHERE status = 'APPROVED'"
    );
    push_filter_clauses(&mut sql, filter);
    sql.push_str(" ORDER BY boosted DESC, created_at DESC LIMIT ? OFFSET ?");

    let mut query = sqlx::query(&sql);
    if let Some(category) = &filter.category {
        query = query.bind(category);
    }
    if let Some(region) = &filter.region {
        query = query.bind(region);
    }
    if let Some(visibility) = filter.visibility {
        query = query.bind(visibility.as_str());
    }
    let rows = query.bind(limit).bind(offset).fetch_all(pool).await?;

    rows.iter()
        .map(|row| Ok((map_tip(row)?, row.get::<i64, _>("pick_count"))))
        .collect()
}

fn push_filter_clauses(sql: &mut String, filter: &TipFilter) {
    if filter.category.is_some() {
        sql.push_str(" AND category = ?");
    }
    if filter.region.is_some() {
        sql.push_str(" AND region = ?");
    }
    if filter.visibility.is_some() {
        sql.push_str(" AND visibility = ?");
    }
}

/// All tips by one author, any status, newest first.
pub async fn list_by_author(pool: &SqlitePool, author_id: Uuid) -> Result<Vec<Tip>> {
    let sql = format!(
        "SELECT {TIP_COLUMNS} FROM tips WHERE author_id = ? ORDER BY created_at DESC"
    );
    let rows = sqlx::query(&sql)
        .bind(author_id.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(map_tip).collect()
}

pub async fn get_tip(pool: &SqlitePool, tip_id: Uuid) -> Result<Option<Tip>> {
    let sql = format!("SELECT {TIP_COLUMNS} FROM tips WHERE guid = ?");
    let row = sqlx::query(&sql)
        .bind(tip_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(map_tip).transpose()
}

/// Concurrent-safe view counter bump.
pub async fn increment_view_count(pool: &SqlitePool, tip_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE tips SET view_count = view_count + 1 WHERE guid = ?")
        .bind(tip_id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

/// Apply an admin decision. Guarded on PENDING so a concurrent decide loses
/// cleanly; returns false when the guard did not match.
pub async fn decide(
    pool: &SqlitePool,
    tip_id: Uuid,
    decision: ReviewDecision,
    reject_reason: Option<&str>,
) -> Result<bool> {
    let status = match decision {
        ReviewDecision::Approved => TipStatus::Approved,
        ReviewDecision::Rejected => TipStatus::Rejected,
    };

    let result = sqlx::query(
        "UPDATE tips SET status = ?, reject_reason = ?, updated_at = ? \
         WHERE guid = ? AND status = 'PENDING'",
    )
    .bind(status.as_str())
    .bind(reject_reason)
    .bind(Utc::now().to_rfc3339())
    .bind(tip_id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Pick count for a single tip.
pub async fn pick_count(pool: &SqlitePool, tip_id: Uuid) -> Result<i64> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM picks WHERE tip_id = ?")
            .bind(tip_id.to_string())
            .fetch_one(pool)
            .await?,
    )
}
