//! Pick (claim) ledger operations
//!
//! The two race-sensitive writes live here: claim creation with embargo
//! arming, and completion with its single reputation award. Both rely on
//! store-level guards (unique index, conditional UPDATE) rather than
//! read-then-write, so they stay correct across multiple server instances.

use chrono::{DateTime, Duration, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tipline_common::models::{Pick, ReputationEventKind, Tip};
use tipline_common::{Error, Result};
use uuid::Uuid;

use super::tips::map_tip;
use super::{parse_timestamp, parse_uuid};

const PICK_COLUMNS: &str = "guid, reporter_id, tip_id, proposal, accepted, completed, \
     article_url, created_at, updated_at";

fn map_pick(row: &SqliteRow) -> Result<Pick> {
    let guid: String = row.get("guid");
    let reporter_id: String = row.get("reporter_id");
    let tip_id: String = row.get("tip_id");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Pick {
        guid: parse_uuid(&guid, "picks.guid")?,
        reporter_id: parse_uuid(&reporter_id, "picks.reporter_id")?,
        tip_id: parse_uuid(&tip_id, "picks.tip_id")?,
        proposal: row.get("proposal"),
        accepted: row.get::<i64, _>("accepted") != 0,
        completed: row.get::<i64, _>("completed") != 0,
        article_url: row.get("article_url"),
        created_at: parse_timestamp(&created_at, "picks.created_at")?,
        updated_at: parse_timestamp(&updated_at, "picks.updated_at")?,
    })
}

/// Result of a claim attempt.
#[derive(Debug)]
pub struct ClaimOutcome {
    pub pick: Pick,
    /// True iff this claim armed the exclusivity window.
    pub embargo_set: bool,
    pub embargo_ends: Option<DateTime<Utc>>,
}

/// Create a claim, arming the embargo for EXCLUSIVE tips.
///
/// Single transaction. The pick INSERT hits the UNIQUE(reporter_id, tip_id)
/// index on duplicates; the embargo UPDATE is a compare-and-swap keyed on
/// `embargo_ends IS NULL`, so under any interleaving at most one claim
/// observes `embargo_set == true`.
pub async fn create_claim(
    pool: &SqlitePool,
    reporter_id: Uuid,
    tip_id: Uuid,
    proposal: Option<String>,
    arm_embargo: bool,
    embargo_hours: i64,
) -> Result<ClaimOutcome> {
    let now = Utc::now();
    let pick = Pick {
        guid: Uuid::new_v4(),
        reporter_id,
        tip_id,
        proposal,
        accepted: false,
        completed: false,
        article_url: None,
        created_at: now,
        updated_at: now,
    };

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO picks (guid, reporter_id, tip_id, proposal, accepted, completed,
                           created_at, updated_at)
        VALUES (?, ?, ?, ?, 0, 0, ?, ?)
        "#,
    )
    .bind(pick.guid.to_string())
    .bind(reporter_id.to_string())
    .bind(tip_id.to_string())
    .bind(&pick.proposal)
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        let e = Error::Database(e);
        if e.is_unique_violation() {
            Error::Conflict("tip already picked by this reporter".to_string())
        } else {
            e
        }
    })?;

    let mut embargo_set = false;
    let mut embargo_ends = None;
    if arm_embargo {
        let deadline = now + Duration::hours(embargo_hours);
        let result = sqlx::query(
            "UPDATE tips SET embargo_ends = ?, updated_at = ? \
             WHERE guid = ? AND embargo_ends IS NULL",
        )
        .bind(deadline.to_rfc3339())
        .bind(now.to_rfc3339())
        .bind(tip_id.to_string())
        .execute(&mut *tx)
        .await?;

        embargo_set = result.rows_affected() == 1;
        if embargo_set {
            embargo_ends = Some(deadline);
        }
    }

    tx.commit().await?;

    Ok(ClaimOutcome {
        pick,
        embargo_set,
        embargo_ends,
    })
}

/// Result of a completion update.
#[derive(Debug)]
pub struct CompletionOutcome {
    pub pick: Pick,
    /// True iff this call performed the first false→true transition and
    /// awarded reputation.
    pub reputation_applied: bool,
}

/// Mark a pick completed and award reputation exactly once.
///
/// The conditional UPDATE (`completed = 0`) and the ledger's
/// UNIQUE(pick_id, kind) index both guard the single award; repeated calls
/// succeed without re-awarding.
pub async fn complete_pick(
    pool: &SqlitePool,
    pick: &Pick,
    article_url: &str,
    delta: i64,
) -> Result<CompletionOutcome> {
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let flipped = sqlx::query(
        "UPDATE picks SET completed = 1, article_url = ?, updated_at = ? \
         WHERE guid = ? AND completed = 0",
    )
    .bind(article_url)
    .bind(now.to_rfc3339())
    .bind(pick.guid.to_string())
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let mut reputation_applied = false;
    if flipped == 1 {
        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO reputation_events (user_id, pick_id, kind, delta, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(pick.reporter_id.to_string())
        .bind(pick.guid.to_string())
        .bind(ReputationEventKind::ArticleCompleted.as_str())
        .bind(delta)
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 1 {
            sqlx::query(
                r#"
                INSERT INTO reputation (user_id, score, articles_count, last_active_at, updated_at)
                VALUES (?, ?, 1, ?, ?)
                ON CONFLICT(user_id) DO UPDATE SET
                    score = score + excluded.score,
                    articles_count = articles_count + 1,
                    last_active_at = excluded.last_active_at,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(pick.reporter_id.to_string())
            .bind(delta)
            .bind(now.to_rfc3339())
            .bind(now.to_rfc3339())
            .execute(&mut *tx)
            .await?;

            reputation_applied = true;
        }
    }

    tx.commit().await?;

    let mut updated = pick.clone();
    if flipped == 1 {
        updated.completed = true;
        updated.article_url = Some(article_url.to_string());
        updated.updated_at = now;
    }

    Ok(CompletionOutcome {
        pick: updated,
        reputation_applied,
    })
}

pub async fn get_by_id(pool: &SqlitePool, pick_id: Uuid) -> Result<Option<Pick>> {
    let sql = format!("SELECT {PICK_COLUMNS} FROM picks WHERE guid = ?");
    let row = sqlx::query(&sql)
        .bind(pick_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(map_pick).transpose()
}

/// A reporter's pick on one tip, if any.
pub async fn get_pick(pool: &SqlitePool, reporter_id: Uuid, tip_id: Uuid) -> Result<Option<Pick>> {
    let sql = format!("SELECT {PICK_COLUMNS} FROM picks WHERE reporter_id = ? AND tip_id = ?");
    let row = sqlx::query(&sql)
        .bind(reporter_id.to_string())
        .bind(tip_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(map_pick).transpose()
}

/// True if the reporter holds any pick on the tip (embargo read gate).
pub async fn has_pick(pool: &SqlitePool, reporter_id: Uuid, tip_id: Uuid) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM picks WHERE reporter_id = ? AND tip_id = ?)",
    )
    .bind(reporter_id.to_string())
    .bind(tip_id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// All of one reporter's picks, newest first, with the picked tip.
///
/// Pick columns are aliased `p_*`; tip columns keep their bare names so
/// [`map_tip`] can read the joined row directly.
pub async fn list_by_reporter(pool: &SqlitePool, reporter_id: Uuid) -> Result<Vec<(Pick, Tip)>> {
    let rows = sqlx::query(
        r#"
        SELECT p.guid AS p_guid, p.reporter_id AS p_reporter_id, p.tip_id AS p_tip_id,
               p.proposal AS p_proposal, p.accepted AS p_accepted, p.completed AS p_completed,
               p.article_url AS p_article_url, p.created_at AS p_created_at,
               p.updated_at AS p_updated_at,
               t.guid, t.author_id, t.title, t.body, t.category, t.region,
               t.visibility, t.status, t.anonymous, t.boosted, t.view_count,
               t.embargo_ends, t.reject_reason, t.created_at, t.updated_at
        FROM picks p
        JOIN tips t ON t.guid = p.tip_id
        WHERE p.reporter_id = ?
        ORDER BY p.created_at DESC
        "#,
    )
    .bind(reporter_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let p_guid: String = row.get("p_guid");
            let p_reporter: String = row.get("p_reporter_id");
            let p_tip: String = row.get("p_tip_id");
            let p_created: String = row.get("p_created_at");
            let p_updated: String = row.get("p_updated_at");
            let pick = Pick {
                guid: parse_uuid(&p_guid, "picks.guid")?,
                reporter_id: parse_uuid(&p_reporter, "picks.reporter_id")?,
                tip_id: parse_uuid(&p_tip, "picks.tip_id")?,
                proposal: row.get("p_proposal"),
                accepted: row.get::<i64, _>("p_accepted") != 0,
                completed: row.get::<i64, _>("p_completed") != 0,
                article_url: row.get("p_article_url"),
                created_at: parse_timestamp(&p_created, "picks.created_at")?,
                updated_at: parse_timestamp(&p_updated, "picks.updated_at")?,
            };
            Ok((pick, map_tip(row)?))
        })
        .collect()
}

/// All picks on one tip, oldest first (claim order).
pub async fn list_for_tip(pool: &SqlitePool, tip_id: Uuid) -> Result<Vec<Pick>> {
    let sql = format!("SELECT {PICK_COLUMNS} FROM picks WHERE tip_id = ? ORDER BY created_at ASC");
    let rows = sqlx::query(&sql)
        .bind(tip_id.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(map_pick).collect()
}

/// Withdraw a reporter's claim. The armed embargo, if any, stays put.
pub async fn delete_pick(pool: &SqlitePool, reporter_id: Uuid, tip_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM picks WHERE reporter_id = ? AND tip_id = ?")
        .bind(reporter_id.to_string())
        .bind(tip_id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
