//! Confirmed payments and the subscriptions they open

use chrono::{Duration, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tipline_common::models::{Payment, PaymentKind, Subscription, SubscriptionPlan, SubscriptionStatus};
use tipline_common::{Error, Result};
use uuid::Uuid;

use super::{parse_opt_timestamp, parse_opt_uuid, parse_timestamp, parse_uuid};

const PAYMENT_COLUMNS: &str = "guid, user_id, order_id, kind, amount, tip_id, created_at";

fn map_payment(row: &SqliteRow) -> Result<Payment> {
    let guid: String = row.get("guid");
    let user_id: String = row.get("user_id");
    let kind: String = row.get("kind");
    let tip_id: Option<String> = row.get("tip_id");
    let created_at: String = row.get("created_at");

    Ok(Payment {
        guid: parse_uuid(&guid, "payments.guid")?,
        user_id: parse_uuid(&user_id, "payments.user_id")?,
        order_id: row.get("order_id"),
        kind: PaymentKind::parse(&kind)
            .ok_or_else(|| Error::Internal(format!("unexpected payment kind: {kind}")))?,
        amount: row.get("amount"),
        tip_id: parse_opt_uuid(tip_id, "payments.tip_id")?,
        created_at: parse_timestamp(&created_at, "payments.created_at")?,
    })
}

fn map_subscription(row: &SqliteRow) -> Result<Subscription> {
    let guid: String = row.get("guid");
    let user_id: String = row.get("user_id");
    let plan: String = row.get("plan");
    let status: String = row.get("status");
    let started_at: String = row.get("started_at");
    let ends_at: Option<String> = row.get("ends_at");
    let created_at: String = row.get("created_at");

    Ok(Subscription {
        guid: parse_uuid(&guid, "subscriptions.guid")?,
        user_id: parse_uuid(&user_id, "subscriptions.user_id")?,
        plan: SubscriptionPlan::parse(&plan)
            .ok_or_else(|| Error::Internal(format!("unexpected subscription plan: {plan}")))?,
        status: SubscriptionStatus::parse(&status)
            .ok_or_else(|| Error::Internal(format!("unexpected subscription status: {status}")))?,
        started_at: parse_timestamp(&started_at, "subscriptions.started_at")?,
        ends_at: parse_opt_timestamp(ends_at, "subscriptions.ends_at")?,
        created_at: parse_timestamp(&created_at, "subscriptions.created_at")?,
    })
}

pub async fn get_by_order_id(pool: &SqlitePool, order_id: &str) -> Result<Option<Payment>> {
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = ?");
    let row = sqlx::query(&sql)
        .bind(order_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(map_payment).transpose()
}

/// A confirmed payment waiting to be recorded.
#[derive(Debug)]
pub struct NewPayment {
    pub user_id: Uuid,
    pub order_id: String,
    pub kind: PaymentKind,
    pub amount: i64,
    pub tip_id: Option<Uuid>,
}

/// What recording a confirmation did.
#[derive(Debug)]
pub enum PaymentOutcome {
    /// First sighting of this order: payment stored, side effect applied.
    Recorded {
        payment: Payment,
        subscription: Option<Subscription>,
    },
    /// The order was already recorded; nothing changed.
    Replayed { payment: Payment },
}

/// Record a confirmed payment and apply its side effect, exactly once.
///
/// The UNIQUE(order_id) index is the replay guard: a second confirmation for
/// the same order hits it, the transaction aborts before any side effect,
/// and the original payment row is returned unchanged. SUBSCRIPTION opens a
/// plan window of `subscription_days`; BOOST flags the referenced tip.
pub async fn record_confirmed(
    pool: &SqlitePool,
    new: NewPayment,
    plan: SubscriptionPlan,
    subscription_days: i64,
) -> Result<PaymentOutcome> {
    let now = Utc::now();
    let payment = Payment {
        guid: Uuid::new_v4(),
        user_id: new.user_id,
        order_id: new.order_id,
        kind: new.kind,
        amount: new.amount,
        tip_id: new.tip_id,
        created_at: now,
    };

    let mut tx = pool.begin().await?;

    let insert = sqlx::query(
        r#"
        INSERT INTO payments (guid, user_id, order_id, kind, amount, tip_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payment.guid.to_string())
    .bind(payment.user_id.to_string())
    .bind(&payment.order_id)
    .bind(payment.kind.as_str())
    .bind(payment.amount)
    .bind(payment.tip_id.map(|id| id.to_string()))
    .bind(now.to_rfc3339())
    .execute(&mut *tx)
    .await;

    if let Err(e) = insert {
        let e = Error::Database(e);
        if e.is_unique_violation() {
            tx.rollback().await?;
            let existing = get_by_order_id(pool, &payment.order_id).await?.ok_or_else(|| {
                Error::Internal("payment vanished after unique violation".to_string())
            })?;
            return Ok(PaymentOutcome::Replayed { payment: existing });
        }
        return Err(e);
    }

    let mut subscription = None;
    match payment.kind {
        PaymentKind::Subscription => {
            let sub = Subscription {
                guid: Uuid::new_v4(),
                user_id: payment.user_id,
                plan,
                status: SubscriptionStatus::Active,
                started_at: now,
                ends_at: Some(now + Duration::days(subscription_days)),
                created_at: now,
            };
            sqlx::query(
                r#"
                INSERT INTO subscriptions (guid, user_id, plan, status, started_at, ends_at, created_at)
                VALUES (?, ?, ?, 'ACTIVE', ?, ?, ?)
                "#,
            )
            .bind(sub.guid.to_string())
            .bind(sub.user_id.to_string())
            .bind(sub.plan.as_str())
            .bind(sub.started_at.to_rfc3339())
            .bind(sub.ends_at.map(|t| t.to_rfc3339()))
            .bind(sub.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
            subscription = Some(sub);
        }
        PaymentKind::Boost => {
            if let Some(tip_id) = payment.tip_id {
                sqlx::query("UPDATE tips SET boosted = 1, updated_at = ? WHERE guid = ?")
                    .bind(now.to_rfc3339())
                    .bind(tip_id.to_string())
                    .execute(&mut *tx)
                    .await?;
            }
        }
    }

    tx.commit().await?;

    Ok(PaymentOutcome::Recorded {
        payment,
        subscription,
    })
}

/// The user's most recently started subscription, if any.
pub async fn latest_subscription(pool: &SqlitePool, user_id: Uuid) -> Result<Option<Subscription>> {
    let row = sqlx::query(
        "SELECT guid, user_id, plan, status, started_at, ends_at, created_at \
         FROM subscriptions WHERE user_id = ? \
         ORDER BY started_at DESC, created_at DESC LIMIT 1",
    )
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(map_subscription).transpose()
}
