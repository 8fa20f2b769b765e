//! Confirmed-payment trigger and subscription read API handlers
//!
//! The payment processor integration lives in a collaborator service; this
//! module only consumes its confirmations. Nothing here ever calls out.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tipline_common::db::settings;
use tipline_common::models::{Payment, PaymentKind, Role, Subscription, SubscriptionPlan};
use tipline_common::Error;
use uuid::Uuid;

use crate::api::{ok, Envelope};
use crate::auth::Actor;
use crate::db;
use crate::db::payments::{NewPayment, PaymentOutcome};
use crate::{ApiResult, AppState};

/// POST /api/payments/confirmed request
#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub order_id: String,
    pub amount: i64,
    pub user_id: Uuid,
    /// SUBSCRIPTION or BOOST
    pub kind: String,
    pub tip_id: Option<Uuid>,
}

/// POST /api/payments/confirmed response
#[derive(Debug, Serialize)]
pub struct ConfirmPaymentResponse {
    /// True when this order_id had already been recorded
    pub replayed: bool,
    pub payment: Payment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
}

/// GET /api/subscriptions/me response
#[derive(Debug, Serialize)]
pub struct MySubscriptionResponse {
    #[serde(flatten)]
    pub subscription: Subscription,
    /// Lazily derived; expired windows are reported inactive without a sweep
    pub active: bool,
}

/// Map a confirmed amount to the plan it buys. Ignored for BOOST payments.
fn plan_for_amount(amount: i64, basic: i64, premium: i64) -> SubscriptionPlan {
    if amount >= premium {
        SubscriptionPlan::Premium
    } else if amount >= basic {
        SubscriptionPlan::Basic
    } else {
        SubscriptionPlan::Free
    }
}

/// POST /api/payments/confirmed
///
/// Record a confirmed payment and apply its side effect. Confirmations can
/// arrive more than once; a replayed order_id changes nothing and reports
/// the payment as already recorded.
pub async fn confirm_payment(
    State(state): State<AppState>,
    _actor: Actor,
    Json(request): Json<ConfirmPaymentRequest>,
) -> ApiResult<Json<Envelope<ConfirmPaymentResponse>>> {
    let order_id = request.order_id.trim();
    if order_id.is_empty() {
        return Err(Error::Validation("order_id is required".to_string()).into());
    }
    if request.amount <= 0 {
        return Err(Error::Validation("amount must be positive".to_string()).into());
    }

    let kind = PaymentKind::parse(&request.kind)
        .ok_or_else(|| Error::Validation(format!("unknown payment kind: {}", request.kind)))?;

    if kind == PaymentKind::Boost {
        let tip_id = request
            .tip_id
            .ok_or_else(|| Error::Validation("tip_id is required for BOOST".to_string()))?;
        if db::tips::get_tip(&state.db, tip_id).await?.is_none() {
            return Err(Error::NotFound("tip not found".to_string()).into());
        }
    }

    db::users::ensure_user(&state.db, request.user_id, Role::Informant).await?;

    let basic = settings::plan_basic_amount(&state.db).await?;
    let premium = settings::plan_premium_amount(&state.db).await?;
    let plan = plan_for_amount(request.amount, basic, premium);
    let subscription_days = settings::subscription_days(&state.db).await?;

    let outcome = db::payments::record_confirmed(
        &state.db,
        NewPayment {
            user_id: request.user_id,
            order_id: order_id.to_string(),
            kind,
            amount: request.amount,
            tip_id: request.tip_id,
        },
        plan,
        subscription_days,
    )
    .await?;

    let response = match outcome {
        PaymentOutcome::Recorded {
            payment,
            subscription,
        } => {
            tracing::info!(
                order_id = %payment.order_id,
                user_id = %payment.user_id,
                kind = payment.kind.as_str(),
                amount = payment.amount,
                "Payment recorded"
            );
            ConfirmPaymentResponse {
                replayed: false,
                payment,
                subscription,
            }
        }
        PaymentOutcome::Replayed { payment } => {
            tracing::info!(order_id = %payment.order_id, "Payment confirmation replayed");
            ConfirmPaymentResponse {
                replayed: true,
                payment,
                subscription: None,
            }
        }
    };

    Ok(ok(response))
}

/// GET /api/subscriptions/me
pub async fn my_subscription(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Json<Envelope<MySubscriptionResponse>>> {
    let subscription = db::payments::latest_subscription(&state.db, actor.id)
        .await?
        .ok_or_else(|| Error::NotFound("no subscription".to_string()))?;

    let active = subscription.is_active(chrono::Utc::now());

    Ok(ok(MySubscriptionResponse {
        subscription,
        active,
    }))
}

/// Build payment routes
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/api/payments/confirmed", post(confirm_payment))
        .route("/api/subscriptions/me", get(my_subscription))
}
