//! Claim (pick) API handlers

use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tipline_common::db::settings;
use tipline_common::embargo::is_embargo_active;
use tipline_common::models::{Pick, ReputationEventKind, Tip, TipStatus, VerifyStatus, Visibility};
use tipline_common::Error;
use uuid::Uuid;

use crate::api::{ok, Envelope};
use crate::auth::Actor;
use crate::db;
use crate::{ApiResult, AppState};

/// POST /api/picks request
#[derive(Debug, Deserialize)]
pub struct CreatePickRequest {
    pub tip_id: Uuid,
    pub proposal: Option<String>,
}

/// POST /api/picks response
#[derive(Debug, Serialize)]
pub struct CreatePickResponse {
    #[serde(flatten)]
    pub pick: Pick,
    /// True iff this claim armed the exclusivity window
    pub embargo_set: bool,
    pub embargo_ends: Option<DateTime<Utc>>,
}

/// One pick with its tip in GET /api/picks
#[derive(Debug, Serialize)]
pub struct PickWithTip {
    #[serde(flatten)]
    pub pick: Pick,
    pub tip: Tip,
}

/// GET /api/picks response
#[derive(Debug, Serialize)]
pub struct MyPicksResponse {
    pub picks: Vec<PickWithTip>,
}

/// GET /api/tips/{id}/picks response
#[derive(Debug, Serialize)]
pub struct TipPicksResponse {
    pub picks: Vec<Pick>,
}

/// PUT /api/picks/{tip_id} request
#[derive(Debug, Deserialize)]
pub struct UpdatePickRequest {
    pub completed: bool,
    pub article_url: Option<String>,
}

/// PUT /api/picks/{tip_id} response
#[derive(Debug, Serialize)]
pub struct UpdatePickResponse {
    #[serde(flatten)]
    pub pick: Pick,
    /// True iff this call awarded the completion reputation event
    pub reputation_applied: bool,
}

/// DELETE /api/picks/{tip_id} response
#[derive(Debug, Serialize)]
pub struct WithdrawPickResponse {
    pub status: String,
}

/// Reporter gate shared by the claim endpoints: role claim plus an APPROVED
/// verification on record. The header role alone is never sufficient.
async fn require_verified_reporter(state: &AppState, actor: &Actor) -> Result<(), Error> {
    if !actor.role.can_claim() {
        return Err(Error::Permission("reporter role required".to_string()));
    }
    let verification = db::verifications::get_by_user(&state.db, actor.id).await?;
    match verification {
        Some(v) if v.status == VerifyStatus::Approved => Ok(()),
        _ => Err(Error::Permission(
            "approved verification required".to_string(),
        )),
    }
}

/// POST /api/picks
///
/// Claim a tip. For EXCLUSIVE tips the first claim arms the embargo window;
/// the insert and the arming commit together.
pub async fn create_pick(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreatePickRequest>,
) -> ApiResult<Json<Envelope<CreatePickResponse>>> {
    require_verified_reporter(&state, &actor).await?;

    let tip = db::tips::get_tip(&state.db, request.tip_id)
        .await?
        .ok_or_else(|| Error::NotFound("tip not found".to_string()))?;

    if tip.status != TipStatus::Approved {
        return Err(Error::InvalidState("tip is not approved".to_string()).into());
    }

    if is_embargo_active(tip.visibility, tip.embargo_ends, Utc::now())
        && !db::picks::has_pick(&state.db, actor.id, tip.guid).await?
    {
        return Err(Error::Conflict("tip is under an exclusive claim".to_string()).into());
    }

    let embargo_hours = settings::embargo_hours(&state.db).await?;
    let outcome = db::picks::create_claim(
        &state.db,
        actor.id,
        tip.guid,
        request.proposal,
        tip.visibility == Visibility::Exclusive,
        embargo_hours,
    )
    .await?;

    tracing::info!(
        tip_id = %tip.guid,
        reporter_id = %actor.id,
        embargo_set = outcome.embargo_set,
        "Tip claimed"
    );

    Ok(ok(CreatePickResponse {
        pick: outcome.pick,
        embargo_set: outcome.embargo_set,
        embargo_ends: outcome.embargo_ends,
    }))
}

/// GET /api/picks
pub async fn my_picks(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Json<Envelope<MyPicksResponse>>> {
    let rows = db::picks::list_by_reporter(&state.db, actor.id).await?;

    let picks = rows
        .into_iter()
        .map(|(pick, mut tip)| {
            tip.redact_author_for(Some(actor.id));
            PickWithTip { pick, tip }
        })
        .collect();

    Ok(ok(MyPicksResponse { picks }))
}

/// GET /api/tips/{id}/picks
///
/// Claims on a tip, oldest first. Reporter identity is never redacted here;
/// claims are public commitments. Restricted to the tip author, admins, and
/// reporters.
pub async fn tip_picks(
    State(state): State<AppState>,
    actor: Actor,
    Path(tip_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<TipPicksResponse>>> {
    let tip = db::tips::get_tip(&state.db, tip_id)
        .await?
        .ok_or_else(|| Error::NotFound("tip not found".to_string()))?;

    let allowed =
        tip.is_authored_by(Some(actor.id)) || actor.role.can_review() || actor.role.can_claim();
    if !allowed {
        return Err(Error::Permission("not allowed to view picks".to_string()).into());
    }

    let picks = db::picks::list_for_tip(&state.db, tip_id).await?;
    Ok(ok(TipPicksResponse { picks }))
}

/// PUT /api/picks/{tip_id}
///
/// Completion update. The first transition to completed awards the
/// ARTICLE_COMPLETED reputation event exactly once; repeating the call is a
/// no-op success. Completion cannot be reverted.
pub async fn update_pick(
    State(state): State<AppState>,
    actor: Actor,
    Path(tip_id): Path<Uuid>,
    Json(request): Json<UpdatePickRequest>,
) -> ApiResult<Json<Envelope<UpdatePickResponse>>> {
    let pick = db::picks::get_pick(&state.db, actor.id, tip_id)
        .await?
        .ok_or_else(|| Error::NotFound("no pick on this tip".to_string()))?;

    if !request.completed {
        if pick.completed {
            return Err(Error::InvalidState("completion is terminal".to_string()).into());
        }
        return Ok(ok(UpdatePickResponse {
            pick,
            reputation_applied: false,
        }));
    }

    let article_url = request
        .article_url
        .as_deref()
        .map(str::trim)
        .unwrap_or("");
    if article_url.is_empty() {
        return Err(Error::Validation("article_url is required".to_string()).into());
    }

    let delta =
        settings::reputation_delta(&state.db, ReputationEventKind::ArticleCompleted).await?;
    let outcome = db::picks::complete_pick(&state.db, &pick, article_url, delta).await?;

    if outcome.reputation_applied {
        tracing::info!(
            tip_id = %tip_id,
            reporter_id = %actor.id,
            delta,
            "Pick completed, reputation awarded"
        );
    }

    Ok(ok(UpdatePickResponse {
        pick: outcome.pick,
        reputation_applied: outcome.reputation_applied,
    }))
}

/// DELETE /api/picks/{tip_id}
///
/// Withdraw a claim. An armed embargo stays armed; withdrawing does not
/// reopen the window.
pub async fn withdraw_pick(
    State(state): State<AppState>,
    actor: Actor,
    Path(tip_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<WithdrawPickResponse>>> {
    let deleted = db::picks::delete_pick(&state.db, actor.id, tip_id).await?;
    if !deleted {
        return Err(Error::NotFound("no pick on this tip".to_string()).into());
    }

    tracing::info!(tip_id = %tip_id, reporter_id = %actor.id, "Pick withdrawn");

    Ok(ok(WithdrawPickResponse {
        status: "withdrawn".to_string(),
    }))
}

/// Build pick routes
pub fn pick_routes() -> Router<AppState> {
    Router::new()
        .route("/api/picks", post(create_pick))
        .route("/api/picks", get(my_picks))
        .route("/api/picks/:tip_id", put(update_pick))
        .route("/api/picks/:tip_id", delete(withdraw_pick))
        .route("/api/tips/:id/picks", get(tip_picks))
}
