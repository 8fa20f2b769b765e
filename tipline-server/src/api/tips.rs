//! Tip submission, listing, detail, and review API handlers

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tipline_common::embargo::{embargo_status, EmbargoStatus};
use tipline_common::models::{ReviewDecision, Tip, TipStatus, Visibility};
use tipline_common::pagination::calculate_pagination;
use tipline_common::Error;
use uuid::Uuid;

use crate::api::{ok, Envelope, PageMeta};
use crate::auth::{Actor, MaybeActor};
use crate::db;
use crate::{ApiResult, AppState};

/// POST /api/tips request
#[derive(Debug, Deserialize)]
pub struct CreateTipRequest {
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    pub region: Option<String>,
    /// OPEN or EXCLUSIVE; defaults to OPEN
    pub visibility: Option<String>,
    /// Defaults to true; submitters stay anonymous unless they opt out
    pub anonymous: Option<bool>,
}

/// GET /api/tips query parameters
#[derive(Debug, Deserialize)]
pub struct ListTipsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<String>,
    pub region: Option<String>,
    pub visibility: Option<String>,
}

/// One tip in a list response, with its claim count
#[derive(Debug, Serialize)]
pub struct TipSummary {
    #[serde(flatten)]
    pub tip: Tip,
    pub pick_count: i64,
}

/// GET /api/tips response
#[derive(Debug, Serialize)]
pub struct TipListResponse {
    pub tips: Vec<TipSummary>,
    pub pagination: PageMeta,
}

/// GET /api/tips/mine response
#[derive(Debug, Serialize)]
pub struct MyTipsResponse {
    pub tips: Vec<Tip>,
}

/// GET /api/tips/{id} response
#[derive(Debug, Serialize)]
pub struct TipDetailResponse {
    #[serde(flatten)]
    pub tip: Tip,
    pub pick_count: i64,
    /// Present for EXCLUSIVE tips with an armed window, null otherwise
    pub embargo: Option<EmbargoStatus>,
}

/// PUT /api/tips/{id}/status request
#[derive(Debug, Deserialize)]
pub struct DecideTipRequest {
    pub decision: String,
    pub reject_reason: Option<String>,
}

/// PUT /api/tips/{id}/status response
#[derive(Debug, Serialize)]
pub struct DecideTipResponse {
    pub status: String,
    /// "degraded" when the decision committed but its audit row did not
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit: Option<String>,
}

fn parse_visibility(raw: &str) -> Result<Visibility, Error> {
    Visibility::parse(raw)
        .ok_or_else(|| Error::Validation(format!("invalid visibility: {raw}")))
}

/// POST /api/tips
///
/// Submit a tip. Every submission enters the review queue as PENDING.
pub async fn create_tip(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateTipRequest>,
) -> ApiResult<Json<Envelope<Tip>>> {
    let title = request.title.trim();
    let body = request.body.trim();
    if title.is_empty() {
        return Err(Error::Validation("title is required".to_string()).into());
    }
    if body.is_empty() {
        return Err(Error::Validation("body is required".to_string()).into());
    }

    let visibility = match request.visibility.as_deref() {
        Some(raw) => parse_visibility(raw)?,
        None => Visibility::Open,
    };

    db::users::ensure_user(&state.db, actor.id, actor.role).await?;

    let tip = db::tips::insert_tip(
        &state.db,
        db::tips::NewTip {
            author_id: actor.id,
            title: title.to_string(),
            body: body.to_string(),
            category: request.category,
            region: request.region,
            visibility,
            anonymous: request.anonymous.unwrap_or(true),
        },
    )
    .await?;

    tracing::info!(tip_id = %tip.guid, visibility = visibility.as_str(), "Tip submitted");

    Ok(ok(tip))
}

/// GET /api/tips
///
/// List APPROVED tips, boosted first then newest. Anonymous tips have their
/// author hidden from everyone but the author.
pub async fn list_tips(
    State(state): State<AppState>,
    actor: MaybeActor,
    Query(query): Query<ListTipsQuery>,
) -> ApiResult<Json<Envelope<TipListResponse>>> {
    let filter = db::tips::TipFilter {
        category: query.category,
        region: query.region,
        visibility: query
            .visibility
            .as_deref()
            .map(parse_visibility)
            .transpose()?,
    };

    let total = db::tips::count_approved(&state.db, &filter).await?;
    let pagination = calculate_pagination(total, query.page.unwrap_or(1), query.limit);

    let rows =
        db::tips::list_approved(&state.db, &filter, pagination.page_size, pagination.offset)
            .await?;

    let tips = rows
        .into_iter()
        .map(|(mut tip, pick_count)| {
            tip.redact_author_for(actor.id());
            TipSummary { tip, pick_count }
        })
        .collect();

    Ok(ok(TipListResponse {
        tips,
        pagination: PageMeta::new(pagination, total),
    }))
}

/// GET /api/tips/mine
pub async fn my_tips(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Json<Envelope<MyTipsResponse>>> {
    let tips = db::tips::list_by_author(&state.db, actor.id).await?;
    Ok(ok(MyTipsResponse { tips }))
}

/// GET /api/tips/{id}
///
/// Tip detail. Undecided and rejected tips are visible only to their author
/// and admins; everyone else gets NotFound so existence is not leaked. While
/// an exclusivity window is active the detail is reserved for the author,
/// admins, and reporters holding a pick.
pub async fn tip_detail(
    State(state): State<AppState>,
    actor: MaybeActor,
    Path(tip_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<TipDetailResponse>>> {
    let mut tip = db::tips::get_tip(&state.db, tip_id)
        .await?
        .ok_or_else(|| Error::NotFound("tip not found".to_string()))?;

    let viewer = actor.id();
    if tip.status != TipStatus::Approved && !tip.is_authored_by(viewer) && !actor.is_admin() {
        return Err(Error::NotFound("tip not found".to_string()).into());
    }

    let embargo = embargo_status(tip.visibility, tip.embargo_ends, chrono::Utc::now());
    if embargo.as_ref().is_some_and(|e| e.active)
        && !tip.is_authored_by(viewer)
        && !actor.is_admin()
    {
        let holds_pick = match viewer {
            Some(id) => db::picks::has_pick(&state.db, id, tip_id).await?,
            None => false,
        };
        if !holds_pick {
            return Err(Error::Permission("under exclusive embargo".to_string()).into());
        }
    }

    db::tips::increment_view_count(&state.db, tip_id).await?;
    tip.view_count += 1;

    let pick_count = db::tips::pick_count(&state.db, tip_id).await?;
    tip.redact_author_for(viewer);

    Ok(ok(TipDetailResponse {
        tip,
        pick_count,
        embargo,
    }))
}

/// PUT /api/tips/{id}/status
///
/// Admin review decision. The status transition commits first; the audit row
/// follows, and a failed append degrades the response instead of undoing the
/// decision.
pub async fn decide_tip(
    State(state): State<AppState>,
    actor: Actor,
    Path(tip_id): Path<Uuid>,
    Json(request): Json<DecideTipRequest>,
) -> ApiResult<Json<Envelope<DecideTipResponse>>> {
    if !actor.role.can_review() {
        return Err(Error::Permission("admin role required".to_string()).into());
    }

    let tip = db::tips::get_tip(&state.db, tip_id)
        .await?
        .ok_or_else(|| Error::NotFound("tip not found".to_string()))?;

    let decision = ReviewDecision::parse(&request.decision).ok_or_else(|| {
        Error::Validation(format!(
            "decision must be APPROVED or REJECTED, got: {}",
            request.decision
        ))
    })?;

    let reject_reason = match decision {
        ReviewDecision::Rejected => {
            let reason = request
                .reject_reason
                .as_deref()
                .map(str::trim)
                .unwrap_or("");
            if reason.is_empty() {
                return Err(
                    Error::Validation("reject_reason is required for REJECTED".to_string()).into(),
                );
            }
            Some(reason.to_string())
        }
        ReviewDecision::Approved => None,
    };

    let decided =
        db::tips::decide(&state.db, tip_id, decision, reject_reason.as_deref()).await?;
    if !decided {
        return Err(Error::InvalidState("tip already decided".to_string()).into());
    }

    let (action, status) = match decision {
        ReviewDecision::Approved => ("TIP_APPROVED", TipStatus::Approved),
        ReviewDecision::Rejected => ("TIP_REJECTED", TipStatus::Rejected),
    };
    tracing::info!(tip_id = %tip_id, action, "Tip decided");

    let audit = match db::audit::append(
        &state.db,
        action,
        "TIP",
        tip_id,
        reject_reason.as_deref(),
        actor.id,
        tip.author_id,
    )
    .await
    {
        Ok(()) => None,
        Err(e) => {
            tracing::error!(tip_id = %tip_id, error = %e, "Audit append failed after decision");
            Some("degraded".to_string())
        }
    };

    Ok(ok(DecideTipResponse {
        status: status.as_str().to_string(),
        audit,
    }))
}

/// Build tip routes
pub fn tip_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tips", post(create_tip))
        .route("/api/tips", get(list_tips))
        .route("/api/tips/mine", get(my_tips))
        .route("/api/tips/:id", get(tip_detail))
        .route("/api/tips/:id/status", put(decide_tip))
}
