//! Reputation score API handlers

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tipline_common::db::settings;
use tipline_common::models::{Reputation, ReputationEventKind};
use tipline_common::Error;
use uuid::Uuid;

use crate::api::{ok, Envelope};
use crate::auth::Actor;
use crate::db;
use crate::{ApiResult, AppState};

/// POST /api/reputation/events request
#[derive(Debug, Deserialize)]
pub struct IngestEventRequest {
    pub user_id: Uuid,
    pub kind: String,
    pub pick_id: Option<Uuid>,
}

/// POST /api/reputation/events response
#[derive(Debug, Serialize)]
pub struct IngestEventResponse {
    /// False when the (pick, kind) pair was already recorded
    pub applied: bool,
    pub reputation: Reputation,
    /// "degraded" when the event committed but its audit row did not
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit: Option<String>,
}

/// GET /api/reputation/{user_id}
///
/// Public score card. NotFound until the user has been provisioned by a
/// verification approval or a first event.
pub async fn get_reputation(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<Reputation>>> {
    let reputation = db::reputation::get(&state.db, user_id)
        .await?
        .ok_or_else(|| Error::NotFound("no reputation record".to_string()))?;

    Ok(ok(reputation))
}

/// GET /api/reputation/me
pub async fn my_reputation(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Json<Envelope<Reputation>>> {
    let reputation = db::reputation::get(&state.db, actor.id)
        .await?
        .ok_or_else(|| Error::NotFound("no reputation record".to_string()))?;

    Ok(ok(reputation))
}

/// POST /api/reputation/events
///
/// Admin ingestion for externally-observed events. ARTICLE_COMPLETED is
/// awarded by the completion endpoint and cannot be submitted here.
/// Claim-scoped kinds are idempotent per (pick, kind); a replay reports
/// `applied: false` without touching the score.
pub async fn ingest_event(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<IngestEventRequest>,
) -> ApiResult<Json<Envelope<IngestEventResponse>>> {
    if !actor.role.can_review() {
        return Err(Error::Permission("admin role required".to_string()).into());
    }

    let kind = ReputationEventKind::parse(&request.kind)
        .ok_or_else(|| Error::Validation(format!("unknown event kind: {}", request.kind)))?;
    if kind == ReputationEventKind::ArticleCompleted {
        return Err(Error::Validation(
            "ARTICLE_COMPLETED is awarded internally on completion".to_string(),
        )
        .into());
    }

    if db::users::get_role(&state.db, request.user_id).await?.is_none() {
        return Err(Error::NotFound("user not found".to_string()).into());
    }

    let pick_id = if kind.is_claim_scoped() {
        let pick_id = request.pick_id.ok_or_else(|| {
            Error::Validation(format!("pick_id is required for {}", kind.as_str()))
        })?;
        let pick = db::picks::get_by_id(&state.db, pick_id)
            .await?
            .ok_or_else(|| Error::NotFound("pick not found".to_string()))?;
        if pick.reporter_id != request.user_id {
            return Err(
                Error::Validation("pick does not belong to this user".to_string()).into(),
            );
        }
        Some(pick_id)
    } else {
        // Moderation events are not tied to a claim.
        None
    };

    let delta = settings::reputation_delta(&state.db, kind).await?;
    let applied =
        db::reputation::apply_event(&state.db, request.user_id, pick_id, kind, delta).await?;

    tracing::info!(
        user_id = %request.user_id,
        kind = kind.as_str(),
        delta,
        applied,
        "Reputation event ingested"
    );

    let audit = match db::audit::append(
        &state.db,
        "REPUTATION_EVENT",
        "USER",
        request.user_id,
        Some(&format!("{} delta {}", kind.as_str(), delta)),
        actor.id,
        Some(request.user_id),
    )
    .await
    {
        Ok(()) => None,
        Err(e) => {
            tracing::error!(user_id = %request.user_id, error = %e, "Audit append failed");
            Some("degraded".to_string())
        }
    };

    let reputation = db::reputation::get(&state.db, request.user_id)
        .await?
        .ok_or_else(|| Error::Internal("reputation row missing after event".to_string()))?;

    Ok(ok(IngestEventResponse {
        applied,
        reputation,
        audit,
    }))
}

/// Build reputation routes
pub fn reputation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/reputation/me", get(my_reputation))
        .route("/api/reputation/:user_id", get(get_reputation))
        .route("/api/reputation/events", post(ingest_event))
}
