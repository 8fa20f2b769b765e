//! Reporter verification API handlers

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tipline_common::models::{ReviewDecision, Verification, VerifyStatus};
use tipline_common::pagination::calculate_pagination;
use tipline_common::Error;
use uuid::Uuid;

use crate::api::{ok, Envelope, PageMeta, PageQuery};
use crate::auth::Actor;
use crate::db;
use crate::{ApiResult, AppState};

/// POST /api/verifications request
#[derive(Debug, Deserialize)]
pub struct RequestVerificationRequest {
    /// Free-form credentials (press card number, portfolio links, ...)
    pub docs: Option<String>,
}

/// GET /api/verifications response
#[derive(Debug, Serialize)]
pub struct VerificationListResponse {
    pub verifications: Vec<Verification>,
    pub pagination: PageMeta,
}

/// PUT /api/verifications/{id} request
#[derive(Debug, Deserialize)]
pub struct DecideVerificationRequest {
    pub decision: String,
    pub comment: Option<String>,
}

/// PUT /api/verifications/{id} response
#[derive(Debug, Serialize)]
pub struct DecideVerificationResponse {
    pub status: String,
    /// "degraded" when the decision committed but its audit row did not
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit: Option<String>,
}

/// POST /api/verifications
///
/// Request journalist verification. A rejected request may be refiled; the
/// row resets to PENDING with the reviewer comment cleared. The role is not
/// touched here; promotion happens only on approval.
pub async fn request_verification(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<RequestVerificationRequest>,
) -> ApiResult<Json<Envelope<Verification>>> {
    db::users::ensure_user(&state.db, actor.id, actor.role).await?;

    match db::verifications::get_by_user(&state.db, actor.id).await? {
        Some(v) if v.status == VerifyStatus::Pending => {
            return Err(Error::Conflict("already under review".to_string()).into());
        }
        Some(v) if v.status == VerifyStatus::Approved => {
            return Err(Error::Conflict("already verified".to_string()).into());
        }
        _ => {}
    }

    let verification =
        db::verifications::request(&state.db, actor.id, request.docs.as_deref()).await?;

    tracing::info!(user_id = %actor.id, "Verification requested");

    Ok(ok(verification))
}

/// GET /api/verifications
pub async fn list_verifications(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Envelope<VerificationListResponse>>> {
    if !actor.role.can_review() {
        return Err(Error::Permission("admin role required".to_string()).into());
    }

    let total = db::verifications::count_all(&state.db).await?;
    let pagination = calculate_pagination(total, query.page.unwrap_or(1), query.limit);

    let verifications =
        db::verifications::list(&state.db, pagination.page_size, pagination.offset).await?;

    Ok(ok(VerificationListResponse {
        verifications,
        pagination: PageMeta::new(pagination, total),
    }))
}

/// GET /api/verifications/me
pub async fn my_verification(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Json<Envelope<Verification>>> {
    let verification = db::verifications::get_by_user(&state.db, actor.id)
        .await?
        .ok_or_else(|| Error::NotFound("no verification request".to_string()))?;

    Ok(ok(verification))
}

/// PUT /api/verifications/{id}
///
/// Admin decision. Approval promotes the user to REPORTER and provisions
/// their reputation in the same transaction as the status flip.
pub async fn decide_verification(
    State(state): State<AppState>,
    actor: Actor,
    Path(verification_id): Path<Uuid>,
    Json(request): Json<DecideVerificationRequest>,
) -> ApiResult<Json<Envelope<DecideVerificationResponse>>> {
    if !actor.role.can_review() {
        return Err(Error::Permission("admin role required".to_string()).into());
    }

    let verification = db::verifications::get_by_id(&state.db, verification_id)
        .await?
        .ok_or_else(|| Error::NotFound("verification not found".to_string()))?;

    let decision = ReviewDecision::parse(&request.decision).ok_or_else(|| {
        Error::Validation(format!(
            "decision must be APPROVED or REJECTED, got: {}",
            request.decision
        ))
    })?;

    let decided = db::verifications::decide(
        &state.db,
        verification_id,
        decision,
        request.comment.as_deref(),
    )
    .await?;
    if !decided {
        return Err(Error::InvalidState("verification already decided".to_string()).into());
    }

    let (action, status) = match decision {
        ReviewDecision::Approved => ("VERIFICATION_APPROVED", VerifyStatus::Approved),
        ReviewDecision::Rejected => ("VERIFICATION_REJECTED", VerifyStatus::Rejected),
    };
    tracing::info!(
        verification_id = %verification_id,
        user_id = %verification.user_id,
        action,
        "Verification decided"
    );

    let audit = match db::audit::append(
        &state.db,
        action,
        "VERIFICATION",
        verification_id,
        request.comment.as_deref(),
        actor.id,
        Some(verification.user_id),
    )
    .await
    {
        Ok(()) => None,
        Err(e) => {
            tracing::error!(
                verification_id = %verification_id,
                error = %e,
                "Audit append failed after decision"
            );
            Some("degraded".to_string())
        }
    };

    Ok(ok(DecideVerificationResponse {
        status: status.as_str().to_string(),
        audit,
    }))
}

/// Build verification routes
pub fn verification_routes() -> Router<AppState> {
    Router::new()
        .route("/api/verifications", post(request_verification))
        .route("/api/verifications", get(list_verifications))
        .route("/api/verifications/me", get(my_verification))
        .route("/api/verifications/:id", put(decide_verification))
}
