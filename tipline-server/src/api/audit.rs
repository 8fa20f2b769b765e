//! Audit log read API

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tipline_common::models::AuditEntry;
use tipline_common::pagination::calculate_pagination;
use tipline_common::Error;

use crate::api::{ok, Envelope, PageMeta};
use crate::auth::Actor;
use crate::db;
use crate::{ApiResult, AppState};

/// GET /api/audit query parameters
#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Restrict to one target type, e.g. TIP or VERIFICATION
    pub target_type: Option<String>,
}

/// GET /api/audit response
#[derive(Debug, Serialize)]
pub struct AuditListResponse {
    pub entries: Vec<AuditEntry>,
    pub pagination: PageMeta,
}

/// GET /api/audit
pub async fn list_audit(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<Envelope<AuditListResponse>>> {
    if !actor.role.can_review() {
        return Err(Error::Permission("admin role required".to_string()).into());
    }

    let target_type = query.target_type.as_deref();
    let total = db::audit::count(&state.db, target_type).await?;
    let pagination = calculate_pagination(total, query.page.unwrap_or(1), query.limit);

    let entries = db::audit::list(
        &state.db,
        target_type,
        pagination.page_size,
        pagination.offset,
    )
    .await?;

    Ok(ok(AuditListResponse {
        entries,
        pagination: PageMeta::new(pagination, total),
    }))
}

/// Build audit routes
pub fn audit_routes() -> Router<AppState> {
    Router::new().route("/api/audit", get(list_audit))
}
