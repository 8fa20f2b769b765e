//! HTTP API handlers for tipline-server

pub mod audit;
pub mod health;
pub mod payments;
pub mod picks;
pub mod reputation;
pub mod tips;
pub mod verifications;

pub use audit::audit_routes;
pub use health::health_routes;
pub use payments::payment_routes;
pub use picks::pick_routes;
pub use reputation::reputation_routes;
pub use tips::tip_routes;
pub use verifications::verification_routes;

use axum::Json;
use serde::{Deserialize, Serialize};
use tipline_common::pagination::Pagination;

/// Success envelope wrapping every 2xx payload
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

/// Wrap a payload in the success envelope.
pub(crate) fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        data,
    })
}

/// Shared `?page=&limit=` query parameters for list endpoints
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Pagination block included in list responses
#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PageMeta {
    pub(crate) fn new(p: Pagination, total: i64) -> Self {
        Self {
            page: p.page,
            limit: p.page_size,
            total,
            total_pages: p.total_pages,
        }
    }
}
