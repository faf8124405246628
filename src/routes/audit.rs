use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use crate::access::Principal;
use crate::db;
use crate::error::AppError;
use crate::models::AuditEvent;
use crate::state::SharedState;

const DEFAULT_PER_PAGE: i64 = 50;
const MAX_PER_PAGE: i64 = 200;

#[derive(Deserialize)]
pub struct AuditParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// `lead`, `agent`, `category` or `user`.
    pub resource_type: Option<String>,
}

/// Recent activity in the organizer's organization.
pub async fn list(
    principal: Principal,
    State(state): State<SharedState>,
    Query(params): Query<AuditParams>,
) -> Result<Json<Vec<AuditEvent>>, AppError> {
    let organization_id = principal.require_organizer()?;

    let page = params.page.unwrap_or(1).max(1);
    let per_page = params
        .per_page
        .unwrap_or(DEFAULT_PER_PAGE)
        .clamp(1, MAX_PER_PAGE);

    let events = db::audit::list(
        &state.pool,
        organization_id,
        params.resource_type.as_deref(),
        per_page,
        (page - 1).saturating_mul(per_page),
    )
    .await?;
    Ok(Json(events))
}
