use sqlx::PgPool;
use uuid::Uuid;

use crate::access::Principal;
use crate::db;
use crate::models::NewAuditEvent;

/// Record a mutation performed by `principal` in its organization.
pub async fn log_event(
    pool: &PgPool,
    principal: &Principal,
    action: &str,
    resource_type: &str,
    resource_id: Option<Uuid>,
    details: Option<serde_json::Value>,
) {
    record(
        pool,
        NewAuditEvent {
            organization_id: Some(principal.organization_id()),
            user_id: Some(principal.user_id()),
            action,
            resource_type,
            resource_id,
            details,
        },
    )
    .await;
}

/// Audit writes never fail the request; errors are only logged.
pub async fn record(pool: &PgPool, event: NewAuditEvent<'_>) {
    if let Err(e) = db::audit::insert(pool, &event).await {
        tracing::error!(action = event.action, "Failed to write audit event: {e}");
    }
}
