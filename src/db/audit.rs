use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{AuditEvent, NewAuditEvent};

pub async fn insert(pool: &PgPool, event: &NewAuditEvent<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_events (organization_id, user_id, action, resource_type, resource_id, details)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(event.organization_id)
    .bind(event.user_id)
    .bind(event.action)
    .bind(event.resource_type)
    .bind(event.resource_id)
    .bind(&event.details)
    .execute(pool)
    .await?;
    Ok(())
}

/// Newest first, optionally narrowed to one resource type.
pub async fn list(
    pool: &PgPool,
    organization_id: Uuid,
    resource_type: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<AuditEvent>, sqlx::Error> {
    sqlx::query_as::<_, AuditEvent>(
        "SELECT * FROM audit_events
         WHERE organization_id = $1 AND ($2::text IS NULL OR resource_type = $2)
         ORDER BY created_at DESC, id
         LIMIT $3 OFFSET $4",
    )
    .bind(organization_id)
    .bind(resource_type)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}
