use sqlx::PgPool;
use uuid::Uuid;

use crate::forms::AgentInput;
use crate::models::Agent;

const SELECT_AGENT: &str = "SELECT a.id, a.user_id, a.organization_id,
        u.username, u.email, u.first_name, u.last_name, a.created_at
     FROM agents a
     JOIN users u ON u.id = a.user_id";

pub async fn list(pool: &PgPool, organization_id: Uuid) -> Result<Vec<Agent>, sqlx::Error> {
    sqlx::query_as::<_, Agent>(&format!(
        "{SELECT_AGENT} WHERE a.organization_id = $1 ORDER BY u.username"
    ))
    .bind(organization_id)
    .fetch_all(pool)
    .await
}

pub async fn find<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    organization_id: Uuid,
) -> Result<Option<Agent>, sqlx::Error> {
    sqlx::query_as::<_, Agent>(&format!(
        "{SELECT_AGENT} WHERE a.id = $1 AND a.organization_id = $2"
    ))
    .bind(id)
    .bind(organization_id)
    .fetch_optional(executor)
    .await
}

pub async fn belongs_to(
    pool: &PgPool,
    id: Uuid,
    organization_id: Uuid,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM agents WHERE id = $1 AND organization_id = $2)",
    )
    .bind(id)
    .bind(organization_id)
    .fetch_one(pool)
    .await
}

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    organization_id: Uuid,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO agents (user_id, organization_id) VALUES ($1, $2) RETURNING id",
    )
    .bind(user_id)
    .bind(organization_id)
    .fetch_one(executor)
    .await
}

/// Edits the agent's user account. Returns `None` when the agent is not
/// part of the organization.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    organization_id: Uuid,
    input: &AgentInput,
) -> Result<Option<Agent>, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET username = $3, email = $4, first_name = $5, last_name = $6
         WHERE id = (SELECT user_id FROM agents WHERE id = $1 AND organization_id = $2)",
    )
    .bind(id)
    .bind(organization_id)
    .bind(&input.username)
    .bind(&input.email)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    find(pool, id, organization_id).await
}

/// Deletes the agent by deleting its user; the agent row cascades and its
/// leads fall back to unassigned.
pub async fn delete(pool: &PgPool, id: Uuid, organization_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM users
         WHERE id = (SELECT user_id FROM agents WHERE id = $1 AND organization_id = $2)",
    )
    .bind(id)
    .bind(organization_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
