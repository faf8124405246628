use sqlx::PgPool;
use uuid::Uuid;

use crate::access::{LeadFilter, LeadScope};
use crate::forms::LeadInput;
use crate::models::{Lead, LeadSummary};

const SELECT_SUMMARY: &str = "SELECT l.id, l.first_name, l.last_name, l.age, l.phone_number,
        l.email, l.agent_id, u.username AS agent_username,
        l.category_id, c.name AS category_name, l.created_at
     FROM leads l
     LEFT JOIN agents a ON a.id = l.agent_id
     LEFT JOIN users u ON u.id = a.user_id
     LEFT JOIN categories c ON c.id = l.category_id";

// $1 organization, $2 agent (NULL = whole organization)
const SCOPE_CLAUSE: &str = "l.organization_id = $1 AND ($2::uuid IS NULL OR l.agent_id = $2)";

pub async fn list(
    pool: &PgPool,
    scope: &LeadScope,
    filter: LeadFilter,
) -> Result<Vec<LeadSummary>, sqlx::Error> {
    sqlx::query_as::<_, LeadSummary>(&format!(
        "{SELECT_SUMMARY}
         WHERE {SCOPE_CLAUSE}
           AND ($3::bool IS NULL OR (l.agent_id IS NOT NULL) = $3)
         ORDER BY l.created_at DESC"
    ))
    .bind(scope.organization_id)
    .bind(scope.agent_id)
    .bind(filter.assigned_param())
    .fetch_all(pool)
    .await
}

pub async fn list_by_category(
    pool: &PgPool,
    scope: &LeadScope,
    category_id: Uuid,
) -> Result<Vec<LeadSummary>, sqlx::Error> {
    sqlx::query_as::<_, LeadSummary>(&format!(
        "{SELECT_SUMMARY}
         WHERE {SCOPE_CLAUSE} AND l.category_id = $3
         ORDER BY l.created_at DESC"
    ))
    .bind(scope.organization_id)
    .bind(scope.agent_id)
    .bind(category_id)
    .fetch_all(pool)
    .await
}

pub async fn list_by_agent(
    pool: &PgPool,
    organization_id: Uuid,
    agent_id: Uuid,
) -> Result<Vec<LeadSummary>, sqlx::Error> {
    sqlx::query_as::<_, LeadSummary>(&format!(
        "{SELECT_SUMMARY}
         WHERE l.organization_id = $1 AND l.agent_id = $2
         ORDER BY l.created_at DESC"
    ))
    .bind(organization_id)
    .bind(agent_id)
    .fetch_all(pool)
    .await
}

/// Loads a lead of the scope's organization, then applies the agent rule
/// through [`LeadScope::permits`].
pub async fn find(pool: &PgPool, id: Uuid, scope: &LeadScope) -> Result<Option<Lead>, sqlx::Error> {
    let lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = $1 AND organization_id = $2")
        .bind(id)
        .bind(scope.organization_id)
        .fetch_optional(pool)
        .await?;
    Ok(lead.filter(|lead| scope.permits(lead)))
}

/// Inserts the lead only if the referenced agent and category belong to the
/// same organization. Returns `None` otherwise.
pub async fn create(
    pool: &PgPool,
    organization_id: Uuid,
    input: &LeadInput,
) -> Result<Option<Lead>, sqlx::Error> {
    sqlx::query_as::<_, Lead>(
        "INSERT INTO leads (organization_id, first_name, last_name, age, phone_number,
                            email, description, agent_id, category_id)
         SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9
         WHERE ($8::uuid IS NULL
                OR EXISTS (SELECT 1 FROM agents WHERE id = $8 AND organization_id = $1))
           AND ($9::uuid IS NULL
                OR EXISTS (SELECT 1 FROM categories WHERE id = $9 AND organization_id = $1))
         RETURNING *",
    )
    .bind(organization_id)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(input.age)
    .bind(&input.phone_number)
    .bind(&input.email)
    .bind(&input.description)
    .bind(input.agent_id)
    .bind(input.category_id)
    .fetch_optional(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    organization_id: Uuid,
    input: &LeadInput,
) -> Result<Option<Lead>, sqlx::Error> {
    sqlx::query_as::<_, Lead>(
        "UPDATE leads SET first_name = $3, last_name = $4, age = $5, phone_number = $6,
                email = $7, description = $8, agent_id = $9, category_id = $10,
                updated_at = now()
         WHERE id = $1 AND organization_id = $2
           AND ($9::uuid IS NULL
                OR EXISTS (SELECT 1 FROM agents WHERE id = $9 AND organization_id = $2))
           AND ($10::uuid IS NULL
                OR EXISTS (SELECT 1 FROM categories WHERE id = $10 AND organization_id = $2))
         RETURNING *",
    )
    .bind(id)
    .bind(organization_id)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(input.age)
    .bind(&input.phone_number)
    .bind(&input.email)
    .bind(&input.description)
    .bind(input.agent_id)
    .bind(input.category_id)
    .fetch_optional(pool)
    .await
}

/// Binds the lead to an agent of the same organization.
pub async fn assign_agent(
    pool: &PgPool,
    id: Uuid,
    organization_id: Uuid,
    agent_id: Uuid,
) -> Result<Option<Lead>, sqlx::Error> {
    sqlx::query_as::<_, Lead>(
        "UPDATE leads SET agent_id = $3, updated_at = now()
         WHERE id = $1 AND organization_id = $2
           AND EXISTS (SELECT 1 FROM agents WHERE id = $3 AND organization_id = $2)
         RETURNING *",
    )
    .bind(id)
    .bind(organization_id)
    .bind(agent_id)
    .fetch_optional(pool)
    .await
}

pub async fn set_category(
    pool: &PgPool,
    id: Uuid,
    scope: &LeadScope,
    category_id: Option<Uuid>,
) -> Result<Option<Lead>, sqlx::Error> {
    sqlx::query_as::<_, Lead>(&format!(
        "UPDATE leads l SET category_id = $4, updated_at = now()
         WHERE l.id = $3 AND {SCOPE_CLAUSE}
           AND ($4::uuid IS NULL
                OR EXISTS (SELECT 1 FROM categories WHERE id = $4 AND organization_id = $1))
         RETURNING l.*"
    ))
    .bind(scope.organization_id)
    .bind(scope.agent_id)
    .bind(id)
    .bind(category_id)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid, organization_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM leads WHERE id = $1 AND organization_id = $2")
        .bind(id)
        .bind(organization_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
