use sqlx::PgPool;
use uuid::Uuid;

use crate::access::LeadScope;
use crate::models::{Category, CategoryWithCount};

/// Categories of the organization with the number of leads the scope can
/// see in each.
pub async fn list_with_counts(
    pool: &PgPool,
    scope: &LeadScope,
) -> Result<Vec<CategoryWithCount>, sqlx::Error> {
    sqlx::query_as::<_, CategoryWithCount>(
        "SELECT c.id, c.name, COUNT(l.id) AS lead_count
         FROM categories c
         LEFT JOIN leads l ON l.category_id = c.id
             AND ($2::uuid IS NULL OR l.agent_id = $2)
         WHERE c.organization_id = $1
         GROUP BY c.id, c.name
         ORDER BY c.name",
    )
    .bind(scope.organization_id)
    .bind(scope.agent_id)
    .fetch_all(pool)
    .await
}

pub async fn list(pool: &PgPool, organization_id: Uuid) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        "SELECT * FROM categories WHERE organization_id = $1 ORDER BY name",
    )
    .bind(organization_id)
    .fetch_all(pool)
    .await
}

pub async fn count_uncategorized(pool: &PgPool, scope: &LeadScope) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM leads
         WHERE organization_id = $1
           AND ($2::uuid IS NULL OR agent_id = $2)
           AND category_id IS NULL",
    )
    .bind(scope.organization_id)
    .bind(scope.agent_id)
    .fetch_one(pool)
    .await
}

pub async fn find(
    pool: &PgPool,
    id: Uuid,
    organization_id: Uuid,
) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        "SELECT * FROM categories WHERE id = $1 AND organization_id = $2",
    )
    .bind(id)
    .bind(organization_id)
    .fetch_optional(pool)
    .await
}

pub async fn belongs_to(
    pool: &PgPool,
    id: Uuid,
    organization_id: Uuid,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1 AND organization_id = $2)",
    )
    .bind(id)
    .bind(organization_id)
    .fetch_one(pool)
    .await
}

pub async fn create(
    pool: &PgPool,
    organization_id: Uuid,
    name: &str,
) -> Result<Category, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        "INSERT INTO categories (organization_id, name) VALUES ($1, $2) RETURNING *",
    )
    .bind(organization_id)
    .bind(name)
    .fetch_one(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    organization_id: Uuid,
    name: &str,
) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        "UPDATE categories SET name = $3
         WHERE id = $1 AND organization_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(organization_id)
    .bind(name)
    .fetch_optional(pool)
    .await
}

/// Leads in the category keep existing with `category_id` set to NULL.
pub async fn delete(pool: &PgPool, id: Uuid, organization_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND organization_id = $2")
        .bind(id)
        .bind(organization_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
