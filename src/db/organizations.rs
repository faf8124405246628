use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{User, UserProfile};

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
) -> Result<UserProfile, sqlx::Error> {
    sqlx::query_as::<_, UserProfile>(
        "INSERT INTO user_profiles (user_id) VALUES ($1) RETURNING *",
    )
    .bind(user_id)
    .fetch_one(executor)
    .await
}

/// The organizer who owns the organization.
pub async fn find_owner(pool: &PgPool, organization_id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT u.* FROM users u
         JOIN user_profiles p ON p.user_id = u.id
         WHERE p.id = $1",
    )
    .bind(organization_id)
    .fetch_optional(pool)
    .await
}
