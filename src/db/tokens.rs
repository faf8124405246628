use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::StoredToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Refresh,
    PasswordReset,
}

impl TokenKind {
    fn table(self) -> &'static str {
        match self {
            TokenKind::Refresh => "refresh_tokens",
            TokenKind::PasswordReset => "password_reset_tokens",
        }
    }
}

pub async fn create(
    pool: &PgPool,
    kind: TokenKind,
    user_id: Uuid,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<StoredToken, sqlx::Error> {
    sqlx::query_as::<_, StoredToken>(&format!(
        "INSERT INTO {} (user_id, token_hash, expires_at) VALUES ($1, $2, $3) RETURNING *",
        kind.table()
    ))
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .fetch_one(pool)
    .await
}

pub async fn find_by_hash(
    pool: &PgPool,
    kind: TokenKind,
    token_hash: &str,
) -> Result<Option<StoredToken>, sqlx::Error> {
    sqlx::query_as::<_, StoredToken>(&format!(
        "SELECT * FROM {} WHERE token_hash = $1",
        kind.table()
    ))
    .bind(token_hash)
    .fetch_optional(pool)
    .await
}

/// Unused and unexpired only.
pub async fn find_valid_by_hash(
    pool: &PgPool,
    kind: TokenKind,
    token_hash: &str,
) -> Result<Option<StoredToken>, sqlx::Error> {
    sqlx::query_as::<_, StoredToken>(&format!(
        "SELECT * FROM {} WHERE token_hash = $1 AND used = false AND expires_at > now()",
        kind.table()
    ))
    .bind(token_hash)
    .fetch_optional(pool)
    .await
}

/// Flags the token as used. Returns false if it already was, so two
/// concurrent redemptions can't both succeed.
pub async fn mark_used(pool: &PgPool, kind: TokenKind, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(&format!(
        "UPDATE {} SET used = true WHERE id = $1 AND used = false",
        kind.table()
    ))
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_by_hash(
    pool: &PgPool,
    kind: TokenKind,
    token_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!("DELETE FROM {} WHERE token_hash = $1", kind.table()))
        .bind(token_hash)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_all_for_user(
    pool: &PgPool,
    kind: TokenKind,
    user_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!("DELETE FROM {} WHERE user_id = $1", kind.table()))
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}
