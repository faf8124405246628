use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

use crate::access::Principal;
use crate::auth::jwt;
use crate::db;
use crate::error::AppError;
use crate::state::SharedState;

fn bearer_or_cookie(parts: &Parts) -> Result<Option<String>, AppError> {
    if let Some(auth_header) = parts.headers.get("authorization") {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;

        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Ok(Some(token.to_string()));
        }
    }

    let jar = CookieJar::from_headers(&parts.headers);
    Ok(jar.get("access_token").map(|c| c.value().to_string()))
}

impl FromRequestParts<SharedState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_or_cookie(parts)?
            .ok_or_else(|| AppError::Unauthorized("Missing authentication token".to_string()))?;

        let claims = jwt::decode_token(&token, &state.config.jwt_secret)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        // Resolved per request so a deleted agent loses access immediately.
        db::users::resolve_principal(&state.pool, claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Account no longer active".to_string()))
    }
}
