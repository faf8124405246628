use axum::Json;
use axum::extract::State;
use axum_extra::extract::{CookieJar, WithRejection};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::{Principal, Role};
use crate::auth::jwt::{ACCESS_TOKEN_MINUTES, Claims, encode_token};
use crate::auth::{password, tokens};
use crate::config::RegistrationMode;
use crate::db;
use crate::db::tokens::TokenKind;
use crate::email;
use crate::error::AppError;
use crate::forms::{FieldErrors, SignupForm, validate_password};
use crate::middleware::audit;
use crate::models::NewAuditEvent;
use crate::state::SharedState;

const REFRESH_TOKEN_DAYS: i64 = 7;

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_organizer: bool,
    pub is_agent: bool,
    pub organization_id: Uuid,
    pub agent_id: Option<Uuid>,
}

fn auth_cookies(access_token: &str, refresh_token: &str) -> CookieJar {
    let access = Cookie::build(("access_token", access_token.to_string()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(ACCESS_TOKEN_MINUTES))
        .build();

    let refresh = Cookie::build(("refresh_token", refresh_token.to_string()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(REFRESH_TOKEN_DAYS))
        .build();

    CookieJar::new().add(access).add(refresh)
}

fn clear_auth_cookies() -> CookieJar {
    let access = Cookie::build(("access_token", ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();
    let refresh = Cookie::build(("refresh_token", ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();
    CookieJar::new().add(access).add(refresh)
}

/// Issue a fresh access token and a new refresh token for the user.
async fn issue_session(
    state: &SharedState,
    user_id: Uuid,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let access_token =
        encode_token(&Claims::new(user_id), &state.config.jwt_secret).map_err(AppError::Internal)?;

    let refresh = tokens::generate();
    db::tokens::create(
        &state.pool,
        TokenKind::Refresh,
        user_id,
        &tokens::hash(&refresh),
        Utc::now() + Duration::days(REFRESH_TOKEN_DAYS),
    )
    .await?;

    let jar = auth_cookies(&access_token, &refresh);
    Ok((
        jar,
        Json(AuthResponse {
            access_token,
            refresh_token: refresh,
        }),
    ))
}

/// Organizer signup: the user and their organization profile are created
/// together or not at all.
pub async fn signup(
    State(state): State<SharedState>,
    WithRejection(Json(form), _): WithRejection<Json<SignupForm>, AppError>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    if state.config.registration == RegistrationMode::Closed {
        return Err(AppError::Forbidden(
            "Registration is disabled. Contact your administrator.".to_string(),
        ));
    }

    let input = form.validate()?;
    let pw_hash = password::hash(&input.password).map_err(AppError::Internal)?;

    let mut tx = state.pool.begin().await?;

    let user = db::users::create(
        &mut *tx,
        &input.username,
        &input.email,
        "",
        "",
        &pw_hash,
        Role::Organizer,
    )
    .await
    .map_err(|e| duplicate_account(e, &input.username))?;

    let profile = db::organizations::create(&mut *tx, user.id).await?;

    tx.commit().await?;

    tracing::info!(user_id = %user.id, organization_id = %profile.id, "Organizer signed up");

    audit::record(
        &state.pool,
        NewAuditEvent {
            organization_id: Some(profile.id),
            user_id: Some(user.id),
            action: "organizer.signed_up",
            resource_type: "user",
            resource_id: Some(user.id),
            details: None,
        },
    )
    .await;

    let (to, username, base_url) = (
        user.email.clone(),
        user.username.clone(),
        state.config.base_url.clone(),
    );
    email::dispatch(state.system_mailer.clone(), "welcome", move |mailer| async move {
        mailer.send_welcome(&to, &username, &base_url).await
    });

    issue_session(&state, user.id).await
}

/// Username and email are both unique; report whichever collided.
pub(crate) fn duplicate_account(err: sqlx::Error, username: &str) -> AppError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some(c) if c.contains("email") => "email",
                _ => "username",
            };
            let message = if field == "email" {
                "A user with that email already exists.".to_string()
            } else {
                format!("A user with the username '{username}' already exists.")
            };
            return AppError::Validation(FieldErrors::single(field, &message));
        }
    }
    AppError::Database(err)
}

pub async fn login(
    State(state): State<SharedState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    if state.login_limiter.check(&req.username).is_err() {
        return Err(AppError::RateLimited(
            "Too many login attempts. Please try again later.".to_string(),
        ));
    }

    let user = db::users::find_by_username(&state.pool, &req.username)
        .await?
        .ok_or_else(|| {
            state.login_limiter.record_failure(&req.username);
            AppError::Unauthorized("Invalid credentials".to_string())
        })?;

    let valid = password::verify(&req.password, &user.password_hash).map_err(AppError::Internal)?;

    if !valid {
        state.login_limiter.record_failure(&req.username);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    // A user whose organization link is gone can't act on anything.
    let principal = db::users::resolve_principal(&state.pool, user.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer active".to_string()))?;

    state.login_limiter.reset(&req.username);

    audit::log_event(&state.pool, &principal, "user.login", "user", Some(user.id), None).await;

    issue_session(&state, user.id).await
}

pub async fn refresh(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let refresh_value = jar
        .get("refresh_token")
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::Unauthorized("Missing refresh token".to_string()))?;

    let stored = db::tokens::find_by_hash(&state.pool, TokenKind::Refresh, &tokens::hash(&refresh_value))
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    if stored.used {
        tracing::warn!(
            "Refresh token reuse detected for user {}. Revoking all sessions.",
            stored.user_id
        );
        db::tokens::delete_all_for_user(&state.pool, TokenKind::Refresh, stored.user_id).await?;
        return Err(AppError::Unauthorized(
            "Refresh token reuse detected. All sessions revoked.".to_string(),
        ));
    }

    if stored.expires_at < Utc::now() {
        return Err(AppError::Unauthorized("Refresh token expired".to_string()));
    }

    if !db::tokens::mark_used(&state.pool, TokenKind::Refresh, stored.id).await? {
        return Err(AppError::Unauthorized("Invalid refresh token".to_string()));
    }

    db::users::resolve_principal(&state.pool, stored.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer active".to_string()))?;

    issue_session(&state, stored.user_id).await
}

pub async fn logout(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    if let Some(cookie) = jar.get("refresh_token") {
        db::tokens::delete_by_hash(&state.pool, TokenKind::Refresh, &tokens::hash(cookie.value()))
            .await?;
    }

    Ok((
        clear_auth_cookies(),
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    ))
}

pub async fn forgot_password(
    State(state): State<SharedState>,
    WithRejection(Json(req), _): WithRejection<Json<ForgotPasswordRequest>, AppError>,
) -> Result<Json<MessageResponse>, AppError> {
    // Same answer whether or not the email exists.
    let response = Json(MessageResponse {
        message: "If that email is registered, a reset link has been sent.".to_string(),
    });

    let pool = state.pool.clone();
    let mailer = state.system_mailer.clone();
    let base_url = state.config.base_url.clone();

    tokio::spawn(async move {
        let user = match db::users::find_by_email(&pool, &req.email).await {
            Ok(Some(user)) => user,
            Ok(None) => return,
            Err(e) => {
                tracing::error!("Password reset lookup failed: {e}");
                return;
            }
        };

        let token = tokens::generate();
        if let Err(e) = db::tokens::create(
            &pool,
            TokenKind::PasswordReset,
            user.id,
            &tokens::hash(&token),
            Utc::now() + Duration::hours(1),
        )
        .await
        {
            tracing::error!("Failed to store password reset token: {e}");
            return;
        }

        match mailer {
            Some(mailer) => {
                let reset_url = format!("{base_url}/auth/reset-password?token={token}");
                if let Err(e) = mailer.send_password_reset(&user.email, &reset_url).await {
                    tracing::error!("Failed to send password reset email: {e}");
                }
            }
            None => {
                tracing::warn!("System SMTP not configured. Password reset token: {token}");
            }
        }
    });

    Ok(response)
}

pub async fn reset_password(
    State(state): State<SharedState>,
    WithRejection(Json(req), _): WithRejection<Json<ResetPasswordRequest>, AppError>,
) -> Result<Json<MessageResponse>, AppError> {
    let mut errors = FieldErrors::new();
    validate_password(&mut errors, "password", &req.password);
    if !errors.is_empty() {
        return Err(errors.into());
    }

    let reset_token =
        db::tokens::find_valid_by_hash(&state.pool, TokenKind::PasswordReset, &tokens::hash(&req.token))
            .await?
            .ok_or_else(|| AppError::BadRequest("Invalid or expired reset token".to_string()))?;

    if !db::tokens::mark_used(&state.pool, TokenKind::PasswordReset, reset_token.id).await? {
        return Err(AppError::BadRequest("Invalid or expired reset token".to_string()));
    }

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;
    db::users::update_password(&state.pool, reset_token.user_id, &pw_hash).await?;

    // Sign out every session of the user.
    db::tokens::delete_all_for_user(&state.pool, TokenKind::Refresh, reset_token.user_id).await?;

    Ok(Json(MessageResponse {
        message: "Password reset successfully".to_string(),
    }))
}

pub async fn me(
    principal: Principal,
    State(state): State<SharedState>,
) -> Result<Json<MeResponse>, AppError> {
    let user = db::users::find_by_id(&state.pool, principal.user_id())
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer active".to_string()))?;

    Ok(Json(MeResponse {
        user_id: user.id,
        is_organizer: user.is_organizer(),
        is_agent: user.is_agent(),
        username: user.username,
        email: user.email,
        role: principal.role(),
        organization_id: principal.organization_id(),
        agent_id: principal.agent_id(),
    }))
}
