use askama::Template;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::auth::jwt;
use crate::config::RegistrationMode;
use crate::state::SharedState;

#[derive(Template)]
#[template(path = "landing.html")]
struct LandingTemplate {
    signed_in: bool,
    registration_open: bool,
}

#[derive(Template)]
#[template(path = "auth/login.html")]
struct LoginTemplate {
    next: String,
    registration_open: bool,
}

#[derive(Template)]
#[template(path = "auth/signup.html")]
struct SignupTemplate {
    registration_open: bool,
}

#[derive(Template)]
#[template(path = "auth/forgot_password.html")]
struct ForgotPasswordTemplate;

#[derive(Template)]
#[template(path = "auth/reset_password.html")]
struct ResetPasswordTemplate {
    token: String,
}

#[derive(Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Deserialize)]
pub struct ResetQuery {
    pub token: Option<String>,
}

fn signed_in(state: &SharedState, jar: &CookieJar) -> bool {
    jar.get("access_token")
        .is_some_and(|c| jwt::decode_token(c.value(), &state.config.jwt_secret).is_ok())
}

/// Only same-site paths are accepted as a post-login target.
fn safe_next(next: Option<String>) -> String {
    match next {
        Some(n) if n.starts_with('/') && !n.starts_with("//") => n,
        _ => "/leads".to_string(),
    }
}

pub async fn landing_page(State(state): State<SharedState>, jar: CookieJar) -> impl IntoResponse {
    let template = LandingTemplate {
        signed_in: signed_in(&state, &jar),
        registration_open: state.config.registration == RegistrationMode::Open,
    };
    Html(template.render().unwrap_or_default())
}

pub async fn login_page(
    State(state): State<SharedState>,
    jar: CookieJar,
    Query(q): Query<LoginQuery>,
) -> Response {
    let next = safe_next(q.next);
    if signed_in(&state, &jar) {
        return Redirect::to(&next).into_response();
    }

    let template = LoginTemplate {
        next,
        registration_open: state.config.registration == RegistrationMode::Open,
    };
    Html(template.render().unwrap_or_default()).into_response()
}

pub async fn signup_page(State(state): State<SharedState>) -> impl IntoResponse {
    let template = SignupTemplate {
        registration_open: state.config.registration == RegistrationMode::Open,
    };
    Html(template.render().unwrap_or_default())
}

pub async fn forgot_password_page() -> impl IntoResponse {
    Html(ForgotPasswordTemplate.render().unwrap_or_default())
}

pub async fn reset_password_page(Query(q): Query<ResetQuery>) -> impl IntoResponse {
    let template = ResetPasswordTemplate {
        token: q.token.unwrap_or_default(),
    };
    Html(template.render().unwrap_or_default())
}
