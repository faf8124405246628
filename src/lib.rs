pub mod access;
pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod forms;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod views;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderName, HeaderValue};
use sqlx::PgPool;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::email::SystemMailer;
use crate::middleware::auth_redirect::redirect_unauthorized;
use crate::rate_limit::LoginRateLimiter;
use crate::state::{AppState, SharedState};

/// Outbound mail is optional; a broken SMTP setup only disables it.
fn system_mailer(config: &Config) -> Option<Arc<SystemMailer>> {
    let smtp = config.smtp.as_ref()?;
    match SystemMailer::new(smtp) {
        Ok(mailer) => {
            tracing::info!(host = %smtp.host, "System SMTP configured");
            Some(Arc::new(mailer))
        }
        Err(e) => {
            tracing::warn!("System SMTP not available: {e}");
            None
        }
    }
}

fn security_headers(router: Router) -> Router {
    [
        ("x-content-type-options", "nosniff"),
        ("x-frame-options", "DENY"),
        ("referrer-policy", "strict-origin-when-cross-origin"),
    ]
    .into_iter()
    .fold(router, |router, (name, value)| {
        router.layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ))
    })
}

/// The whole application: JSON API, public pages, signed-in pages
/// (which bounce to the login page on 401), static assets and health.
pub fn build_app(pool: PgPool, config: Config) -> (Router, SharedState) {
    let state: SharedState = Arc::new(AppState {
        pool,
        system_mailer: system_mailer(&config),
        config,
        login_limiter: LoginRateLimiter::new(),
    });

    let pages = views::view_routes().layer(axum::middleware::from_fn(redirect_unauthorized));

    let app = Router::new()
        .merge(routes::api_routes())
        .merge(views::public_routes())
        .merge(pages)
        .route("/health", axum::routing::get(health))
        .with_state(state.clone())
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http());

    (security_headers(app), state)
}

async fn health() -> &'static str {
    "ok"
}
