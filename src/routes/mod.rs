pub mod agents;
pub mod audit;
pub mod auth;
pub mod categories;
pub mod leads;

use axum::Router;
use axum::routing::{get, post, put};

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/api/v1/auth/signup", post(auth::signup))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/refresh", post(auth::refresh))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/auth/forgot-password", post(auth::forgot_password))
        .route("/api/v1/auth/reset-password", post(auth::reset_password))
        .route("/api/v1/me", get(auth::me))
        // Leads
        .route("/api/v1/leads", get(leads::list).post(leads::create))
        .route("/api/v1/leads/unassigned", get(leads::list_unassigned))
        .route(
            "/api/v1/leads/{id}",
            get(leads::get).put(leads::update).delete(leads::delete),
        )
        .route("/api/v1/leads/{id}/assign", post(leads::assign_agent))
        .route("/api/v1/leads/{id}/category", put(leads::update_category))
        // Agents
        .route("/api/v1/agents", get(agents::list).post(agents::create))
        .route(
            "/api/v1/agents/{id}",
            get(agents::get).put(agents::update).delete(agents::delete),
        )
        // Categories
        .route(
            "/api/v1/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/api/v1/categories/{id}",
            get(categories::get)
                .put(categories::update)
                .delete(categories::delete),
        )
        // Audit
        .route("/api/v1/audit", get(audit::list))
}
