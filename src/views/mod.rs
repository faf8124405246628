pub mod agents;
pub mod auth;
pub mod categories;
pub mod leads;

use axum::Router;
use axum::routing::get;

use crate::access::Principal;
use crate::db;
use crate::error::AppError;
use crate::models::LeadSummary;
use crate::state::SharedState;

pub fn view_routes() -> Router<SharedState> {
    Router::new()
        // Leads
        .route("/leads", get(leads::list_page))
        .route("/leads/{id}", get(leads::detail_page))
        // Agents
        .route("/agents", get(agents::list_page))
        .route("/agents/{id}", get(agents::detail_page))
        // Categories
        .route("/categories", get(categories::list_page))
        .route("/categories/{id}", get(categories::detail_page))
}

/// Pages reachable without a session.
pub fn public_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(auth::landing_page))
        .route("/auth/login", get(auth::login_page))
        .route("/auth/signup", get(auth::signup_page))
        .route("/auth/forgot-password", get(auth::forgot_password_page))
        .route("/auth/reset-password", get(auth::reset_password_page))
}

/// Navigation context shared by every signed-in page.
pub(crate) struct Nav {
    pub user_name: String,
    pub is_organizer: bool,
}

impl Nav {
    pub async fn load(state: &SharedState, principal: &Principal) -> Result<Self, AppError> {
        let user_name = db::users::find_by_id(&state.pool, principal.user_id())
            .await?
            .map(|u| u.username)
            .unwrap_or_default();

        Ok(Nav {
            user_name,
            is_organizer: principal.is_organizer(),
        })
    }
}

pub(crate) struct LeadRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub age: i32,
    pub agent: String,
    pub category: String,
    pub created_at: String,
}

impl From<&LeadSummary> for LeadRow {
    fn from(lead: &LeadSummary) -> Self {
        LeadRow {
            id: lead.id.to_string(),
            name: format!("{} {}", lead.first_name, lead.last_name),
            email: lead.email.clone(),
            phone_number: lead.phone_number.clone(),
            age: lead.age,
            agent: lead.agent_username.clone().unwrap_or_default(),
            category: lead.category_name.clone().unwrap_or_default(),
            created_at: lead.created_at.format("%Y-%m-%d").to_string(),
        }
    }
}

pub(crate) fn lead_rows(leads: &[LeadSummary]) -> Vec<LeadRow> {
    leads.iter().map(LeadRow::from).collect()
}

/// Select option for agent / category pickers.
pub(crate) struct Choice {
    pub id: String,
    pub label: String,
    pub selected: bool,
}
