use askama::Template;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse};
use uuid::Uuid;

use crate::access::Principal;
use crate::db;
use crate::error::AppError;
use crate::state::SharedState;
use crate::views::{LeadRow, Nav, lead_rows};

struct AgentRow {
    id: String,
    username: String,
    full_name: String,
    email: String,
}

#[derive(Template)]
#[template(path = "agents/list.html")]
struct AgentListTemplate {
    user_name: String,
    is_organizer: bool,
    agents: Vec<AgentRow>,
}

#[derive(Template)]
#[template(path = "agents/detail.html")]
struct AgentDetailTemplate {
    user_name: String,
    is_organizer: bool,
    agent_id: String,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    leads: Vec<LeadRow>,
}

pub async fn list_page(
    principal: Principal,
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, AppError> {
    let organization_id = principal.require_organizer()?;
    let nav = Nav::load(&state, &principal).await?;

    let agents = db::agents::list(&state.pool, organization_id)
        .await?
        .iter()
        .map(|a| AgentRow {
            id: a.id.to_string(),
            username: a.username.clone(),
            full_name: a.display_name(),
            email: a.email.clone(),
        })
        .collect();

    let template = AgentListTemplate {
        user_name: nav.user_name,
        is_organizer: nav.is_organizer,
        agents,
    };
    Ok(Html(template.render().unwrap_or_default()))
}

pub async fn detail_page(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let organization_id = principal.require_organizer()?;

    let agent = db::agents::find(&state.pool, id, organization_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Agent not found".to_string()))?;
    let leads = db::leads::list_by_agent(&state.pool, organization_id, agent.id).await?;

    let nav = Nav::load(&state, &principal).await?;

    let template = AgentDetailTemplate {
        user_name: nav.user_name,
        is_organizer: nav.is_organizer,
        agent_id: agent.id.to_string(),
        username: agent.username,
        email: agent.email,
        first_name: agent.first_name,
        last_name: agent.last_name,
        leads: lead_rows(&leads),
    };
    Ok(Html(template.render().unwrap_or_default()))
}
