use askama::Template;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse};
use uuid::Uuid;

use crate::access::{LeadFilter, Principal};
use crate::db;
use crate::error::AppError;
use crate::state::SharedState;
use crate::views::{Choice, LeadRow, Nav, lead_rows};

#[derive(Template)]
#[template(path = "leads/list.html")]
struct LeadListTemplate {
    user_name: String,
    is_organizer: bool,
    leads: Vec<LeadRow>,
    unassigned_leads: Vec<LeadRow>,
    agents: Vec<Choice>,
    categories: Vec<Choice>,
}

#[derive(Template)]
#[template(path = "leads/detail.html")]
struct LeadDetailTemplate {
    user_name: String,
    is_organizer: bool,
    lead_id: String,
    first_name: String,
    last_name: String,
    age: i32,
    phone_number: String,
    email: String,
    description: String,
    agent_name: String,
    category_name: String,
    agents: Vec<Choice>,
    categories: Vec<Choice>,
}

/// Organizers get their assigned leads plus a separate unassigned section;
/// agents get only their own leads.
pub async fn list_page(
    principal: Principal,
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, AppError> {
    let nav = Nav::load(&state, &principal).await?;
    let scope = principal.lead_scope();

    let (leads, unassigned_leads, agents, categories) = if principal.is_organizer() {
        let assigned = db::leads::list(&state.pool, &scope, LeadFilter::Assigned).await?;
        let unassigned = db::leads::list(&state.pool, &scope, LeadFilter::Unassigned).await?;
        let agents = db::agents::list(&state.pool, scope.organization_id).await?;
        let categories = db::categories::list(&state.pool, scope.organization_id).await?;
        (
            lead_rows(&assigned),
            lead_rows(&unassigned),
            agents
                .iter()
                .map(|a| Choice {
                    id: a.id.to_string(),
                    label: a.username.clone(),
                    selected: false,
                })
                .collect(),
            categories
                .iter()
                .map(|c| Choice {
                    id: c.id.to_string(),
                    label: c.name.clone(),
                    selected: false,
                })
                .collect(),
        )
    } else {
        let own = db::leads::list(&state.pool, &scope, LeadFilter::All).await?;
        (lead_rows(&own), Vec::new(), Vec::new(), Vec::new())
    };

    let template = LeadListTemplate {
        user_name: nav.user_name,
        is_organizer: nav.is_organizer,
        leads,
        unassigned_leads,
        agents,
        categories,
    };
    Ok(Html(template.render().unwrap_or_default()))
}

pub async fn detail_page(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let scope = principal.lead_scope();
    let lead = db::leads::find(&state.pool, id, &scope)
        .await?
        .ok_or_else(|| AppError::NotFound("Lead not found".to_string()))?;

    let nav = Nav::load(&state, &principal).await?;

    let categories = db::categories::list(&state.pool, scope.organization_id).await?;
    let category_name = categories
        .iter()
        .find(|c| Some(c.id) == lead.category_id)
        .map(|c| c.name.clone())
        .unwrap_or_default();

    // Agents can't see the agent roster; their own leads are theirs.
    let (agent_name, agents) = if principal.is_organizer() {
        let agents = db::agents::list(&state.pool, scope.organization_id).await?;
        let name = agents
            .iter()
            .find(|a| Some(a.id) == lead.agent_id)
            .map(|a| a.username.clone())
            .unwrap_or_default();
        let choices = agents
            .iter()
            .map(|a| Choice {
                id: a.id.to_string(),
                label: a.username.clone(),
                selected: Some(a.id) == lead.agent_id,
            })
            .collect();
        (name, choices)
    } else {
        (nav.user_name.clone(), Vec::new())
    };

    let template = LeadDetailTemplate {
        user_name: nav.user_name,
        is_organizer: nav.is_organizer,
        lead_id: lead.id.to_string(),
        first_name: lead.first_name,
        last_name: lead.last_name,
        age: lead.age,
        phone_number: lead.phone_number,
        email: lead.email,
        description: lead.description,
        agent_name,
        category_name,
        agents,
        categories: categories
            .iter()
            .map(|c| Choice {
                id: c.id.to_string(),
                label: c.name.clone(),
                selected: Some(c.id) == lead.category_id,
            })
            .collect(),
    };
    Ok(Html(template.render().unwrap_or_default()))
}
