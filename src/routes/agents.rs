use axum::Json;
use axum::extract::{Path, State};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use uuid::Uuid;

use crate::access::{Principal, Role};
use crate::auth::password;
use crate::db;
use crate::email;
use crate::error::AppError;
use crate::forms::AgentForm;
use crate::middleware::audit;
use crate::models::{Agent, LeadSummary};
use crate::routes::auth::duplicate_account;
use crate::state::SharedState;

#[derive(Serialize)]
pub struct AgentDetail {
    #[serde(flatten)]
    pub agent: Agent,
    pub leads: Vec<LeadSummary>,
}

fn agent_not_found() -> AppError {
    AppError::NotFound("Agent not found".to_string())
}

pub async fn list(
    principal: Principal,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Agent>>, AppError> {
    let organization_id = principal.require_organizer()?;
    let agents = db::agents::list(&state.pool, organization_id).await?;
    Ok(Json(agents))
}

pub async fn get(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AgentDetail>, AppError> {
    let organization_id = principal.require_organizer()?;

    let agent = db::agents::find(&state.pool, id, organization_id)
        .await?
        .ok_or_else(agent_not_found)?;
    let leads = db::leads::list_by_agent(&state.pool, organization_id, agent.id).await?;

    Ok(Json(AgentDetail { agent, leads }))
}

/// Creates the agent's user account with a throwaway password and links it
/// to the organizer's organization, then invites the agent by email.
pub async fn create(
    principal: Principal,
    State(state): State<SharedState>,
    WithRejection(Json(form), _): WithRejection<Json<AgentForm>, AppError>,
) -> Result<Json<Agent>, AppError> {
    let organization_id = principal.require_organizer()?;
    let input = form.validate()?;

    let pw_hash = password::hash(&password::generate_one_time()).map_err(AppError::Internal)?;

    let mut tx = state.pool.begin().await?;

    let user = db::users::create(
        &mut *tx,
        &input.username,
        &input.email,
        &input.first_name,
        &input.last_name,
        &pw_hash,
        Role::Agent,
    )
    .await
    .map_err(|e| duplicate_account(e, &input.username))?;

    let agent_id = db::agents::create(&mut *tx, user.id, organization_id).await?;
    let agent = db::agents::find(&mut *tx, agent_id, organization_id)
        .await?
        .ok_or_else(|| AppError::Internal("Agent vanished after insert".to_string()))?;

    tx.commit().await?;

    tracing::info!(agent_id = %agent.id, %organization_id, "Agent created");

    audit::log_event(&state.pool, &principal, "agent.created", "agent", Some(agent.id), None).await;

    let organizer = db::users::find_by_id(&state.pool, principal.user_id())
        .await?
        .map(|u| u.display_name())
        .unwrap_or_default();
    let (to, username, base_url) = (
        agent.email.clone(),
        agent.username.clone(),
        state.config.base_url.clone(),
    );
    email::dispatch(state.system_mailer.clone(), "agent_invite", move |mailer| async move {
        mailer
            .send_agent_invite(&to, &username, &organizer, &base_url)
            .await
    });

    Ok(Json(agent))
}

pub async fn update(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    WithRejection(Json(form), _): WithRejection<Json<AgentForm>, AppError>,
) -> Result<Json<Agent>, AppError> {
    let organization_id = principal.require_organizer()?;
    let input = form.validate()?;

    let agent = db::agents::update(&state.pool, id, organization_id, &input)
        .await
        .map_err(|e| duplicate_account(e, &input.username))?
        .ok_or_else(agent_not_found)?;

    audit::log_event(&state.pool, &principal, "agent.updated", "agent", Some(agent.id), None).await;

    Ok(Json(agent))
}

pub async fn delete(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let organization_id = principal.require_organizer()?;

    if !db::agents::delete(&state.pool, id, organization_id).await? {
        return Err(agent_not_found());
    }

    audit::log_event(&state.pool, &principal, "agent.deleted", "agent", Some(id), None).await;

    Ok(Json(serde_json::json!({ "message": "Deleted" })))
}
