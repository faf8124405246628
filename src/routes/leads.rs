use axum::Json;
use axum::extract::{Path, Query, State};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use uuid::Uuid;

use crate::access::{LeadFilter, Principal};
use crate::db;
use crate::email;
use crate::error::AppError;
use crate::forms::{AssignAgentForm, FieldErrors, INVALID_CHOICE, LeadCategoryForm, LeadForm};
use crate::middleware::audit;
use crate::models::{Lead, LeadSummary};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct ListParams {
    pub filter: Option<String>,
}

/// Rejects agent / category ids from outside the organization as field
/// errors, the way a choice field would.
async fn check_references(
    state: &SharedState,
    organization_id: Uuid,
    agent_id: Option<Uuid>,
    category_id: Option<Uuid>,
) -> Result<(), AppError> {
    let mut errors = FieldErrors::new();

    if let Some(agent_id) = agent_id {
        if !db::agents::belongs_to(&state.pool, agent_id, organization_id).await? {
            errors.add("agent", INVALID_CHOICE);
        }
    }
    if let Some(category_id) = category_id {
        if !db::categories::belongs_to(&state.pool, category_id, organization_id).await? {
            errors.add("category", INVALID_CHOICE);
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors.into()) }
}

/// Names the reference that made a guarded lead write match nothing.
async fn rejected_reference(
    state: &SharedState,
    organization_id: Uuid,
    agent_id: Option<Uuid>,
    category_id: Option<Uuid>,
) -> AppError {
    match check_references(state, organization_id, agent_id, category_id).await {
        Err(e) => e,
        Ok(()) => AppError::Validation(FieldErrors::single(
            "__all__",
            "The lead changed while saving. Please try again.",
        )),
    }
}

fn lead_not_found() -> AppError {
    AppError::NotFound("Lead not found".to_string())
}

pub async fn list(
    principal: Principal,
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<LeadSummary>>, AppError> {
    let filter = match params.filter.as_deref() {
        None => LeadFilter::All,
        Some(s) => LeadFilter::parse(s)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown lead filter '{s}'")))?,
    };
    filter.check_allowed(&principal)?;

    let leads = db::leads::list(&state.pool, &principal.lead_scope(), filter).await?;
    Ok(Json(leads))
}

pub async fn list_unassigned(
    principal: Principal,
    State(state): State<SharedState>,
) -> Result<Json<Vec<LeadSummary>>, AppError> {
    LeadFilter::Unassigned.check_allowed(&principal)?;

    let leads = db::leads::list(&state.pool, &principal.lead_scope(), LeadFilter::Unassigned).await?;
    Ok(Json(leads))
}

pub async fn get(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Lead>, AppError> {
    let lead = db::leads::find(&state.pool, id, &principal.lead_scope())
        .await?
        .ok_or_else(lead_not_found)?;
    Ok(Json(lead))
}

pub async fn create(
    principal: Principal,
    State(state): State<SharedState>,
    WithRejection(Json(form), _): WithRejection<Json<LeadForm>, AppError>,
) -> Result<Json<Lead>, AppError> {
    let organization_id = principal.require_organizer()?;
    let input = form.validate()?;

    let Some(lead) = db::leads::create(&state.pool, organization_id, &input).await? else {
        return Err(
            rejected_reference(&state, organization_id, input.agent_id, input.category_id).await,
        );
    };

    tracing::info!(lead_id = %lead.id, %organization_id, "Lead created");

    audit::log_event(&state.pool, &principal, "lead.created", "lead", Some(lead.id), None).await;

    notify_lead_created(&state, organization_id, &lead).await;

    Ok(Json(lead))
}

async fn notify_lead_created(state: &SharedState, organization_id: Uuid, lead: &Lead) {
    let owner = match db::organizations::find_owner(&state.pool, organization_id).await {
        Ok(Some(owner)) => owner,
        Ok(None) => return,
        Err(e) => {
            tracing::error!("Failed to look up organization owner: {e}");
            return;
        }
    };

    let lead_name = format!("{} {}", lead.first_name, lead.last_name);
    let lead_url = format!("{}/leads/{}", state.config.base_url, lead.id);
    email::dispatch(state.system_mailer.clone(), "lead_created", move |mailer| async move {
        mailer.send_lead_created(&owner.email, &lead_name, &lead_url).await
    });
}

pub async fn update(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    WithRejection(Json(form), _): WithRejection<Json<LeadForm>, AppError>,
) -> Result<Json<Lead>, AppError> {
    let organization_id = principal.require_organizer()?;
    let input = form.validate()?;

    db::leads::find(&state.pool, id, &principal.lead_scope())
        .await?
        .ok_or_else(lead_not_found)?;

    let Some(lead) = db::leads::update(&state.pool, id, organization_id, &input).await? else {
        return Err(
            rejected_reference(&state, organization_id, input.agent_id, input.category_id).await,
        );
    };

    audit::log_event(&state.pool, &principal, "lead.updated", "lead", Some(lead.id), None).await;

    Ok(Json(lead))
}

pub async fn delete(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let organization_id = principal.require_organizer()?;

    if !db::leads::delete(&state.pool, id, organization_id).await? {
        return Err(lead_not_found());
    }

    audit::log_event(&state.pool, &principal, "lead.deleted", "lead", Some(id), None).await;

    Ok(Json(serde_json::json!({ "message": "Deleted" })))
}

/// Hands the lead to one of the organizer's own agents.
pub async fn assign_agent(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    WithRejection(Json(form), _): WithRejection<Json<AssignAgentForm>, AppError>,
) -> Result<Json<Lead>, AppError> {
    let organization_id = principal.require_organizer()?;
    let agent_id = form.validate()?;

    db::leads::find(&state.pool, id, &principal.lead_scope())
        .await?
        .ok_or_else(lead_not_found)?;

    let Some(lead) = db::leads::assign_agent(&state.pool, id, organization_id, agent_id).await?
    else {
        return Err(rejected_reference(&state, organization_id, Some(agent_id), None).await);
    };

    audit::log_event(
        &state.pool,
        &principal,
        "lead.assigned",
        "lead",
        Some(lead.id),
        Some(serde_json::json!({ "agent_id": agent_id })),
    )
    .await;

    Ok(Json(lead))
}

/// Re-tags a lead. Agents may do this for leads assigned to them.
pub async fn update_category(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    WithRejection(Json(form), _): WithRejection<Json<LeadCategoryForm>, AppError>,
) -> Result<Json<Lead>, AppError> {
    let scope = principal.lead_scope();

    db::leads::find(&state.pool, id, &scope)
        .await?
        .ok_or_else(lead_not_found)?;
    let category_id = form.validate()?;

    let Some(lead) = db::leads::set_category(&state.pool, id, &scope, category_id).await? else {
        return Err(rejected_reference(&state, scope.organization_id, None, category_id).await);
    };

    audit::log_event(
        &state.pool,
        &principal,
        "lead.category_updated",
        "lead",
        Some(lead.id),
        Some(serde_json::json!({ "category_id": category_id })),
    )
    .await;

    Ok(Json(lead))
}
