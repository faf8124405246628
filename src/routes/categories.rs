use axum::Json;
use axum::extract::{Path, State};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use uuid::Uuid;

use crate::access::Principal;
use crate::db;
use crate::error::{AppError, unique_violation_as_field};
use crate::forms::CategoryForm;
use crate::middleware::audit;
use crate::models::{Category, CategoryWithCount, LeadSummary};
use crate::state::SharedState;

const DUPLICATE_NAME: &str = "A category with this name already exists.";

#[derive(Serialize)]
pub struct CategoryList {
    pub categories: Vec<CategoryWithCount>,
    pub uncategorized_count: i64,
}

#[derive(Serialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub leads: Vec<LeadSummary>,
}

fn category_not_found() -> AppError {
    AppError::NotFound("Category not found".to_string())
}

pub async fn list(
    principal: Principal,
    State(state): State<SharedState>,
) -> Result<Json<CategoryList>, AppError> {
    let scope = principal.lead_scope();
    let categories = db::categories::list_with_counts(&state.pool, &scope).await?;
    let uncategorized_count = db::categories::count_uncategorized(&state.pool, &scope).await?;

    Ok(Json(CategoryList {
        categories,
        uncategorized_count,
    }))
}

/// The category and the leads in it that the caller may see.
pub async fn get(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CategoryDetail>, AppError> {
    let scope = principal.lead_scope();

    let category = db::categories::find(&state.pool, id, scope.organization_id)
        .await?
        .ok_or_else(category_not_found)?;
    let leads = db::leads::list_by_category(&state.pool, &scope, category.id).await?;

    Ok(Json(CategoryDetail { category, leads }))
}

pub async fn create(
    principal: Principal,
    State(state): State<SharedState>,
    WithRejection(Json(form), _): WithRejection<Json<CategoryForm>, AppError>,
) -> Result<Json<Category>, AppError> {
    let organization_id = principal.require_organizer()?;
    let name = form.validate()?;

    let category = db::categories::create(&state.pool, organization_id, &name)
        .await
        .map_err(|e| unique_violation_as_field(e, "name", DUPLICATE_NAME))?;

    audit::log_event(
        &state.pool,
        &principal,
        "category.created",
        "category",
        Some(category.id),
        None,
    )
    .await;

    Ok(Json(category))
}

pub async fn update(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    WithRejection(Json(form), _): WithRejection<Json<CategoryForm>, AppError>,
) -> Result<Json<Category>, AppError> {
    let organization_id = principal.require_organizer()?;
    let name = form.validate()?;

    let category = db::categories::update(&state.pool, id, organization_id, &name)
        .await
        .map_err(|e| unique_violation_as_field(e, "name", DUPLICATE_NAME))?
        .ok_or_else(category_not_found)?;

    audit::log_event(
        &state.pool,
        &principal,
        "category.updated",
        "category",
        Some(category.id),
        None,
    )
    .await;

    Ok(Json(category))
}

/// Leads in the category survive with their category unset.
pub async fn delete(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let organization_id = principal.require_organizer()?;

    if !db::categories::delete(&state.pool, id, organization_id).await? {
        return Err(category_not_found());
    }

    audit::log_event(&state.pool, &principal, "category.deleted", "category", Some(id), None).await;

    Ok(Json(serde_json::json!({ "message": "Deleted" })))
}
