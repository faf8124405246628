use askama::Template;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse};
use uuid::Uuid;

use crate::access::Principal;
use crate::db;
use crate::error::AppError;
use crate::models::CategoryWithCount;
use crate::state::SharedState;
use crate::views::{LeadRow, Nav, lead_rows};

#[derive(Template)]
#[template(path = "categories/list.html")]
struct CategoryListTemplate {
    user_name: String,
    is_organizer: bool,
    categories: Vec<CategoryWithCount>,
    uncategorized_count: i64,
}

#[derive(Template)]
#[template(path = "categories/detail.html")]
struct CategoryDetailTemplate {
    user_name: String,
    is_organizer: bool,
    category_id: String,
    name: String,
    leads: Vec<LeadRow>,
}

pub async fn list_page(
    principal: Principal,
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, AppError> {
    let scope = principal.lead_scope();
    let nav = Nav::load(&state, &principal).await?;

    let categories = db::categories::list_with_counts(&state.pool, &scope).await?;
    let uncategorized_count = db::categories::count_uncategorized(&state.pool, &scope).await?;

    let template = CategoryListTemplate {
        user_name: nav.user_name,
        is_organizer: nav.is_organizer,
        categories,
        uncategorized_count,
    };
    Ok(Html(template.render().unwrap_or_default()))
}

pub async fn detail_page(
    principal: Principal,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let scope = principal.lead_scope();
    let category = db::categories::find(&state.pool, id, scope.organization_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;
    let leads = db::leads::list_by_category(&state.pool, &scope, category.id).await?;

    let nav = Nav::load(&state, &principal).await?;

    let template = CategoryDetailTemplate {
        user_name: nav.user_name,
        is_organizer: nav.is_organizer,
        category_id: category.id.to_string(),
        name: category.name,
        leads: lead_rows(&leads),
    };
    Ok(Html(template.render().unwrap_or_default()))
}
