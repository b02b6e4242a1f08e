//! Budget management endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::routes::AppState;
use super::types::{
    BudgetListResponse, BudgetResponse, CreateBudgetRequest, MessageResponse, MonthQuery,
    UpdateBudgetRequest,
};
use crate::error::ApiError;
use crate::validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_budgets).post(create_budget))
        .route(
            "/:budget_id",
            axum::routing::put(update_budget).delete(delete_budget),
        )
}

/// GET /api/users/{user_id}/budgets - budgets for a month, or all months.
async fn list_budgets(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<BudgetListResponse>, ApiError> {
    let budgets = state
        .budgets
        .list(&user_id, query.month.as_deref())
        .await?;
    let total_budget: Decimal = budgets.iter().map(|b| b.amount).sum();

    tracing::debug!(user = %user_id, count = budgets.len(), "listed budgets");

    Ok(Json(BudgetListResponse {
        month: query.month.unwrap_or_else(|| "all".to_string()),
        total_budget: total_budget.round_dp(2),
        count: budgets.len(),
        budgets,
    }))
}

/// POST /api/users/{user_id}/budgets - create a budget.
async fn create_budget(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    body: Option<Json<CreateBudgetRequest>>,
) -> Result<(StatusCode, Json<BudgetResponse>), ApiError> {
    let Some(Json(req)) = body else {
        return Err(ApiError::invalid("body", "No data provided"));
    };
    let new = validate::new_budget(&req)?;

    // Check-then-create is not atomic: two concurrent creates for the
    // same (month, category) can both pass this check.
    let existing = state
        .budgets
        .find_by_month_category(&user_id, &new.month, &new.category)
        .await?;
    if !existing.is_empty() {
        return Err(ApiError::Conflict);
    }

    let budget = state.budgets.create(&user_id, new).await?;
    tracing::info!(user = %user_id, budget = %budget.id, "budget created");

    Ok((
        StatusCode::CREATED,
        Json(BudgetResponse {
            message: "Budget created successfully",
            budget,
        }),
    ))
}

/// PUT /api/users/{user_id}/budgets/{budget_id} - partial update.
async fn update_budget(
    State(state): State<Arc<AppState>>,
    Path((user_id, budget_id)): Path<(String, String)>,
    body: Option<Json<UpdateBudgetRequest>>,
) -> Result<Json<BudgetResponse>, ApiError> {
    let Some(Json(req)) = body else {
        return Err(ApiError::invalid("body", "No data provided"));
    };
    // An id that is not a UUID cannot name a stored budget.
    let id = Uuid::parse_str(&budget_id).map_err(|_| ApiError::NotFound("Budget"))?;
    let patch = validate::budget_patch(&req)?;

    let budget = state
        .budgets
        .update(&user_id, id, patch)
        .await?
        .ok_or(ApiError::NotFound("Budget"))?;
    tracing::info!(user = %user_id, budget = %budget.id, "budget updated");

    Ok(Json(BudgetResponse {
        message: "Budget updated successfully",
        budget,
    }))
}

/// DELETE /api/users/{user_id}/budgets/{budget_id}.
async fn delete_budget(
    State(state): State<Arc<AppState>>,
    Path((user_id, budget_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = Uuid::parse_str(&budget_id).map_err(|_| ApiError::NotFound("Budget"))?;
    let removed = state.budgets.delete(&user_id, id).await?;
    if !removed {
        return Err(ApiError::NotFound("Budget"));
    }
    tracing::info!(user = %user_id, budget = %id, "budget deleted");

    Ok(Json(MessageResponse {
        message: "Budget deleted successfully",
    }))
}
