//! Expense recording endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use super::routes::AppState;
use super::types::{
    CreateExpenseRequest, ExpenseListResponse, ExpenseResponse, MessageResponse, MonthQuery,
};
use crate::error::ApiError;
use crate::month::{current_month, MonthRange};
use crate::validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_expenses).post(create_expense))
        .route("/:expense_id", axum::routing::delete(delete_expense))
}

/// GET /api/users/{user_id}/expenses - expenses for a month (defaults to
/// the current month).
async fn list_expenses(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<ExpenseListResponse>, ApiError> {
    let month = query.month.unwrap_or_else(current_month);
    let range = MonthRange::parse(&month)
        .ok_or_else(|| ApiError::invalid("month", "Invalid month format. Use YYYY-MM"))?;

    let expenses = state.expenses.list_month(&user_id, range).await?;

    Ok(Json(ExpenseListResponse {
        total_count: expenses.len(),
        month,
        expenses,
    }))
}

/// POST /api/users/{user_id}/expenses - add an expense.
async fn create_expense(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    body: Option<Json<CreateExpenseRequest>>,
) -> Result<(StatusCode, Json<ExpenseResponse>), ApiError> {
    let Some(Json(req)) = body else {
        return Err(ApiError::invalid("body", "No data provided"));
    };
    let new = validate::new_expense(&req)?;

    let expense = state.expenses.create(&user_id, new).await?;
    tracing::info!(
        user = %user_id,
        amount = %expense.amount,
        category = %expense.category,
        "expense added"
    );

    Ok((
        StatusCode::CREATED,
        Json(ExpenseResponse {
            message: "Expense added successfully",
            expense,
        }),
    ))
}

/// DELETE /api/users/{user_id}/expenses/{expense_id}.
async fn delete_expense(
    State(state): State<Arc<AppState>>,
    Path((user_id, expense_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = Uuid::parse_str(&expense_id).map_err(|_| ApiError::NotFound("Expense"))?;
    let removed = state.expenses.delete(&user_id, id).await?;
    if !removed {
        return Err(ApiError::NotFound("Expense"));
    }
    tracing::info!(user = %user_id, expense = %id, "expense deleted");

    Ok(Json(MessageResponse {
        message: "Expense deleted successfully",
    }))
}
