//! Monthly summary and report endpoints.
//!
//! These read the month's expenses and budgets through the store
//! adapters and hand them to the aggregation engine; nothing here is
//! persisted.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};

use super::auth::AuthUser;
use super::routes::AppState;
use crate::error::ApiError;
use crate::month::MonthRange;
use crate::report::{self, MonthlyReport, MonthlySummary};
use crate::store::{Budget, Expense};

/// GET /api/summary/{user_id}/{month}.
pub async fn summary(
    State(state): State<Arc<AppState>>,
    Path((_, month)): Path<(String, String)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> Result<Json<MonthlySummary>, ApiError> {
    let (expenses, budgets) = load_month(&state, &claims.sub, &month).await?;
    Ok(Json(report::compute_summary(&month, &expenses, &budgets)))
}

/// GET /api/report/{user_id}/{month}.
pub async fn report(
    State(state): State<Arc<AppState>>,
    Path((_, month)): Path<(String, String)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> Result<Json<MonthlyReport>, ApiError> {
    let (expenses, budgets) = load_month(&state, &claims.sub, &month).await?;
    Ok(Json(report::compute_report(&month, &expenses, &budgets)))
}

/// Fetch a month's expenses and budgets. The auth gate has already
/// checked that the verified subject owns the path, so the claims
/// subject is the scope.
async fn load_month(
    state: &AppState,
    user_id: &str,
    month: &str,
) -> Result<(Vec<Expense>, Vec<Budget>), ApiError> {
    let range = MonthRange::parse(month)
        .ok_or_else(|| ApiError::invalid("month", "Invalid month format. Use YYYY-MM"))?;
    let expenses = state.expenses.list_month(user_id, range).await?;
    let budgets = state.budgets.list(user_id, Some(month)).await?;
    Ok((expenses, budgets))
}
