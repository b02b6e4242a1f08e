//! API request and response types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::store::{Budget, Expense};

/// Body for `POST /api/users/{user_id}/budgets`.
///
/// `amount` stays a raw JSON value so the validation layer can accept both
/// numbers and numeric strings and report field-level errors itself.
#[derive(Debug, Deserialize)]
pub struct CreateBudgetRequest {
    pub amount: Option<serde_json::Value>,
    pub month: Option<String>,
    pub category: Option<String>,
}

/// Partial body for `PUT /api/users/{user_id}/budgets/{budget_id}`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBudgetRequest {
    pub amount: Option<serde_json::Value>,
    pub month: Option<String>,
    pub category: Option<String>,
}

/// Body for `POST /api/users/{user_id}/expenses`.
#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    pub amount: Option<serde_json::Value>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub note: Option<String>,
}

/// `?month=YYYY-MM` filter.
#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub month: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BudgetListResponse {
    pub budgets: Vec<Budget>,
    /// The requested month, or `"all"` when unfiltered
    pub month: String,
    pub total_budget: Decimal,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct BudgetResponse {
    pub message: &'static str,
    pub budget: Budget,
}

#[derive(Debug, Serialize)]
pub struct ExpenseListResponse {
    pub expenses: Vec<Expense>,
    pub month: String,
    pub total_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ExpenseResponse {
    pub message: &'static str,
    pub expense: Expense,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub service: &'static str,
    pub version: &'static str,
}
