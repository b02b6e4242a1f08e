//! Request payload validation.
//!
//! Each write operation validates its fields in a fixed canonical order
//! and fails on the first missing or invalid one, so clients always see
//! the earliest problem. Validators normalize as they go (trimming,
//! string-to-number coercion) and hand typed values to the store layer.

use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::api::types::{CreateBudgetRequest, CreateExpenseRequest, UpdateBudgetRequest};
use crate::error::ApiError;
use crate::store::{BudgetPatch, NewBudget, NewExpense};

fn missing(field: &'static str) -> ApiError {
    ApiError::invalid(field, format!("Missing required field: {}", field))
}

/// Amounts arrive as JSON numbers or numeric strings; both must resolve
/// to a positive decimal.
pub fn amount(value: &Value) -> Result<Decimal, ApiError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64().and_then(Decimal::from_f64),
        Value::String(s) => s.trim().parse::<Decimal>().ok(),
        _ => None,
    };
    let amount =
        parsed.ok_or_else(|| ApiError::invalid("amount", "Invalid amount format"))?;
    if amount <= Decimal::ZERO {
        return Err(ApiError::invalid("amount", "Amount must be positive"));
    }
    Ok(amount)
}

/// A month is two dash-separated integer components (`YYYY-MM`).
pub fn month(value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    let parts: Vec<&str> = trimmed.split('-').collect();
    let well_formed = parts.len() == 2
        && parts[0].parse::<i32>().is_ok()
        && parts[1].parse::<u32>().is_ok();
    if !well_formed {
        return Err(ApiError::invalid("month", "Invalid month format. Use YYYY-MM"));
    }
    Ok(trimmed.to_string())
}

pub fn category(value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::invalid("category", "Category is required"));
    }
    Ok(trimmed.to_string())
}

pub fn date(value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::invalid("date", "Invalid date format. Use YYYY-MM-DD"))
}

/// Canonical order for budgets: amount, month, category.
pub fn new_budget(req: &CreateBudgetRequest) -> Result<NewBudget, ApiError> {
    let amount = amount(req.amount.as_ref().ok_or_else(|| missing("amount"))?)?;
    let month = month(req.month.as_deref().ok_or_else(|| missing("month"))?)?;
    let category = category(req.category.as_deref().ok_or_else(|| missing("category"))?)?;
    Ok(NewBudget {
        amount,
        month,
        category,
    })
}

/// Only fields present in the body are validated and merged; an empty
/// patch still refreshes `updated_at` downstream.
pub fn budget_patch(req: &UpdateBudgetRequest) -> Result<BudgetPatch, ApiError> {
    let mut patch = BudgetPatch::default();
    if let Some(value) = &req.amount {
        patch.amount = Some(amount(value)?);
    }
    if let Some(value) = &req.month {
        patch.month = Some(month(value)?);
    }
    if let Some(value) = &req.category {
        patch.category = Some(category(value)?);
    }
    Ok(patch)
}

/// Canonical order for expenses: amount, category, date.
pub fn new_expense(req: &CreateExpenseRequest) -> Result<NewExpense, ApiError> {
    let amount = amount(req.amount.as_ref().ok_or_else(|| missing("amount"))?)?;
    let category = category(req.category.as_deref().ok_or_else(|| missing("category"))?)?;
    let date = date(req.date.as_deref().ok_or_else(|| missing("date"))?)?;
    let note = req
        .note
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);
    Ok(NewExpense {
        amount,
        category,
        date,
        note,
    })
}
