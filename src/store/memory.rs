//! In-memory store (non-persistent).

use super::{Budget, BudgetPatch, BudgetStore, Expense, ExpenseStore, NewBudget, NewExpense, StoreError};
use crate::month::MonthRange;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Keeps everything behind one pair of maps keyed by user id. Used by the
/// test suite and `STORE_BACKEND=memory` development runs.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    budgets: Arc<RwLock<HashMap<String, Vec<Budget>>>>,
    expenses: Arc<RwLock<HashMap<String, Vec<Expense>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BudgetStore for InMemoryStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn list(&self, user_id: &str, month: Option<&str>) -> Result<Vec<Budget>, StoreError> {
        let budgets = self.budgets.read().await;
        let mut rows: Vec<Budget> = budgets
            .get(user_id)
            .map(|b| b.as_slice())
            .unwrap_or_default()
            .iter()
            .filter(|b| month.map_or(true, |m| b.month == m))
            .cloned()
            .collect();
        if month.is_some() {
            rows.sort_by(|a, b| a.category.cmp(&b.category));
        } else {
            rows.sort_by(|a, b| b.month.cmp(&a.month));
        }
        Ok(rows)
    }

    async fn find_by_month_category(
        &self,
        user_id: &str,
        month: &str,
        category: &str,
    ) -> Result<Vec<Budget>, StoreError> {
        let budgets = self.budgets.read().await;
        Ok(budgets
            .get(user_id)
            .map(|b| b.as_slice())
            .unwrap_or_default()
            .iter()
            .filter(|b| b.month == month && b.category == category)
            .cloned()
            .collect())
    }

    async fn create(&self, user_id: &str, new: NewBudget) -> Result<Budget, StoreError> {
        let now = Utc::now();
        let budget = Budget {
            id: Uuid::new_v4(),
            amount: new.amount,
            month: new.month,
            category: new.category,
            created_at: now,
            updated_at: now,
        };
        self.budgets
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .push(budget.clone());
        Ok(budget)
    }

    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<Budget>, StoreError> {
        let budgets = self.budgets.read().await;
        Ok(budgets
            .get(user_id)
            .and_then(|rows| rows.iter().find(|b| b.id == id))
            .cloned())
    }

    async fn update(
        &self,
        user_id: &str,
        id: Uuid,
        patch: BudgetPatch,
    ) -> Result<Option<Budget>, StoreError> {
        let mut budgets = self.budgets.write().await;
        let Some(budget) = budgets
            .get_mut(user_id)
            .and_then(|rows| rows.iter_mut().find(|b| b.id == id))
        else {
            return Ok(None);
        };
        if let Some(amount) = patch.amount {
            budget.amount = amount;
        }
        if let Some(month) = patch.month {
            budget.month = month;
        }
        if let Some(category) = patch.category {
            budget.category = category;
        }
        budget.updated_at = Utc::now();
        Ok(Some(budget.clone()))
    }

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool, StoreError> {
        let mut budgets = self.budgets.write().await;
        let Some(rows) = budgets.get_mut(user_id) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|b| b.id != id);
        Ok(rows.len() != before)
    }
}

#[async_trait]
impl ExpenseStore for InMemoryStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn list_month(
        &self,
        user_id: &str,
        range: MonthRange,
    ) -> Result<Vec<Expense>, StoreError> {
        let expenses = self.expenses.read().await;
        let mut rows: Vec<Expense> = expenses
            .get(user_id)
            .map(|e| e.as_slice())
            .unwrap_or_default()
            .iter()
            .filter(|e| range.contains(e.date))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(rows)
    }

    async fn create(&self, user_id: &str, new: NewExpense) -> Result<Expense, StoreError> {
        let now = Utc::now();
        let expense = Expense {
            id: Uuid::new_v4(),
            amount: new.amount,
            category: new.category,
            date: new.date,
            note: new.note,
            created_at: now,
            updated_at: now,
        };
        self.expenses
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .push(expense.clone());
        Ok(expense)
    }

    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<Expense>, StoreError> {
        let expenses = self.expenses.read().await;
        Ok(expenses
            .get(user_id)
            .and_then(|rows| rows.iter().find(|e| e.id == id))
            .cloned())
    }

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool, StoreError> {
        let mut expenses = self.expenses.write().await;
        let Some(rows) = expenses.get_mut(user_id) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|e| e.id != id);
        Ok(rows.len() != before)
    }
}
