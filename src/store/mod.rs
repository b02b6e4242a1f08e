//! Storage adapters with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing)
//! - `sqlite`: SQLite database file
//!
//! Every operation is scoped under the owning user's id; there is no
//! cross-user query capability. The document store itself is an external
//! concern - these traits are the boundary the rest of the service sees.

mod memory;
mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::month::MonthRange;

/// A monthly category budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub amount: Decimal,
    /// Month in `YYYY-MM` form
    pub month: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single recorded expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub amount: Decimal,
    pub category: String,
    /// Calendar date of the expense, serialized as `YYYY-MM-DD`
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for creating a budget.
#[derive(Debug, Clone)]
pub struct NewBudget {
    pub amount: Decimal,
    pub month: String,
    pub category: String,
}

/// Validated partial update for a budget. `None` fields keep the stored
/// value; `updated_at` is always refreshed.
#[derive(Debug, Clone, Default)]
pub struct BudgetPatch {
    pub amount: Option<Decimal>,
    pub month: Option<String>,
    pub category: Option<String>,
}

/// Validated input for creating an expense.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub amount: Decimal,
    pub category: String,
    pub date: NaiveDate,
    pub note: Option<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The call exceeded the configured store timeout.
    #[error("store call timed out")]
    Timeout,

    /// Transient backend failure that exhausted its retries.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Non-transient backend failure.
    #[error("store error: {0}")]
    Backend(String),
}

/// Budget store adapter - implemented by all storage backends.
#[async_trait]
pub trait BudgetStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// List budgets. With a month filter, results are ordered by category;
    /// without one, by month descending.
    async fn list(&self, user_id: &str, month: Option<&str>) -> Result<Vec<Budget>, StoreError>;

    /// Budgets matching an exact (month, category) pair. Used by the
    /// duplicate check before create.
    async fn find_by_month_category(
        &self,
        user_id: &str,
        month: &str,
        category: &str,
    ) -> Result<Vec<Budget>, StoreError>;

    /// Create a new budget.
    async fn create(&self, user_id: &str, new: NewBudget) -> Result<Budget, StoreError>;

    /// Get a single budget by id.
    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<Budget>, StoreError>;

    /// Merge a partial update into a budget. Returns the updated record,
    /// or `None` if the id does not exist.
    async fn update(
        &self,
        user_id: &str,
        id: Uuid,
        patch: BudgetPatch,
    ) -> Result<Option<Budget>, StoreError>;

    /// Delete a budget. Returns whether a record was removed.
    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool, StoreError>;
}

/// Expense store adapter - implemented by all storage backends.
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// Expenses whose date falls inside the month range, ordered by date
    /// descending (ties by created_at descending).
    async fn list_month(
        &self,
        user_id: &str,
        range: MonthRange,
    ) -> Result<Vec<Expense>, StoreError>;

    /// Create a new expense.
    async fn create(&self, user_id: &str, new: NewExpense) -> Result<Expense, StoreError>;

    /// Get a single expense by id.
    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<Expense>, StoreError>;

    /// Delete an expense. Returns whether a record was removed.
    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool, StoreError>;
}
