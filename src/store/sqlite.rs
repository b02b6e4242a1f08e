//! SQLite-backed budget and expense store.

use super::{
    Budget, BudgetPatch, BudgetStore, Expense, ExpenseStore, NewBudget, NewExpense, StoreError,
};
use crate::month::MonthRange;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS budgets (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    amount TEXT NOT NULL,
    month TEXT NOT NULL,
    category TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_budgets_user_month ON budgets(user_id, month);

CREATE TABLE IF NOT EXISTS expenses (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    amount TEXT NOT NULL,
    category TEXT NOT NULL,
    date TEXT NOT NULL,
    note TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_expenses_user_date ON expenses(user_id, date);
"#;

/// Bounded retries for busy/locked errors before surfacing `Unavailable`.
const MAX_RETRIES: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    timeout: Duration,
}

impl SqliteStore {
    pub async fn new(db_path: PathBuf, timeout: Duration) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::Backend(format!("create data dir: {}", e)))?;
            }
        }

        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)
                .map_err(|e| StoreError::Backend(format!("open database: {}", e)))?;
            conn.execute_batch(SCHEMA)
                .map_err(|e| StoreError::Backend(format!("run schema: {}", e)))?;
            Ok::<_, StoreError>(conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("task join error: {}", e)))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            timeout,
        })
    }

    /// Run one store operation on the blocking pool, with bounded retries
    /// for transient errors and an overall timeout.
    async fn call<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: Fn(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let task = tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut attempt = 0;
            loop {
                match f(&conn) {
                    Err(e) if is_transient(&e) && attempt < MAX_RETRIES => {
                        attempt += 1;
                        std::thread::sleep(RETRY_BACKOFF);
                    }
                    other => return other,
                }
            }
        });

        match tokio::time::timeout(self.timeout, task).await {
            Err(_) => Err(StoreError::Timeout),
            Ok(Err(join)) => Err(StoreError::Backend(format!("task join error: {}", join))),
            Ok(Ok(result)) => result.map_err(classify),
        }
    }
}

fn is_transient(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked)
    )
}

fn classify(err: rusqlite::Error) -> StoreError {
    if is_transient(&err) {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Backend(err.to_string())
    }
}

fn conversion_err(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn budget_from_row(row: &Row<'_>) -> rusqlite::Result<Budget> {
    let id: String = row.get(0)?;
    let amount: String = row.get(1)?;
    let created_at: String = row.get(4)?;
    let updated_at: String = row.get(5)?;
    Ok(Budget {
        id: Uuid::parse_str(&id).map_err(|e| conversion_err(0, e))?,
        amount: amount.parse::<Decimal>().map_err(|e| conversion_err(1, e))?,
        month: row.get(2)?,
        category: row.get(3)?,
        created_at: parse_timestamp(&created_at).map_err(|e| conversion_err(4, e))?,
        updated_at: parse_timestamp(&updated_at).map_err(|e| conversion_err(5, e))?,
    })
}

fn expense_from_row(row: &Row<'_>) -> rusqlite::Result<Expense> {
    let id: String = row.get(0)?;
    let amount: String = row.get(1)?;
    let date: String = row.get(3)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;
    Ok(Expense {
        id: Uuid::parse_str(&id).map_err(|e| conversion_err(0, e))?,
        amount: amount.parse::<Decimal>().map_err(|e| conversion_err(1, e))?,
        category: row.get(2)?,
        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| conversion_err(3, e))?,
        note: row.get(4)?,
        created_at: parse_timestamp(&created_at).map_err(|e| conversion_err(5, e))?,
        updated_at: parse_timestamp(&updated_at).map_err(|e| conversion_err(6, e))?,
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl BudgetStore for SqliteStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn list(&self, user_id: &str, month: Option<&str>) -> Result<Vec<Budget>, StoreError> {
        let user_id = user_id.to_string();
        let month = month.map(|m| m.to_string());
        self.call(move |conn| {
            let mut rows = Vec::new();
            match &month {
                Some(m) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, amount, month, category, created_at, updated_at
                         FROM budgets WHERE user_id = ?1 AND month = ?2
                         ORDER BY category",
                    )?;
                    let mapped = stmt.query_map(params![user_id, m], budget_from_row)?;
                    for budget in mapped {
                        rows.push(budget?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, amount, month, category, created_at, updated_at
                         FROM budgets WHERE user_id = ?1
                         ORDER BY month DESC",
                    )?;
                    let mapped = stmt.query_map(params![user_id], budget_from_row)?;
                    for budget in mapped {
                        rows.push(budget?);
                    }
                }
            }
            Ok(rows)
        })
        .await
    }

    async fn find_by_month_category(
        &self,
        user_id: &str,
        month: &str,
        category: &str,
    ) -> Result<Vec<Budget>, StoreError> {
        let user_id = user_id.to_string();
        let month = month.to_string();
        let category = category.to_string();
        self.call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, amount, month, category, created_at, updated_at
                 FROM budgets WHERE user_id = ?1 AND month = ?2 AND category = ?3",
            )?;
            let mapped = stmt.query_map(params![user_id, month, category], budget_from_row)?;
            let mut rows = Vec::new();
            for budget in mapped {
                rows.push(budget?);
            }
            Ok(rows)
        })
        .await
    }

    async fn create(&self, user_id: &str, new: NewBudget) -> Result<Budget, StoreError> {
        let budget = Budget {
            id: Uuid::new_v4(),
            amount: new.amount,
            month: new.month,
            category: new.category,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let user_id = user_id.to_string();
        let row = budget.clone();
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO budgets (id, user_id, amount, month, category, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    row.id.to_string(),
                    user_id,
                    row.amount.to_string(),
                    row.month,
                    row.category,
                    row.created_at.to_rfc3339(),
                    row.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await?;
        Ok(budget)
    }

    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<Budget>, StoreError> {
        let user_id = user_id.to_string();
        self.call(move |conn| {
            conn.query_row(
                "SELECT id, amount, month, category, created_at, updated_at
                 FROM budgets WHERE user_id = ?1 AND id = ?2",
                params![user_id, id.to_string()],
                budget_from_row,
            )
            .optional()
        })
        .await
    }

    async fn update(
        &self,
        user_id: &str,
        id: Uuid,
        patch: BudgetPatch,
    ) -> Result<Option<Budget>, StoreError> {
        let user_id = user_id.to_string();
        self.call(move |conn| {
            let existing = conn
                .query_row(
                    "SELECT id, amount, month, category, created_at, updated_at
                     FROM budgets WHERE user_id = ?1 AND id = ?2",
                    params![user_id, id.to_string()],
                    budget_from_row,
                )
                .optional()?;
            let Some(mut budget) = existing else {
                return Ok(None);
            };
            if let Some(amount) = patch.amount {
                budget.amount = amount;
            }
            if let Some(month) = &patch.month {
                budget.month = month.clone();
            }
            if let Some(category) = &patch.category {
                budget.category = category.clone();
            }
            budget.updated_at = Utc::now();
            conn.execute(
                "UPDATE budgets SET amount = ?1, month = ?2, category = ?3, updated_at = ?4
                 WHERE user_id = ?5 AND id = ?6",
                params![
                    budget.amount.to_string(),
                    budget.month,
                    budget.category,
                    budget.updated_at.to_rfc3339(),
                    user_id,
                    id.to_string(),
                ],
            )?;
            Ok(Some(budget))
        })
        .await
    }

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool, StoreError> {
        let user_id = user_id.to_string();
        self.call(move |conn| {
            let affected = conn.execute(
                "DELETE FROM budgets WHERE user_id = ?1 AND id = ?2",
                params![user_id, id.to_string()],
            )?;
            Ok(affected > 0)
        })
        .await
    }
}

#[async_trait]
impl ExpenseStore for SqliteStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn list_month(
        &self,
        user_id: &str,
        range: MonthRange,
    ) -> Result<Vec<Expense>, StoreError> {
        let user_id = user_id.to_string();
        // Dates are zero-padded ISO strings, so lexicographic range
        // comparison matches chronological order.
        let start = range.start.date().format("%Y-%m-%d").to_string();
        let end = range.end.date().format("%Y-%m-%d").to_string();
        self.call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, amount, category, date, note, created_at, updated_at
                 FROM expenses WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date DESC, created_at DESC",
            )?;
            let mapped = stmt.query_map(params![user_id, start, end], expense_from_row)?;
            let mut rows = Vec::new();
            for expense in mapped {
                rows.push(expense?);
            }
            Ok(rows)
        })
        .await
    }

    async fn create(&self, user_id: &str, new: NewExpense) -> Result<Expense, StoreError> {
        let expense = Expense {
            id: Uuid::new_v4(),
            amount: new.amount,
            category: new.category,
            date: new.date,
            note: new.note,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let user_id = user_id.to_string();
        let row = expense.clone();
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO expenses (id, user_id, amount, category, date, note, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    row.id.to_string(),
                    user_id,
                    row.amount.to_string(),
                    row.category,
                    row.date.format("%Y-%m-%d").to_string(),
                    row.note,
                    row.created_at.to_rfc3339(),
                    row.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await?;
        Ok(expense)
    }

    async fn get(&self, user_id: &str, id: Uuid) -> Result<Option<Expense>, StoreError> {
        let user_id = user_id.to_string();
        self.call(move |conn| {
            conn.query_row(
                "SELECT id, amount, category, date, note, created_at, updated_at
                 FROM expenses WHERE user_id = ?1 AND id = ?2",
                params![user_id, id.to_string()],
                expense_from_row,
            )
            .optional()
        })
        .await
    }

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<bool, StoreError> {
        let user_id = user_id.to_string();
        self.call(move |conn| {
            let affected = conn.execute(
                "DELETE FROM expenses WHERE user_id = ?1 AND id = ?2",
                params![user_id, id.to_string()],
            )?;
            Ok(affected > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn open_store(dir: &tempfile::TempDir) -> SqliteStore {
        SqliteStore::new(dir.path().join("test.db"), Duration::from_secs(5))
            .await
            .expect("open store")
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn budget_round_trip_and_ordering() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;

        for cat in ["Transport", "Food"] {
            BudgetStore::create(
                &store,
                "u1",
                NewBudget {
                    amount: dec("100"),
                    month: "2024-03".to_string(),
                    category: cat.to_string(),
                },
            )
            .await
            .unwrap();
        }

        let listed = store.list("u1", Some("2024-03")).await.unwrap();
        let cats: Vec<&str> = listed.iter().map(|b| b.category.as_str()).collect();
        assert_eq!(cats, ["Food", "Transport"]);
        assert_eq!(listed[0].amount, dec("100"));
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persist.db");

        {
            let store = SqliteStore::new(path.clone(), Duration::from_secs(5))
                .await
                .unwrap();
            BudgetStore::create(
                &store,
                "u1",
                NewBudget {
                    amount: dec("250.50"),
                    month: "2024-03".to_string(),
                    category: "Food".to_string(),
                },
            )
            .await
            .unwrap();
        }

        let store = SqliteStore::new(path, Duration::from_secs(5)).await.unwrap();
        let listed = store.list("u1", Some("2024-03")).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].amount, dec("250.50"));
    }

    #[tokio::test]
    async fn update_merges_partial_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;

        let created = BudgetStore::create(
            &store,
            "u1",
            NewBudget {
                amount: dec("500"),
                month: "2024-03".to_string(),
                category: "Food".to_string(),
            },
        )
        .await
        .unwrap();

        let updated = store
            .update(
                "u1",
                created.id,
                BudgetPatch {
                    category: Some("Groceries".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.category, "Groceries");
        assert_eq!(updated.amount, dec("500"));
        assert_eq!(updated.month, "2024-03");
    }

    #[tokio::test]
    async fn expense_month_filter_uses_calendar_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;

        for date in ["2024-01-31", "2024-02-01", "2024-02-29", "2024-03-01"] {
            ExpenseStore::create(
                &store,
                "u1",
                NewExpense {
                    amount: dec("10"),
                    category: "Food".to_string(),
                    date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
                    note: None,
                },
            )
            .await
            .unwrap();
        }

        let range = MonthRange::parse("2024-02").unwrap();
        let listed = store.list_month("u1", range).await.unwrap();
        let dates: Vec<String> = listed
            .iter()
            .map(|e| e.date.format("%Y-%m-%d").to_string())
            .collect();
        assert_eq!(dates, ["2024-02-29", "2024-02-01"]);
    }

    #[tokio::test]
    async fn rows_are_scoped_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;

        let created = BudgetStore::create(
            &store,
            "u1",
            NewBudget {
                amount: dec("500"),
                month: "2024-03".to_string(),
                category: "Food".to_string(),
            },
        )
        .await
        .unwrap();

        assert!(BudgetStore::get(&store, "u2", created.id)
            .await
            .unwrap()
            .is_none());
        assert!(!BudgetStore::delete(&store, "u2", created.id).await.unwrap());
    }
}
