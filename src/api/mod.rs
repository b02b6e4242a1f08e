//! HTTP API for the finance tracker.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check (no auth)
//! - `GET /api/users/{user_id}/budgets` - List budgets, optional `?month=`
//! - `POST /api/users/{user_id}/budgets` - Create a budget
//! - `PUT /api/users/{user_id}/budgets/{budget_id}` - Update a budget
//! - `DELETE /api/users/{user_id}/budgets/{budget_id}` - Delete a budget
//! - `GET /api/users/{user_id}/expenses` - List a month's expenses
//! - `POST /api/users/{user_id}/expenses` - Add an expense
//! - `DELETE /api/users/{user_id}/expenses/{expense_id}` - Delete an expense
//! - `GET /api/summary/{user_id}/{month}` - Monthly summary
//! - `GET /api/report/{user_id}/{month}` - Category report with chart data

mod analytics;
mod auth;
mod budgets;
mod expenses;
mod routes;
pub mod types;

pub use auth::AuthUser;
pub use routes::{serve, AppState};
