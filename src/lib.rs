//! # Finance Tracker Backend
//!
//! REST backend for a personal finance tracker: authenticated users
//! record expenses, set monthly category budgets, and pull aggregated
//! summaries and reports.
//!
//! ## Request Flow
//!
//! ```text
//!   HTTP request
//!        │
//!        ▼
//!   Auth gate ──── verifies the bearer token and that the caller
//!        │         owns the {user_id} in the path
//!        ▼
//!   Validation ─── normalizes amounts, months, categories, dates
//!        │
//!        ▼
//!   Store adapter ─ per-user budget/expense CRUD (memory or SQLite)
//!        │
//!        ▼
//!   Aggregation ── summary / report computation (analytics routes)
//!        │
//!        ▼
//!   JSON response
//! ```
//!
//! ## Modules
//! - `api`: HTTP surface, auth middleware, server composition
//! - `store`: storage traits and the memory/SQLite backends
//! - `report`: pure aggregation over a month's expenses and budgets
//! - `validate`: payload validation in canonical field order
//! - `identity`: token verification against the identity provider
//! - `month`: `YYYY-MM` parsing and calendar-range math

pub mod api;
pub mod config;
pub mod error;
pub mod identity;
pub mod month;
pub mod report;
pub mod store;
pub mod validate;

pub use config::Config;
