//! Server composition: shared state, router, startup, shutdown.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{middleware, routing::get, Json, Router};
use chrono::Utc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::types::HealthResponse;
use super::{analytics, auth, budgets, expenses};
use crate::config::{Config, StoreBackend};
use crate::identity::{JwtVerifier, TokenVerifier};
use crate::store::{BudgetStore, ExpenseStore, InMemoryStore, SqliteStore, StoreError};

/// Shared application state, built once at startup.
pub struct AppState {
    pub config: Config,
    pub budgets: Arc<dyn BudgetStore>,
    pub expenses: Arc<dyn ExpenseStore>,
    pub verifier: Arc<dyn TokenVerifier>,
}

impl AppState {
    /// Initialize stores and the token verifier from config.
    pub async fn from_config(config: Config) -> Result<Self, StoreError> {
        let (budgets, expenses): (Arc<dyn BudgetStore>, Arc<dyn ExpenseStore>) =
            match &config.store {
                StoreBackend::Memory => {
                    tracing::info!("Using in-memory store (non-persistent)");
                    let store = Arc::new(InMemoryStore::new());
                    (store.clone(), store)
                }
                StoreBackend::Sqlite(path) => {
                    tracing::info!("Using SQLite store at {}", path.display());
                    let store =
                        Arc::new(SqliteStore::new(path.clone(), config.store_timeout).await?);
                    (store.clone(), store)
                }
            };

        let verifier = Arc::new(JwtVerifier::new(&config.jwt_secret));

        Ok(Self {
            config,
            budgets,
            expenses,
            verifier,
        })
    }
}

/// Build the full application router.
pub(super) fn router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new().route("/health", get(health));

    let protected_routes = Router::new()
        .nest("/api/users/:user_id/budgets", budgets::routes())
        .nest("/api/users/:user_id/expenses", expenses::routes())
        .route("/api/summary/:user_id/:month", get(analytics::summary))
        .route("/api/report/:user_id/:month", get(analytics::report))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    match config.cors_origin.as_deref() {
        Some(origin) => match origin.parse::<HeaderValue>() {
            Ok(value) => CorsLayer::new()
                .allow_origin(value)
                .allow_methods(Any)
                .allow_headers(Any),
            Err(_) => {
                tracing::warn!("Invalid CORS_ORIGIN {:?}, allowing any origin", origin);
                CorsLayer::permissive()
            }
        },
        None => CorsLayer::permissive(),
    }
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::from_config(config).await?);
    if !state.budgets.is_persistent() {
        tracing::warn!("Store is non-persistent; data is lost on restart");
    }
    let app = router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// GET /health - liveness probe, no auth.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
        service: "Finance Tracker Backend",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Wait for SIGINT/SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping server");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::test_support::issue_token;
    use chrono::Duration;
    use serde_json::{json, Value};

    const SECRET: &str = "test-secret";

    async fn spawn_app() -> String {
        let config = Config::new(SECRET.to_string(), StoreBackend::Memory);
        let state = Arc::new(AppState::from_config(config).await.unwrap());
        let app = router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", addr)
    }

    fn token_for(user: &str) -> String {
        issue_token(SECRET, user, Duration::hours(1))
    }

    #[tokio::test]
    async fn health_needs_no_auth() {
        let base = spawn_app().await;
        let resp = reqwest::get(format!("{}/health", base)).await.unwrap();
        assert_eq!(resp.status(), 200);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "Finance Tracker Backend");
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let base = spawn_app().await;
        let client = reqwest::Client::new();

        let resp = client
            .get(format!("{}/api/users/user-1/budgets", base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 401);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Authorization header missing");
    }

    #[tokio::test]
    async fn garbage_token_is_unauthorized() {
        let base = spawn_app().await;
        let client = reqwest::Client::new();

        let resp = client
            .get(format!("{}/api/users/user-1/budgets", base))
            .bearer_auth("garbage")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 401);
    }

    #[tokio::test]
    async fn cross_user_access_is_forbidden() {
        let base = spawn_app().await;
        let client = reqwest::Client::new();

        let resp = client
            .get(format!("{}/api/users/user-2/budgets", base))
            .bearer_auth(token_for("user-1"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 403);
    }

    #[tokio::test]
    async fn budget_create_list_update_delete_flow() {
        let base = spawn_app().await;
        let client = reqwest::Client::new();
        let token = token_for("user-1");

        // Create
        let resp = client
            .post(format!("{}/api/users/user-1/budgets", base))
            .bearer_auth(&token)
            .json(&json!({"amount": 500, "month": "2024-03", "category": "Food"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        let created: Value = resp.json().await.unwrap();
        assert_eq!(created["message"], "Budget created successfully");
        let budget_id = created["budget"]["id"].as_str().unwrap().to_string();

        // Duplicate (month, category) is rejected
        let resp = client
            .post(format!("{}/api/users/user-1/budgets", base))
            .bearer_auth(&token)
            .json(&json!({"amount": 300, "month": "2024-03", "category": "Food"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(
            body["error"],
            "Budget already exists for this category and month"
        );

        // List
        let resp = client
            .get(format!("{}/api/users/user-1/budgets?month=2024-03", base))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        let listed: Value = resp.json().await.unwrap();
        assert_eq!(listed["count"], 1);
        assert_eq!(listed["total_budget"], 500.0);
        assert_eq!(listed["month"], "2024-03");

        // Partial update keeps unnamed fields
        let resp = client
            .put(format!("{}/api/users/user-1/budgets/{}", base, budget_id))
            .bearer_auth(&token)
            .json(&json!({"amount": 750}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let updated: Value = resp.json().await.unwrap();
        assert_eq!(updated["budget"]["amount"], 750.0);
        assert_eq!(updated["budget"]["category"], "Food");

        // Delete, then the id is gone
        let resp = client
            .delete(format!("{}/api/users/user-1/budgets/{}", base, budget_id))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let resp = client
            .delete(format!("{}/api/users/user-1/budgets/{}", base, budget_id))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn invalid_amount_persists_nothing() {
        let base = spawn_app().await;
        let client = reqwest::Client::new();
        let token = token_for("user-1");

        for bad in [json!("abc"), json!(0), json!(-5)] {
            let resp = client
                .post(format!("{}/api/users/user-1/budgets", base))
                .bearer_auth(&token)
                .json(&json!({"amount": bad, "month": "2024-03", "category": "Food"}))
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), 400);
        }

        let resp = client
            .get(format!("{}/api/users/user-1/budgets?month=2024-03", base))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        let listed: Value = resp.json().await.unwrap();
        assert_eq!(listed["count"], 0);
    }

    #[tokio::test]
    async fn expense_date_round_trips_through_the_api() {
        let base = spawn_app().await;
        let client = reqwest::Client::new();
        let token = token_for("user-1");

        let resp = client
            .post(format!("{}/api/users/user-1/expenses", base))
            .bearer_auth(&token)
            .json(&json!({
                "amount": 15.75,
                "category": "Food",
                "date": "2024-03-15",
                "note": "lunch"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        let created: Value = resp.json().await.unwrap();
        assert_eq!(created["expense"]["date"], "2024-03-15");

        let resp = client
            .get(format!("{}/api/users/user-1/expenses?month=2024-03", base))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        let listed: Value = resp.json().await.unwrap();
        assert_eq!(listed["total_count"], 1);
        assert_eq!(listed["expenses"][0]["date"], "2024-03-15");
        assert_eq!(listed["expenses"][0]["note"], "lunch");
    }

    #[tokio::test]
    async fn summary_and_report_aggregate_the_month() {
        let base = spawn_app().await;
        let client = reqwest::Client::new();
        let token = token_for("user-1");

        client
            .post(format!("{}/api/users/user-1/budgets", base))
            .bearer_auth(&token)
            .json(&json!({"amount": 40, "month": "2024-03", "category": "Food"}))
            .send()
            .await
            .unwrap();
        for (amount, category, date) in [
            (30.0, "Food", "2024-03-01"),
            (20.0, "Food", "2024-03-10"),
            (25.0, "Transport", "2024-03-12"),
        ] {
            client
                .post(format!("{}/api/users/user-1/expenses", base))
                .bearer_auth(&token)
                .json(&json!({"amount": amount, "category": category, "date": date}))
                .send()
                .await
                .unwrap();
        }

        let resp = client
            .get(format!("{}/api/summary/user-1/2024-03", base))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let summary: Value = resp.json().await.unwrap();
        assert_eq!(summary["total_expenses"], 75.0);
        assert_eq!(summary["total_budget"], 40.0);
        assert_eq!(summary["remaining_budget"], -35.0);
        assert_eq!(summary["budget_status"], "over_budget");
        assert_eq!(summary["expense_count"], 3);
        assert_eq!(summary["budget_count"], 1);

        let resp = client
            .get(format!("{}/api/report/user-1/2024-03", base))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let report: Value = resp.json().await.unwrap();
        assert_eq!(report["top_spending_category"]["category"], "Food");
        assert_eq!(report["top_spending_category"]["amount"], 50.0);
        assert_eq!(report["over_budget_categories_count"], 1);
        assert_eq!(report["expenses_by_category"]["Food"]["percentage"], 66.67);
        assert_eq!(report["pie_chart_data"][0]["name"], "Food");
        assert_eq!(report["bar_chart_data"][0]["over_budget"], true);
    }

    #[tokio::test]
    async fn bad_month_in_summary_is_rejected() {
        let base = spawn_app().await;
        let client = reqwest::Client::new();

        let resp = client
            .get(format!("{}/api/summary/user-1/march", base))
            .bearer_auth(token_for("user-1"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Invalid month format. Use YYYY-MM");
    }
}
