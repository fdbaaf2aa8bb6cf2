//! HTTP server implementation using Axum.

use std::path::Path;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use evalia_core::EvaliaConfig;
use evalia_lifecycle::Reconciler;
use evalia_store::SqliteStore;

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SqliteStore>,
    /// Lifecycle engine — drives all status reconciliation.
    pub reconciler: Reconciler<SqliteStore>,
    pub start_time: std::time::Instant,
}

/// Build the Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Administrative routes — require an admin/manager role from the
    // upstream auth proxy.
    let admin = Router::new()
        .route(
            "/api/v1/periods/reconcile",
            post(super::routes::reconcile).get(super::routes::reconcile_dry_run),
        )
        .route("/api/v1/periods", post(super::routes::create_period))
        .route_layer(axum::middleware::from_fn(super::routes::require_manager));

    // Routes open to any resolved caller.
    let open = Router::new()
        .route("/api/v1/periods", get(super::routes::list_periods))
        .route("/api/v1/periods/{id}", get(super::routes::get_period))
        .route(
            "/api/v1/periods/{id}/evaluations",
            post(super::routes::record_evaluation).get(super::routes::list_evaluations),
        )
        .route("/health", get(super::routes::health_check));

    admin
        .merge(open)
        .layer({
            let cors = CorsLayer::new()
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers(Any)
                .max_age(std::time::Duration::from_secs(3600));

            // Restrict CORS origins in production via env var
            // Example: EVALIA_CORS_ORIGINS=https://hr.example.com
            if let Ok(origins_str) = std::env::var("EVALIA_CORS_ORIGINS") {
                let origins: Vec<_> = origins_str
                    .split(',')
                    .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
                    .collect();
                cors.allow_origin(origins)
            } else {
                cors.allow_origin(Any)
            }
        })
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn start(config: &EvaliaConfig) -> anyhow::Result<()> {
    let db_path = Path::new(&config.database.path);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = match SqliteStore::open(db_path) {
        Ok(store) => {
            tracing::info!("💾 Period store initialized: {}", db_path.display());
            store
        }
        Err(e) => {
            tracing::error!("❌ Failed to open period store: {e} — falling back to in-memory");
            SqliteStore::open_in_memory()?
        }
    };
    let store = Arc::new(store);

    let state = Arc::new(AppState {
        store: store.clone(),
        reconciler: Reconciler::new(store),
        start_time: std::time::Instant::now(),
    });
    let app = build_router(state);

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🌐 Gateway server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
