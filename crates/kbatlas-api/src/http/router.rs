//! Axum router configuration with middleware.
//!
//! All builder and template routes are under `/api/v1/`; `/health` sits at
//! the root and needs no owner. Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Builder sessions
        .route(
            "/builders",
            post(handlers::builder::create_builder).get(handlers::builder::list_builders),
        )
        .route(
            "/builders/{id}",
            get(handlers::builder::get_builder).delete(handlers::builder::delete_builder),
        )
        .route(
            "/builders/{id}/section",
            put(handlers::builder::update_section),
        )
        .route("/builders/{id}/navigate", post(handlers::builder::navigate))
        .route(
            "/builders/{id}/test-conversations",
            post(handlers::builder::record_test_conversation),
        )
        .route("/builders/{id}/files/sync", post(handlers::builder::sync_files))
        .route("/builders/{id}/deploy", post(handlers::builder::deploy))
        // Templates
        .route("/templates", get(handlers::template::list_templates))
        .route("/templates/{id}", get(handlers::template::get_template));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint (no owner required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
