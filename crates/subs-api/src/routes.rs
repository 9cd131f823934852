//! # Routes
//!
//! Axum router configuration for the subscription API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
///   - GET  /                 - Landing page (`STATIC_DIR/index.html`)
///   - GET  /bootstrap        - Publishable key, discount settings, plans
///   - GET  /setup-page       - Alias of /bootstrap
///   - POST /create-customer  - Create customer + subscription
///   - POST /subscription     - Retrieve subscription
///   - POST /webhook          - Provider webhook
///   - GET  /health           - Health check
///
/// Anything else is served from `STATIC_DIR`.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let assets = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/bootstrap", get(handlers::bootstrap))
        .route("/setup-page", get(handlers::bootstrap))
        .route("/create-customer", post(handlers::create_customer))
        .route("/subscription", post(handlers::get_subscription))
        .route("/webhook", post(handlers::webhook))
        .fallback_service(assets)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        // State
        .with_state(state)
}
