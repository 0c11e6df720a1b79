use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::{confirm, health, query, tools};
use crate::state::GatewayState;

/// Assembles the Gateway's axum router (spec §4.1 "Public contract").
pub fn build_router(state: Arc<GatewayState>) -> Router {
    let cors = build_cors(&state.config.cors.origins);

    Router::new()
        .route("/query", post(query::query))
        .route("/confirm/{confirmationId}", post(confirm::confirm))
        .route("/tools", get(tools::list_tools))
        .route("/health", get(health::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(tower_http::timeout::TimeoutLayer::new(Duration::from_secs(120)))
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let allow = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}
