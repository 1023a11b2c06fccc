//! HTTP API server for the order command system.
//!
//! Exposes the order-creation command over REST with structured logging
//! (tracing) and Prometheus metrics. The outbox relay runs beside the
//! server in the binary, not inside any request handler.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use ledger::LedgerStore;
use metrics_exporter_prometheus::PrometheusHandle;
use service::OrderCommandService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<L: LedgerStore + Clone + 'static>(
    state: Arc<AppState<L>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<L>))
        .route("/orders/{id}", get(routes::orders::get::<L>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over the given ledger.
pub fn create_state<L: LedgerStore + Clone>(ledger: L) -> Arc<AppState<L>> {
    Arc::new(AppState {
        commands: OrderCommandService::new(ledger),
    })
}
