//! HTTP adapter for the storefront core.
//!
//! Exposes cart, order and payment-notification endpoints over axum, with
//! structured logging (tracing) and Prometheus metrics. Every response is
//! a `{status, msg, data}` envelope; business errors keep their code.

pub mod config;
pub mod error;
pub mod response;
pub mod routes;
pub mod session;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{Config, LogFormat};
pub use error::ApiError;
pub use session::{InMemorySessions, SessionResolver};
pub use state::{AppState, Backends};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/carts",
            get(routes::carts::list).post(routes::carts::add),
        )
        .route("/carts/selectAll", put(routes::carts::select_all))
        .route("/carts/unSelectAll", put(routes::carts::unselect_all))
        .route("/carts/products/sum", get(routes::carts::sum))
        .route(
            "/carts/{product_id}",
            put(routes::carts::update).delete(routes::carts::delete),
        )
        .route(
            "/orders",
            get(routes::orders::list).post(routes::orders::create),
        )
        .route(
            "/orders/{order_no}",
            get(routes::orders::detail).put(routes::orders::cancel),
        )
        .route("/payNotify", post(routes::payment::notify))
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
