//! HTTP API for the commerce engine.
//!
//! REST endpoints for catalog seeding, carts, order lifecycle and
//! payment reconciliation, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use engine::{CartManager, InMemoryGateway, OrderWorkflow, PaymentReconciler};
use metrics_exporter_prometheus::PrometheusHandle;
use store::CommerceStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: CommerceStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/products", put(routes::products::upsert::<S>))
        .route("/products", get(routes::products::list::<S>))
        .route("/products/{id}", get(routes::products::get::<S>))
        .route("/carts/{customer_id}", get(routes::carts::get::<S>))
        .route(
            "/carts/{customer_id}/items",
            post(routes::carts::add_item::<S>).delete(routes::carts::clear::<S>),
        )
        .route(
            "/carts/{customer_id}/items/{product_id}",
            put(routes::carts::set_item_quantity::<S>).delete(routes::carts::remove_item::<S>),
        )
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/confirm", post(routes::orders::confirm::<S>))
        .route("/orders/{id}/ship", post(routes::orders::ship::<S>))
        .route("/orders/{id}/deliver", post(routes::orders::deliver::<S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route("/orders/{id}/status", post(routes::orders::transition::<S>))
        .route("/orders/{id}/payments", get(routes::orders::payments::<S>))
        .route(
            "/payments/intents",
            post(routes::payments::create_intent::<S>),
        )
        .route(
            "/payments/{intent_id}/confirm",
            post(routes::payments::confirm::<S>),
        )
        .route(
            "/payments/{intent_id}/sync",
            post(routes::payments::sync::<S>),
        )
        .route(
            "/payments/{intent_id}",
            get(routes::payments::get::<S>),
        )
        .route("/payments/webhook", post(routes::payments::webhook::<S>))
        .route(
            "/customers/{customer_id}/payments",
            get(routes::payments::for_customer::<S>),
        )
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

/// Wires the engine services around a store and the in-memory gateway.
pub fn create_state<S: CommerceStore + Clone>(store: S) -> Arc<AppState<S>> {
    let gateway = InMemoryGateway::new();
    Arc::new(AppState {
        carts: CartManager::new(store.clone()),
        orders: OrderWorkflow::new(store.clone()),
        payments: PaymentReconciler::new(store.clone(), gateway.clone()),
        store,
        gateway,
    })
}
