//! HTTP API server for the storefront backend.
//!
//! Exposes the order and payment workflows over REST with structured
//! logging (tracing) and Prometheus metrics. Request identity arrives as a
//! bearer token, is resolved to an [`domain::Actor`] at the boundary, and
//! is passed into every workflow as an explicit argument.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use checkout::{CartService, PaymentCoordinator, PaymentGateway};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::IdentityResolver;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store, G: PaymentGateway> {
    pub cart: CartService<S>,
    pub payments: PaymentCoordinator<S, G>,
    pub identity: Arc<dyn IdentityResolver>,
}

impl<S: Store, G: PaymentGateway> AppState<S, G> {
    pub fn new(store: S, gateway: G, identity: Arc<dyn IdentityResolver>) -> Self {
        Self {
            cart: CartService::new(store.clone()),
            payments: PaymentCoordinator::new(store, gateway),
            identity,
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, G>(state: Arc<AppState<S, G>>, metrics_handle: PrometheusHandle) -> Router
where
    S: Store,
    G: PaymentGateway + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders/pending/add-item", post(routes::orders::add_item::<S, G>))
        .route("/orders", post(routes::orders::checkout::<S, G>))
        .route("/orders/me", get(routes::orders::mine::<S, G>))
        .route("/orders/{id}", get(routes::orders::get::<S, G>))
        .route("/orders/{id}/cancel", delete(routes::orders::cancel::<S, G>))
        .route("/payments/{order_id}", post(routes::payments::create::<S, G>))
        .route(
            "/payments/confirm/{payment_id}",
            post(routes::payments::confirm::<S, G>),
        )
        .route(
            "/payments/retry/{payment_id}",
            post(routes::payments::retry::<S, G>),
        )
        .route(
            "/admin/payments/refund/{payment_id}",
            post(routes::payments::refund::<S, G>),
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
