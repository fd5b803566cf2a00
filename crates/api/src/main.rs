//! API server entry point.

use std::sync::Arc;

use api::auth::TokenRegistry;
use api::config::Config;
use api::{AppState, create_app};
use checkout::SimulatedGateway;
use common::UserId;
use domain::Actor;
use store::PgStore;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Connect storage and run migrations
    let database_url = config
        .database_url
        .as_deref()
        .expect("DATABASE_URL must be set");
    let store = PgStore::connect(database_url)
        .await
        .expect("failed to connect to database");
    store.run_migrations().await.expect("migrations failed");

    // 4. Wire identity and the simulated gateway
    let registry = TokenRegistry::new();
    if let Some(token) = &config.admin_token {
        registry.register(token.clone(), Actor::admin(UserId::new()));
        tracing::info!("admin bootstrap token registered");
    }
    let gateway = SimulatedGateway::new(config.payment_approval_rate);

    // 5. Build the application
    let state = Arc::new(AppState::new(store, gateway, Arc::new(registry)));
    let app = create_app(state, metrics_handle);

    // 6. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
