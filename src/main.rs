//! Quizmaster backend entrypoint wiring REST, WebSocket, and storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dao;
mod dto;
mod error;
mod routes;
mod services;
mod state;

use dao::state_store::memory::MemoryStateStore;
#[cfg(feature = "mongo-store")]
use dao::{
    state_store::{
        StateStore,
        mongodb::{MongoConfig, MongoStateStore},
    },
    storage::StorageError,
};
use state::{AppState, SharedState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_config = config::AppConfig::load().context("loading configuration")?;
    let app_state = AppState::new(app_config);

    bootstrap_storage(app_state.clone()).await;

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Install the storage backend the deployment asked for.
///
/// With the `mongo-store` feature compiled in and `MONGO_URI` set, a
/// supervisor task owns the connection lifecycle and the service starts in
/// degraded mode until the first connect succeeds. Every other configuration
/// gets the in-memory store immediately.
async fn bootstrap_storage(state: SharedState) {
    #[cfg(feature = "mongo-store")]
    if env::var("MONGO_URI").is_ok() {
        tokio::spawn(services::storage_supervisor::run(
            state,
            connect_mongo_store,
        ));
        return;
    }

    info!("installing in-memory state store");
    state
        .install_state_store(Arc::new(MemoryStateStore::new()))
        .await;
}

/// Read `MONGO_URI`/`MONGO_DB` and establish a fresh store connection.
#[cfg(feature = "mongo-store")]
async fn connect_mongo_store() -> Result<Arc<dyn StateStore>, StorageError> {
    let mongo_config = MongoConfig::from_env().await?;
    let store = MongoStateStore::connect(mongo_config).await?;
    Ok(Arc::new(store))
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
