mod app;
mod auth;
mod catalog;
mod config;
mod db;
mod error;
mod extract;
mod handlers;
mod media;
mod response;
mod services;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use app::{build_router, build_state};
use config::{Config, StoreBackend};
use db::{MemoryStore, PgStore, Stores};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // RUST_LOG unset
        tracing_subscriber::EnvFilter::new("info,vidhub=debug,hyper_util=warn,tower_http=info")
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_stores(config: &Config) -> anyhow::Result<Stores> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let store = PgStore::connect(&config.database_url, config.database_pool_size)?;
            tracing::info!(pool_size = store.max_size(), "Connected to PostgreSQL");
            Ok(Stores::from_store(Arc::new(store)))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Ok(Stores::from_store(Arc::new(MemoryStore::new())))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "SIGTERM handler unavailable, waiting for Ctrl+C");
                ctrl_c.await.ok();
                tracing::info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        tracing::info!("Received Ctrl+C, shutting down...");
    }
}

// ----------------- Main -----------------

#[tokio::main]
async fn main() -> Result<(), lambda_http::Error> {
    setup_logging();
    tracing::info!("Starting vidhub...");

    let config = Config::from_env()?;
    let stores = open_stores(&config)?;
    let state = build_state(&config, stores)?;
    let app = build_router(state, &config)?;

    if std::env::var("AWS_LAMBDA_FUNCTION_NAME").is_ok() {
        tracing::info!("Running in Lambda mode");
        lambda_http::run(app).await
    } else {
        tracing::info!("Running in local HTTP server mode");
        let addr = format!("{}:{}", config.server_host, config.server_port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("🚀 Server running at http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}
