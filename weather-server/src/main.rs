//! HTTP server binary for the city weather cache service.
//!
//! Wires configuration, the sled reading store, the Open-Meteo client,
//! and the refresh engine behind an axum router.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use clap::Parser;
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weather_core::{
    Config, Environment, OpenMeteoProvider, ReadingStore, RefreshService, SledReadingStore,
};

mod auth;
mod error;
mod handlers;
mod routes;

use handlers::AppState;

#[derive(Debug, Parser)]
#[command(name = "weather-server", version, about = "City weather cache API")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "weather.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weather_server=debug,weather_core=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::load_from(&args.config)?;

    if config.environment == Environment::Production {
        error::set_expose_internal_errors(false);
        if config.api_key.is_none() {
            warn!("Running in production without an API key; /api is unauthenticated");
        }
    }

    info!(
        environment = %config.environment,
        cities = config.cities.len(),
        refresh_interval_minutes = config.refresh_interval_minutes,
        upstream = %config.upstream.base_url,
        "Configuration loaded"
    );

    let store: Arc<dyn ReadingStore> = Arc::new(
        SledReadingStore::open(&config.database.path).with_context(|| {
            format!("Failed to open reading store at {}", config.database.path.display())
        })?,
    );

    let provider = Arc::new(OpenMeteoProvider::new(&config.upstream)?);

    let refresh = Arc::new(RefreshService::new(
        config.cities.clone(),
        Arc::clone(&store),
        provider,
        config.refresh_interval_minutes,
    ));

    let state = AppState {
        refresh,
        store,
        cities: Arc::new(config.cities.clone()),
        api_key: config.api_key.clone(),
    };

    let app = routes::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Server listening on http://{addr}");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Server shutdown complete");

    Ok(())
}

/// Permissive CORS outside production; otherwise restricted to the
/// configured origins.
fn cors_layer(config: &Config) -> CorsLayer {
    if config.environment == Environment::Development || config.server.allowed_origins.is_empty() {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .server
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET])
        .allow_headers(Any)
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
