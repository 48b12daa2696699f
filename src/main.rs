//! Analytics Engine
//!
//! Web analytics event ingestion and aggregation:
//! - batch ingestion with per-event sanitization
//! - append-only event storage with monotonic ids
//! - deduplicated reports, realtime windows, and daily rollups

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{info, warn};

use analytics::{Pipeline, PipelineConfig};
use api::middleware::rate_limit::RateLimitConfig;
use api::{router, AppState};
use event_store::{health::check_store, open_store, StoreConfig};
use telemetry::init_tracing_from_env;

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    #[serde(default)]
    storage: StoreConfig,

    #[serde(default)]
    pipeline: PipelineConfig,

    #[serde(default)]
    rate_limit: RateLimitConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            storage: StoreConfig::default(),
            pipeline: PipelineConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Analytics Engine v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    info!(
        backend = ?config.storage.backend,
        path = %config.storage.path.display(),
        "Loaded storage config"
    );

    let store = open_store(&config.storage)
        .await
        .context("Failed to open event store")?;

    if !check_store(store.as_ref()).await {
        warn!("Event store probe failed, starting anyway");
    }

    let pipeline = Arc::new(
        Pipeline::new(store, config.pipeline.clone())
            .await
            .context("Failed to initialize pipeline")?,
    );

    let state = AppState::with_rate_limit(pipeline, config.rate_limit.clone());

    let _rate_limiter_cleanup = state.start_rate_limiter_cleanup();
    info!("Started rate limiter cleanup task");

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from defaults, `config/default.toml`, and
/// `ANALYTICS__*` environment variables.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // e.g. ANALYTICS__STORAGE__PATH, ANALYTICS__PIPELINE__READ_TIMEOUT_MS
        .add_source(
            config::Environment::with_prefix("ANALYTICS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
