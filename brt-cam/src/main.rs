//! brt-cam - BRT webcam line detection service
//!
//! Receives still images from capture points, resolves the bus line shown
//! and records an arrival estimate for the destination stop.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use brt_cam::pipeline::IngestionPipeline;
use brt_cam::prediction::Predictor;
use brt_cam::recognition::build_recognizers;
use brt_cam::retention::spawn_retention_task;
use brt_cam::store::{MemoryObservationStore, ObservationStore, SqliteObservationStore};
use brt_cam::{build_router, AppState};
use brt_common::config::{resolve_database_path, resolve_root_folder, TomlConfig};
use brt_common::time;
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for brt-cam
#[derive(Parser, Debug)]
#[command(name = "brt-cam")]
#[command(about = "BRT webcam line detection and arrival prediction")]
#[command(version)]
struct Args {
    /// TOML bootstrap configuration file
    #[arg(short, long, env = "BRT_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "BRT_PORT")]
    port: Option<u16>,

    /// SQLite database file (overrides the config file)
    #[arg(short, long, env = "BRT_DATABASE")]
    database: Option<PathBuf>,

    /// Root folder holding the database
    #[arg(short, long, env = "BRT_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Keep observations in memory only
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{},tower_http=info", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting BRT webcam service (brt-cam) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &args.config {
        Some(path) => info!("Configuration file: {}", path.display()),
        None => info!("Configuration file: platform default"),
    }

    let registry = Arc::new(config.line_registry().context("Invalid line registry")?);
    if registry.is_empty() {
        bail!("Line registry is empty; at least one line must be configured");
    }
    info!("Line registry: {} lines", registry.len());

    let store: Arc<dyn ObservationStore> = if args.in_memory {
        warn!("Using in-memory observation store; observations are lost on exit");
        Arc::new(MemoryObservationStore::new())
    } else {
        let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
        let db_path = resolve_database_path(args.database.as_deref(), &config, &root_folder);
        info!("Database path: {}", db_path.display());
        Arc::new(
            SqliteObservationStore::open(&db_path)
                .await
                .context("Failed to open observation database")?,
        )
    };

    let recognizers = build_recognizers(&config.recognition, registry.clone());
    if recognizers.is_empty() {
        warn!("No recognizers configured; lines come from overrides or the image hash only");
    }
    let predictor = Predictor::from_config(&config.prediction, registry.clone());
    info!(
        recognizers = ?recognizers.iter().map(|r| r.name()).collect::<Vec<_>>(),
        strategy = predictor.strategy_name(),
        "Ingestion pipeline ready"
    );

    let pipeline = Arc::new(IngestionPipeline::new(
        registry,
        recognizers,
        predictor,
        store.clone(),
        std::time::Duration::from_millis(config.recognition.timeout_ms),
    ));

    let cancel = CancellationToken::new();
    let retention = spawn_retention_task(store.clone(), &config.retention, cancel.clone());

    let state = AppState::new(
        pipeline,
        config.http.clone(),
        time::secs_to_duration(config.retention.window_secs),
    );
    let app = build_router(state);

    let port = args.port.unwrap_or(config.port);
    let ip: std::net::IpAddr = config
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.bind_address))?;
    let addr = SocketAddr::new(ip, port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("brt-cam listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    cancel.cancel();
    if let Some(handle) = retention {
        if let Err(e) = handle.await {
            warn!("Retention task ended abnormally: {}", e);
        }
    }
    store.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
