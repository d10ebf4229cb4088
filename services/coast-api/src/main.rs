use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use assembly::{EngineConfig, PerDayAssembler, RefreshScheduler, SeriesBuilder};
use clap::Parser;
use coast_common::{LocationRegistry, TimezoneWindow};
use day_store::{DayStore, SqliteDayStore};
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use coast_api::server;
use coast_api::sources;
use coast_api::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "coast-api")]
#[command(about = "Coastal environmental-quality API")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8080", env = "LISTEN_ADDR")]
    listen: String,

    /// Monitored locations file; falls back to the built-in set when absent
    #[arg(long, default_value = "/config/locations.yaml", env = "LOCATIONS_FILE")]
    locations_file: PathBuf,

    /// SQLite database path for persisted day snapshots
    #[arg(long, default_value = "/data/coastwatch/days.db", env = "DAY_STORE_PATH")]
    store_path: PathBuf,

    /// Base URL of the imagery aggregation service
    #[arg(long, env = "AGGREGATOR_URL")]
    aggregator_url: String,

    /// Shared secret for the admin refresh endpoint
    #[arg(long, env = "ADMIN_TOKEN", hide_env_values = true)]
    admin_token: Option<String>,

    /// Log level filter
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    info!("Starting coast-api");

    let config = EngineConfig::from_env();
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid engine configuration: {e}"))?;
    info!(
        cache_window_days = config.cache_window_days,
        lookback_days = config.lookback_days,
        fill_gaps = config.fill_gaps_enabled,
        refresh = config.refresh_enabled,
        revise_days = config.revise_days,
        "Engine configuration loaded"
    );

    let registry = Arc::new(LocationRegistry::load_or_defaults(&args.locations_file));
    info!(locations = registry.len(), "Location registry ready");

    let metric_sources = sources::build_sources(&args.aggregator_url)
        .map_err(|e| anyhow::anyhow!("aggregator setup failed: {e}"))?;

    let store: Arc<dyn DayStore> = Arc::new(
        SqliteDayStore::open(&args.store_path)
            .await
            .with_context(|| format!("opening day store at {}", args.store_path.display()))?,
    );
    info!(path = %args.store_path.display(), "Day store opened");

    let assembler = PerDayAssembler::new(Arc::new(metric_sources), config.clone());
    let builder = Arc::new(SeriesBuilder::new(
        registry.clone(),
        assembler,
        store.clone(),
        config.clone(),
    ));

    let tz = TimezoneWindow::istanbul();
    let scheduler = Arc::new(RefreshScheduler::new(
        builder.clone(),
        store.clone(),
        registry.clone(),
        tz.clone(),
        config.clone(),
    ));

    let (shutdown_tx, _) = broadcast::channel(1);

    let refresh_task = {
        let scheduler = scheduler.clone();
        let shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move {
            scheduler.run_forever(shutdown).await;
        })
    };

    let state = Arc::new(AppState::new(
        registry,
        builder,
        scheduler,
        &config,
        tz,
        args.admin_token,
    ));

    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("binding {}", args.listen))?;
    info!(addr = %args.listen, "Listening");

    let serve_shutdown = shutdown_tx.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
            let _ = serve_shutdown.send(());
        })
        .await
        .context("server error")?;

    drop(shutdown_tx);
    let _ = refresh_task.await;
    info!("Shutdown complete");
    Ok(())
}
