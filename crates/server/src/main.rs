mod bootstrap;
mod health;

use anyhow::Result;

use kiosk_core::config::{AppConfig, LogFormat};

fn init_logging(config: &AppConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.logging.filter)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match config.logging.format {
        LogFormat::Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations.
    let config = AppConfig::load(None)?;
    init_logging(&config);

    let app = bootstrap::bootstrap(config).await?;

    health::spawn(&app.config.server.host, app.config.server.port, app.db_pool.clone()).await?;

    let sweep_handle = app.sweeper.spawn();

    // The chat transport is an external collaborator; it drives
    // `app.orchestrator` and plugs its outbound side in through the
    // notification sink at bootstrap.
    let _ = &app.orchestrator;

    tracing::info!(event_name = "server_started", "kiosk-server started");
    wait_for_shutdown().await?;
    tracing::info!(event_name = "server_stopping", "kiosk-server stopping");

    sweep_handle.abort();
    app.db_pool.close().await;

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
