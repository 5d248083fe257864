mod api;
mod auth;
mod bootstrap;
mod health;

use std::time::Duration;

use anyhow::Result;
use autoquote_core::config::{AppConfig, LoadOptions};
use tokio::sync::watch;
use tracing::{info, warn};

fn init_logging(config: &AppConfig) {
    use autoquote_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let server = &app.config.server;
    let address = format!("{}:{}", server.bind_address, server.port);
    let router = api::router(app.quotes.clone(), app.db_pool.clone(), server);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        history_enabled = app.quotes.has_history(),
        api_key_required = server.api_key.is_some(),
        "autoquote-server listening"
    );

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let mut serving = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            })
            .await
    });

    tokio::select! {
        joined = &mut serving => {
            joined??;
            return Ok(());
        }
        signal = tokio::signal::ctrl_c() => signal?,
    }

    info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        grace_secs = server.graceful_shutdown_secs,
        "autoquote-server draining in-flight requests"
    );
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(Duration::from_secs(server.graceful_shutdown_secs), serving).await {
        Ok(joined) => joined??,
        Err(_) => warn!(
            event_name = "system.server.shutdown_deadline",
            correlation_id = "shutdown",
            "graceful shutdown deadline elapsed; dropping open connections"
        ),
    }

    if let Some(pool) = &app.db_pool {
        pool.close().await;
    }
    info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        "autoquote-server stopped"
    );

    Ok(())
}
