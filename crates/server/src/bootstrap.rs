use std::sync::Arc;

use autoquote_core::config::AppConfig;
use autoquote_core::quote::service::QuoteService;
use autoquote_core::rating::{PremiumRater, RatingEngine};
use autoquote_db::{connect, migrations, DbPool, SqlQuoteStore};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: Option<DbPool>,
    pub quotes: Arc<QuoteService>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        history_enabled = config.history.enabled,
        location_adjustment = config.rating.enable_location_adjustment,
        "starting application bootstrap"
    );

    let rater: Arc<dyn PremiumRater> = Arc::new(RatingEngine::new(config.rating));

    if !config.history.enabled {
        info!(
            event_name = "system.bootstrap.history_disabled",
            correlation_id = "bootstrap",
            "quote history disabled; skipping database setup"
        );
        let quotes = Arc::new(QuoteService::new(rater));
        return Ok(Application { config, db_pool: None, quotes });
    }

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let store = Arc::new(SqlQuoteStore::new(db_pool.clone()));
    let quotes = Arc::new(QuoteService::with_store(rater, store));

    Ok(Application { config, db_pool: Some(db_pool), quotes })
}
