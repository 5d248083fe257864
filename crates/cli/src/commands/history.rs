use std::sync::Arc;

use autoquote_core::config::{AppConfig, LoadOptions};
use autoquote_core::quote::record::{QuoteFilters, QuoteQuery, QuoteRecordId};
use autoquote_core::quote::service::QuoteService;
use autoquote_core::rating::RatingEngine;
use autoquote_db::{connect, SqlQuoteStore};
use clap::Subcommand;

use crate::commands::{current_thread_runtime, CommandResult};

#[derive(Debug, Clone, Subcommand)]
pub enum HistoryCommand {
    #[command(about = "List recorded quotes, newest first")]
    List {
        #[arg(long, default_value_t = 0)]
        skip: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long = "car-make")]
        car_make: Option<String>,
        #[arg(long = "car-model")]
        car_model: Option<String>,
        #[arg(long = "min-value")]
        min_value: Option<f64>,
        #[arg(long = "max-value")]
        max_value: Option<f64>,
        #[arg(long)]
        state: Option<String>,
    },
    #[command(about = "Show one recorded quote by id")]
    Show { id: String },
}

pub fn run(command: &HistoryCommand) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "history",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match current_thread_runtime("history") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    runtime.block_on(async {
        let pool = match connect(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return CommandResult::failure("history", "db_connectivity", error.to_string(), 4);
            }
        };
        let service = QuoteService::with_store(
            Arc::new(RatingEngine::new(config.rating)),
            Arc::new(SqlQuoteStore::new(pool.clone())),
        );

        let result = match command {
            HistoryCommand::List { .. } => service
                .list(&list_query(command))
                .await
                .map(|records| CommandResult::data("history", &records)),
            HistoryCommand::Show { id } => service
                .fetch(&QuoteRecordId(id.clone()))
                .await
                .map(|record| CommandResult::data("history", &record)),
        };

        pool.close().await;
        result.unwrap_or_else(|error| CommandResult::from_application_error("history", error))
    })
}

fn list_query(command: &HistoryCommand) -> QuoteQuery {
    match command {
        HistoryCommand::List { skip, limit, car_make, car_model, min_value, max_value, state } => {
            QuoteQuery::new(
                Some(*skip),
                Some(*limit),
                QuoteFilters {
                    car_make: car_make.clone(),
                    car_model: car_model.clone(),
                    min_value: *min_value,
                    max_value: *max_value,
                    state: state.clone(),
                },
            )
        }
        HistoryCommand::Show { .. } => QuoteQuery::default(),
    }
}
