use std::sync::Arc;

use autoquote_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use autoquote_core::quote::dto::{AddressPayload, CarPayload, PremiumRequest, PremiumResponse};
use autoquote_core::quote::service::QuoteService;
use autoquote_core::rating::{RatingEngine, RatingTrace};
use clap::Args;
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Debug, Clone, Args)]
pub struct QuoteArgs {
    #[arg(long)]
    pub make: String,
    #[arg(long)]
    pub model: String,
    #[arg(long, allow_negative_numbers = true)]
    pub year: i32,
    #[arg(long, allow_negative_numbers = true, help = "Insured vehicle value")]
    pub value: f64,
    #[arg(long, allow_negative_numbers = true, help = "Deductible as a fraction in (0, 1]")]
    pub deductible: f64,
    #[arg(long = "broker-fee", default_value_t = 0.0, allow_negative_numbers = true)]
    pub broker_fee: f64,
    #[arg(long, requires_all = ["state", "postal_code"])]
    pub city: Option<String>,
    #[arg(long, requires_all = ["city", "postal_code"])]
    pub state: Option<String>,
    #[arg(long = "postal-code", requires_all = ["city", "state"])]
    pub postal_code: Option<String>,
    #[arg(long, requires = "city")]
    pub street: Option<String>,
    #[arg(long = "location-adjustment", help = "Force the location adjustment on")]
    pub location_adjustment: bool,
    #[arg(long, help = "Include every intermediate rating step in the output")]
    pub trace: bool,
}

#[derive(Debug, Serialize)]
struct TracedQuote {
    quote: PremiumResponse,
    base_premium: f64,
    trace: RatingTrace,
}

impl QuoteArgs {
    pub fn to_request(&self) -> PremiumRequest {
        let registration_location = match (&self.city, &self.state, &self.postal_code) {
            (Some(city), Some(state), Some(postal_code)) => Some(AddressPayload {
                city: city.clone(),
                state: state.clone(),
                postal_code: postal_code.clone(),
                street: self.street.clone(),
            }),
            _ => None,
        };

        PremiumRequest {
            car: CarPayload {
                make: self.make.clone(),
                model: self.model.clone(),
                year: self.year,
                value: self.value,
                registration_location,
            },
            deductible_percentage: self.deductible,
            broker_fee: self.broker_fee,
        }
    }
}

/// Rates a quote entirely offline. Only the `[rating]` section of the
/// configuration is used; nothing is persisted.
pub fn run(args: &QuoteArgs) -> CommandResult {
    let options = LoadOptions {
        overrides: ConfigOverrides {
            enable_location_adjustment: args.location_adjustment.then_some(true),
            ..ConfigOverrides::default()
        },
        ..LoadOptions::default()
    };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "quote",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let engine = RatingEngine::new(config.rating);
    let service = QuoteService::new(Arc::new(engine.clone()));
    let request = args.to_request();

    let (response, event) = match service.rate(&request) {
        Ok(rated) => rated,
        Err(error) => return CommandResult::from_application_error("quote", error),
    };

    if !args.trace {
        return CommandResult::data("quote", &response);
    }

    match engine.rate_with_trace(&event.vehicle, request.deductible_percentage, request.broker_fee)
    {
        Ok(result) => CommandResult::data(
            "quote",
            &TracedQuote {
                quote: response,
                base_premium: result.premium.base_premium(),
                trace: result.trace,
            },
        ),
        Err(error) => CommandResult::from_application_error("quote", error.into()),
    }
}
