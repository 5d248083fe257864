use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::domain::{premium::Premium, vehicle::Vehicle};

/// Raised once per successfully rated quote.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuoteCalculated {
    pub event_id: String,
    pub vehicle: Vehicle,
    pub premium: Premium,
    pub deductible_percentage: f64,
    pub broker_fee: f64,
    pub occurred_at: DateTime<Utc>,
}

impl QuoteCalculated {
    pub fn new(
        vehicle: Vehicle,
        premium: Premium,
        deductible_percentage: f64,
        broker_fee: f64,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            vehicle,
            premium,
            deductible_percentage,
            broker_fee,
            occurred_at: Utc::now(),
        }
    }

    pub fn emit(&self, correlation_id: &str) {
        info!(
            event_name = "quote.calculated",
            correlation_id = %correlation_id,
            event_id = %self.event_id,
            car_make = %self.vehicle.make(),
            car_model = %self.vehicle.model(),
            car_year = self.vehicle.year(),
            has_location = self.vehicle.registration_location().is_some(),
            applied_rate = self.premium.applied_rate(),
            calculated_premium = self.premium.calculated_premium(),
            "premium calculated"
        );
    }
}
