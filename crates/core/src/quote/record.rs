use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::premium::Premium;
use crate::errors::{PersistenceError, ValidationError};
use crate::quote::dto::{PremiumRequest, PremiumResponse};

pub const DEFAULT_LIST_LIMIT: u32 = 100;
pub const MAX_LIST_LIMIT: u32 = 1_000;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteRecordId(pub String);

impl fmt::Display for QuoteRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Denormalized snapshot of one completed quote, kept for audit and replay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub id: QuoteRecordId,
    pub created_at: DateTime<Utc>,
    pub car_make: String,
    pub car_model: String,
    pub car_year: i32,
    pub car_value: f64,
    pub deductible_percentage: f64,
    pub broker_fee: f64,
    pub has_location: bool,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub applied_rate: f64,
    pub base_premium: f64,
    pub deductible_value: f64,
    pub policy_limit: f64,
    pub calculated_premium: f64,
    pub request_data: Value,
    pub response_data: Value,
}

impl QuoteRecord {
    pub fn snapshot(
        id: QuoteRecordId,
        created_at: DateTime<Utc>,
        request: &PremiumRequest,
        response: &PremiumResponse,
        base_premium: f64,
    ) -> Result<Self, PersistenceError> {
        let request_data = serde_json::to_value(request)
            .map_err(|error| PersistenceError::Encode(error.to_string()))?;
        let response_data = serde_json::to_value(response)
            .map_err(|error| PersistenceError::Encode(error.to_string()))?;
        let location = request.car.registration_location.as_ref();

        Ok(Self {
            id,
            created_at,
            car_make: request.car.make.clone(),
            car_model: request.car.model.clone(),
            car_year: request.car.year,
            car_value: request.car.value,
            deductible_percentage: request.deductible_percentage,
            broker_fee: request.broker_fee,
            has_location: location.is_some(),
            city: location.map(|address| address.city.clone()),
            state: location.map(|address| address.state.clone()),
            postal_code: location.map(|address| address.postal_code.clone()),
            applied_rate: response.applied_rate,
            base_premium,
            deductible_value: response.deductible_value,
            policy_limit: response.policy_limit,
            calculated_premium: response.calculated_premium,
            request_data,
            response_data,
        })
    }

    /// Rebuilds the priced premium exactly as it was stored.
    pub fn premium(&self) -> Result<Premium, ValidationError> {
        Premium::new(
            self.applied_rate,
            self.base_premium,
            self.deductible_value,
            self.policy_limit,
            self.calculated_premium,
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteFilters {
    pub car_make: Option<String>,
    pub car_model: Option<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub state: Option<String>,
}

impl QuoteFilters {
    pub fn matches(&self, record: &QuoteRecord) -> bool {
        self.car_make.as_ref().map_or(true, |make| &record.car_make == make)
            && self.car_model.as_ref().map_or(true, |model| &record.car_model == model)
            && self.min_value.map_or(true, |min| record.car_value >= min)
            && self.max_value.map_or(true, |max| record.car_value <= max)
            && self.state.as_ref().map_or(true, |state| record.state.as_ref() == Some(state))
    }
}

/// Paging plus filters for history listings. Results are newest first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteQuery {
    pub skip: u32,
    pub limit: u32,
    pub filters: QuoteFilters,
}

impl Default for QuoteQuery {
    fn default() -> Self {
        Self { skip: 0, limit: DEFAULT_LIST_LIMIT, filters: QuoteFilters::default() }
    }
}

impl QuoteQuery {
    pub fn new(skip: Option<u32>, limit: Option<u32>, filters: QuoteFilters) -> Self {
        Self {
            skip: skip.unwrap_or(0),
            limit: limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT),
            filters,
        }
    }
}
