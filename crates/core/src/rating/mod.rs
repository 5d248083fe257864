pub mod location;

use serde::{Deserialize, Serialize};

use crate::config::RatingConfig;
use crate::domain::{premium::Premium, vehicle::Vehicle};
use crate::errors::{DomainError, ValidationError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatingTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingTrace {
    pub steps: Vec<RatingTraceStep>,
}

impl RatingTrace {
    fn record(&mut self, stage: &str, detail: String, amount: f64) {
        self.steps.push(RatingTraceStep { stage: stage.to_string(), detail, amount });
    }

    pub fn amount(&self, stage: &str) -> Option<f64> {
        self.steps.iter().find(|step| step.stage == stage).map(|step| step.amount)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RatingResult {
    pub premium: Premium,
    pub trace: RatingTrace,
}

pub trait PremiumRater: Send + Sync {
    fn rate(
        &self,
        vehicle: &Vehicle,
        deductible_percentage: f64,
        broker_fee: f64,
    ) -> Result<Premium, DomainError>;
}

/// Deterministic premium calculator. Holds nothing but its configuration,
/// so one instance can be shared freely across threads.
#[derive(Clone, Debug, Default)]
pub struct RatingEngine {
    config: RatingConfig,
}

impl PremiumRater for RatingEngine {
    fn rate(
        &self,
        vehicle: &Vehicle,
        deductible_percentage: f64,
        broker_fee: f64,
    ) -> Result<Premium, DomainError> {
        self.rate_with_trace(vehicle, deductible_percentage, broker_fee)
            .map(|result| result.premium)
    }
}

impl RatingEngine {
    pub fn new(config: RatingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    pub fn age_rate(&self, vehicle: &Vehicle) -> f64 {
        f64::from(vehicle.age()) * self.config.age_rate_per_year
    }

    pub fn value_rate(&self, vehicle: &Vehicle) -> f64 {
        (vehicle.value() / self.config.value_bracket) * self.config.value_rate_per_10000
    }

    /// Adjustment added on top of the base rate for the vehicle's
    /// registration location. `None` when disabled, when there is no address,
    /// or when the postal code does not end in a digit.
    pub fn location_adjustment(&self, vehicle: &Vehicle) -> Option<f64> {
        if !self.config.enable_location_adjustment {
            return None;
        }
        vehicle
            .registration_location()
            .and_then(|address| location::location_adjustment(&self.config, address))
    }

    pub fn rate_with_trace(
        &self,
        vehicle: &Vehicle,
        deductible_percentage: f64,
        broker_fee: f64,
    ) -> Result<RatingResult, DomainError> {
        if !(0.0..=1.0).contains(&deductible_percentage) {
            return Err(ValidationError::DeductibleOutOfRange(deductible_percentage).into());
        }
        if broker_fee.is_nan() || broker_fee < 0.0 {
            return Err(ValidationError::NegativeBrokerFee(broker_fee).into());
        }

        let mut trace = RatingTrace::default();
        let config = &self.config;

        let age_rate = self.age_rate(vehicle);
        trace.record(
            "age_rate",
            format!("age({}) * age_rate_per_year({})", vehicle.age(), config.age_rate_per_year),
            age_rate,
        );

        let value_rate = self.value_rate(vehicle);
        trace.record(
            "value_rate",
            format!(
                "(value({}) / value_bracket({})) * value_rate_per_10000({})",
                vehicle.value(),
                config.value_bracket,
                config.value_rate_per_10000
            ),
            value_rate,
        );

        let base_rate = age_rate + value_rate;
        trace.record("base_rate", "age_rate + value_rate".to_string(), base_rate);

        let applied_rate = match self.location_adjustment(vehicle) {
            Some(adjustment) => {
                trace.record(
                    "location_adjustment",
                    "last postal code digit mapped onto location bounds".to_string(),
                    adjustment,
                );
                base_rate + adjustment
            }
            None => base_rate,
        };
        trace.record("applied_rate", "base_rate + location_adjustment".to_string(), applied_rate);

        let base_premium = vehicle.value() * applied_rate;
        trace.record("base_premium", "value * applied_rate".to_string(), base_premium);

        let deductible_discount = base_premium * deductible_percentage;
        trace.record(
            "deductible_discount",
            format!("base_premium * deductible_percentage({deductible_percentage})"),
            deductible_discount,
        );

        let calculated_premium = base_premium - deductible_discount + broker_fee;
        trace.record(
            "calculated_premium",
            format!("base_premium - deductible_discount + broker_fee({broker_fee})"),
            calculated_premium,
        );

        let base_policy_limit = vehicle.value() * config.default_coverage_percentage;
        trace.record(
            "base_policy_limit",
            format!("value * default_coverage_percentage({})", config.default_coverage_percentage),
            base_policy_limit,
        );

        let deductible_value = base_policy_limit * deductible_percentage;
        trace.record(
            "deductible_value",
            "base_policy_limit * deductible_percentage".to_string(),
            deductible_value,
        );

        let policy_limit = base_policy_limit - deductible_value;
        trace.record(
            "policy_limit",
            "base_policy_limit - deductible_value".to_string(),
            policy_limit,
        );

        let amounts = [
            ("applied_rate", applied_rate),
            ("base_premium", base_premium),
            ("deductible_value", deductible_value),
            ("policy_limit", policy_limit),
            ("calculated_premium", calculated_premium),
        ];
        if let Some((field, value)) = amounts.iter().find(|(_, value)| !value.is_finite()) {
            return Err(DomainError::InvariantViolation(format!("{field} is not finite: {value}")));
        }

        // Negative amounts are reachable from valid input: a next-model-year
        // vehicle has age -1.
        let premium = Premium::new(
            applied_rate,
            base_premium,
            deductible_value,
            policy_limit,
            calculated_premium,
        )?;

        Ok(RatingResult { premium, trace })
    }
}
