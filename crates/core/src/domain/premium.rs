use serde::Serialize;

use crate::errors::ValidationError;

/// Priced output of the rating engine. All amounts are non-negative.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Premium {
    applied_rate: f64,
    base_premium: f64,
    deductible_value: f64,
    policy_limit: f64,
    calculated_premium: f64,
}

impl Premium {
    pub fn new(
        applied_rate: f64,
        base_premium: f64,
        deductible_value: f64,
        policy_limit: f64,
        calculated_premium: f64,
    ) -> Result<Self, ValidationError> {
        non_negative("applied_rate", applied_rate)?;
        non_negative("base_premium", base_premium)?;
        non_negative("deductible_value", deductible_value)?;
        non_negative("policy_limit", policy_limit)?;
        non_negative("calculated_premium", calculated_premium)?;

        Ok(Self { applied_rate, base_premium, deductible_value, policy_limit, calculated_premium })
    }

    pub fn applied_rate(&self) -> f64 {
        self.applied_rate
    }

    pub fn base_premium(&self) -> f64 {
        self.base_premium
    }

    pub fn deductible_value(&self) -> f64 {
        self.deductible_value
    }

    pub fn policy_limit(&self) -> f64 {
        self.policy_limit
    }

    pub fn calculated_premium(&self) -> f64 {
        self.calculated_premium
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_nan() || value < 0.0 {
        return Err(ValidationError::NegativePremiumField { field, value });
    }
    Ok(())
}
