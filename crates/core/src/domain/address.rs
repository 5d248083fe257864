use serde::Serialize;

use crate::errors::ValidationError;

/// Registration location of a vehicle. Equality is purely structural.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Address {
    city: String,
    state: String,
    postal_code: String,
    street: Option<String>,
}

impl Address {
    pub fn new(
        city: impl Into<String>,
        state: impl Into<String>,
        postal_code: impl Into<String>,
        street: Option<String>,
    ) -> Result<Self, ValidationError> {
        let (city, state, postal_code) = (city.into(), state.into(), postal_code.into());

        if city.is_empty() {
            return Err(ValidationError::EmptyCity);
        }
        if state.is_empty() {
            return Err(ValidationError::EmptyState);
        }
        if postal_code.is_empty() {
            return Err(ValidationError::EmptyPostalCode);
        }

        Ok(Self { city, state, postal_code, street })
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }

    pub fn street(&self) -> Option<&str> {
        self.street.as_deref()
    }
}
