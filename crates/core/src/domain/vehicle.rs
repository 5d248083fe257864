use chrono::{Datelike, Utc};
use serde::Serialize;

use crate::domain::address::Address;
use crate::errors::ValidationError;

pub const MIN_MODEL_YEAR: i32 = 1900;

/// The insured car. Every field is checked once in [`Vehicle::new`] and the
/// value is never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Vehicle {
    make: String,
    model: String,
    year: i32,
    value: f64,
    registration_location: Option<Address>,
}

impl Vehicle {
    pub fn new(
        make: impl Into<String>,
        model: impl Into<String>,
        year: i32,
        value: f64,
        registration_location: Option<Address>,
    ) -> Result<Self, ValidationError> {
        let (make, model) = (make.into(), model.into());

        if make.is_empty() {
            return Err(ValidationError::EmptyMake);
        }
        if model.is_empty() {
            return Err(ValidationError::EmptyModel);
        }

        let max_year = current_year() + 1;
        if !(MIN_MODEL_YEAR..=max_year).contains(&year) {
            return Err(ValidationError::YearOutOfRange {
                year,
                min: MIN_MODEL_YEAR,
                max: max_year,
            });
        }

        if !value.is_finite() || value <= 0.0 {
            return Err(ValidationError::NonPositiveValue(value));
        }

        Ok(Self { make, model, year, value, registration_location })
    }

    pub fn make(&self) -> &str {
        &self.make
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn registration_location(&self) -> Option<&Address> {
        self.registration_location.as_ref()
    }

    /// Age in whole years as of today. Recomputed on every call.
    pub fn age(&self) -> i32 {
        self.age_in(current_year())
    }

    pub fn age_in(&self, year: i32) -> i32 {
        year - self.year
    }
}

pub fn current_year() -> i32 {
    Utc::now().year()
}

#[cfg(test)]
mod tests {
    use super::{current_year, Vehicle};
    use crate::domain::address::Address;
    use crate::errors::ValidationError;

    #[test]
    fn builds_valid_vehicle_and_derives_age() {
        let year = current_year() - 10;
        let vehicle = Vehicle::new("Toyota", "Corolla", year, 100_000.0, None).expect("valid");

        assert_eq!(vehicle.make(), "Toyota");
        assert_eq!(vehicle.model(), "Corolla");
        assert_eq!(vehicle.age(), 10);
        assert_eq!(vehicle.age_in(year + 3), 3);
        assert!(vehicle.registration_location().is_none());
    }

    #[test]
    fn next_model_year_is_accepted_with_negative_age() {
        let vehicle =
            Vehicle::new("Honda", "Civic", current_year() + 1, 150_000.0, None).expect("valid");

        assert_eq!(vehicle.age(), -1);
    }

    #[test]
    fn checks_fields_in_declared_order() {
        assert_eq!(Vehicle::new("", "", 1800, -1.0, None), Err(ValidationError::EmptyMake));
        assert_eq!(Vehicle::new("Fiat", "", 1800, -1.0, None), Err(ValidationError::EmptyModel));
        assert!(matches!(
            Vehicle::new("Fiat", "Uno", 1899, -1.0, None),
            Err(ValidationError::YearOutOfRange { year: 1899, min: 1900, .. })
        ));
        assert_eq!(
            Vehicle::new("Fiat", "Uno", 2000, -1.0, None),
            Err(ValidationError::NonPositiveValue(-1.0))
        );
    }

    #[test]
    fn rejects_years_outside_range() {
        let too_new = current_year() + 2;
        assert!(Vehicle::new("Fiat", "Uno", 1899, 10.0, None).is_err());
        assert!(Vehicle::new("Fiat", "Uno", too_new, 10.0, None).is_err());
        assert!(Vehicle::new("Fiat", "Uno", 1900, 10.0, None).is_ok());
    }

    #[test]
    fn rejects_zero_negative_and_nan_values() {
        assert!(Vehicle::new("Fiat", "Uno", 2010, 0.0, None).is_err());
        assert!(Vehicle::new("Fiat", "Uno", 2010, -5.0, None).is_err());
        assert!(Vehicle::new("Fiat", "Uno", 2010, f64::NAN, None).is_err());
        assert!(Vehicle::new("Fiat", "Uno", 2010, f64::INFINITY, None).is_err());
    }

    #[test]
    fn keeps_registration_location() {
        let address = Address::new("Curitiba", "PR", "80000-005", None).expect("valid address");
        let vehicle =
            Vehicle::new("VW", "Gol", 2015, 40_000.0, Some(address.clone())).expect("valid");

        assert_eq!(vehicle.registration_location(), Some(&address));
    }
}
