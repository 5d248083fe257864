use serde::{Deserialize, Serialize};

use crate::domain::{address::Address, premium::Premium, vehicle::Vehicle};
use crate::errors::ValidationError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressPayload {
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub street: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CarPayload {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub value: f64,
    pub registration_location: Option<AddressPayload>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PremiumRequest {
    pub car: CarPayload,
    pub deductible_percentage: f64,
    pub broker_fee: f64,
}

/// Rated quote as returned to callers: the submitted car echoed back plus
/// the priced amounts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PremiumResponse {
    pub car: CarPayload,
    pub applied_rate: f64,
    pub policy_limit: f64,
    pub calculated_premium: f64,
    pub deductible_value: f64,
}

impl AddressPayload {
    pub fn to_address(&self) -> Result<Address, ValidationError> {
        Address::new(
            self.city.clone(),
            self.state.clone(),
            self.postal_code.clone(),
            self.street.clone(),
        )
    }
}

impl CarPayload {
    pub fn to_vehicle(&self) -> Result<Vehicle, ValidationError> {
        let registration_location =
            self.registration_location.as_ref().map(AddressPayload::to_address).transpose()?;

        Vehicle::new(
            self.make.clone(),
            self.model.clone(),
            self.year,
            self.value,
            registration_location,
        )
    }
}

impl PremiumResponse {
    pub fn new(car: CarPayload, premium: &Premium) -> Self {
        Self {
            car,
            applied_rate: premium.applied_rate(),
            policy_limit: premium.policy_limit(),
            calculated_premium: premium.calculated_premium(),
            deductible_value: premium.deductible_value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AddressPayload, CarPayload, PremiumRequest};
    use crate::errors::ValidationError;

    #[test]
    fn decodes_request_without_location() {
        let request: PremiumRequest = serde_json::from_str(
            r#"{"car":{"make":"Toyota","model":"Corolla","year":2012,"value":100000.0},
                "deductible_percentage":0.1,"broker_fee":50.0}"#,
        )
        .expect("request should decode");

        assert_eq!(request.car.make, "Toyota");
        assert!(request.car.registration_location.is_none());
        assert_eq!(request.broker_fee, 50.0);
    }

    #[test]
    fn converts_payload_with_location_into_vehicle() {
        let car = CarPayload {
            make: "Toyota".to_string(),
            model: "Corolla".to_string(),
            year: 2012,
            value: 100_000.0,
            registration_location: Some(AddressPayload {
                city: "São Paulo".to_string(),
                state: "SP".to_string(),
                postal_code: "01310-200".to_string(),
                street: None,
            }),
        };

        let vehicle = car.to_vehicle().expect("valid vehicle");
        let address = vehicle.registration_location().expect("address should be kept");

        assert_eq!(vehicle.year(), 2012);
        assert_eq!(address.city(), "São Paulo");
        assert_eq!(address.postal_code(), "01310-200");
    }

    #[test]
    fn malformed_address_fails_conversion() {
        let car = CarPayload {
            make: "Toyota".to_string(),
            model: "Corolla".to_string(),
            year: 2012,
            value: 100_000.0,
            registration_location: Some(AddressPayload {
                city: "São Paulo".to_string(),
                state: "SP".to_string(),
                postal_code: String::new(),
                street: None,
            }),
        };

        assert_eq!(car.to_vehicle(), Err(ValidationError::EmptyPostalCode));
    }
}
