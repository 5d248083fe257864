pub mod config;
pub mod domain;
pub mod errors;
pub mod quote;
pub mod rating;

pub use domain::address::Address;
pub use domain::events::QuoteCalculated;
pub use domain::premium::Premium;
pub use domain::vehicle::Vehicle;
pub use errors::{
    ApplicationError, DomainError, InterfaceError, PersistenceError, ValidationError,
};
pub use quote::dto::{AddressPayload, CarPayload, PremiumRequest, PremiumResponse};
pub use quote::record::{QuoteFilters, QuoteQuery, QuoteRecord, QuoteRecordId};
pub use quote::service::{PersistenceOutcome, QuoteOutcome, QuoteService};
pub use quote::store::QuoteStore;
pub use rating::{PremiumRater, RatingEngine, RatingResult, RatingTrace};
