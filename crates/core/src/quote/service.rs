use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{events::QuoteCalculated, premium::Premium};
use crate::errors::{ApplicationError, ValidationError};
use crate::quote::dto::{PremiumRequest, PremiumResponse};
use crate::quote::record::{QuoteQuery, QuoteRecord, QuoteRecordId};
use crate::quote::store::QuoteStore;
use crate::rating::PremiumRater;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PersistenceOutcome {
    Saved(QuoteRecordId),
    Disabled,
    Failed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct QuoteOutcome {
    pub response: PremiumResponse,
    pub premium: Premium,
    pub persistence: PersistenceOutcome,
}

/// Turns premium requests into rated quotes and, when a store is attached,
/// records each one in the quote history.
///
/// A failed history write never fails the quote: the caller still receives
/// the computed response and the failure is reported in
/// [`QuoteOutcome::persistence`].
#[derive(Clone)]
pub struct QuoteService {
    rater: Arc<dyn PremiumRater>,
    store: Option<Arc<dyn QuoteStore>>,
}

impl QuoteService {
    pub fn new(rater: Arc<dyn PremiumRater>) -> Self {
        Self { rater, store: None }
    }

    pub fn with_store(rater: Arc<dyn PremiumRater>, store: Arc<dyn QuoteStore>) -> Self {
        Self { rater, store: Some(store) }
    }

    pub fn has_history(&self) -> bool {
        self.store.is_some()
    }

    /// Validates and rates a request without touching the history store.
    pub fn rate(
        &self,
        request: &PremiumRequest,
    ) -> Result<(PremiumResponse, QuoteCalculated), ApplicationError> {
        let vehicle = request.car.to_vehicle()?;
        if request.deductible_percentage == 0.0 {
            return Err(ValidationError::ZeroDeductible.into());
        }

        let premium =
            self.rater.rate(&vehicle, request.deductible_percentage, request.broker_fee)?;
        let response = PremiumResponse::new(request.car.clone(), &premium);
        let event = QuoteCalculated::new(
            vehicle,
            premium,
            request.deductible_percentage,
            request.broker_fee,
        );

        Ok((response, event))
    }

    pub async fn calculate(
        &self,
        request: &PremiumRequest,
        correlation_id: &str,
    ) -> Result<QuoteOutcome, ApplicationError> {
        let (response, event) = self.rate(request)?;
        event.emit(correlation_id);

        let premium = event.premium;
        let persistence = match &self.store {
            None => PersistenceOutcome::Disabled,
            Some(store) => match store.save(request, &response, premium.base_premium()).await {
                Ok(id) => {
                    info!(
                        event_name = "quote.persisted",
                        correlation_id = %correlation_id,
                        quote_id = %id,
                        "quote recorded in history"
                    );
                    PersistenceOutcome::Saved(id)
                }
                Err(error) => {
                    warn!(
                        event_name = "quote.persistence.failed",
                        correlation_id = %correlation_id,
                        error = %error,
                        "quote history write failed; returning computed quote"
                    );
                    PersistenceOutcome::Failed(error.to_string())
                }
            },
        };

        Ok(QuoteOutcome { response, premium, persistence })
    }

    pub async fn fetch(&self, id: &QuoteRecordId) -> Result<QuoteRecord, ApplicationError> {
        let store = self.store.as_ref().ok_or(ApplicationError::HistoryDisabled)?;
        store.fetch_by_id(id).await?.ok_or_else(|| ApplicationError::NotFound(id.to_string()))
    }

    pub async fn list(&self, query: &QuoteQuery) -> Result<Vec<QuoteRecord>, ApplicationError> {
        let store = self.store.as_ref().ok_or(ApplicationError::HistoryDisabled)?;
        Ok(store.list(query).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Mutex;

    use super::{PersistenceOutcome, QuoteService};
    use crate::domain::vehicle::current_year;
    use crate::errors::{ApplicationError, DomainError, PersistenceError, ValidationError};
    use crate::quote::dto::{CarPayload, PremiumRequest, PremiumResponse};
    use crate::quote::record::{QuoteQuery, QuoteRecord, QuoteRecordId};
    use crate::quote::store::QuoteStore;
    use crate::rating::RatingEngine;

    #[derive(Default)]
    struct RecordingStore {
        records: Mutex<Vec<QuoteRecord>>,
    }

    #[async_trait]
    impl QuoteStore for RecordingStore {
        async fn save(
            &self,
            request: &PremiumRequest,
            response: &PremiumResponse,
            base_premium: f64,
        ) -> Result<QuoteRecordId, PersistenceError> {
            let mut records = self.records.lock().await;
            let id = QuoteRecordId(format!("rec-{}", records.len() + 1));
            records.push(QuoteRecord::snapshot(
                id.clone(),
                Utc::now(),
                request,
                response,
                base_premium,
            )?);
            Ok(id)
        }

        async fn fetch_by_id(
            &self,
            id: &QuoteRecordId,
        ) -> Result<Option<QuoteRecord>, PersistenceError> {
            Ok(self.records.lock().await.iter().find(|record| &record.id == id).cloned())
        }

        async fn list(&self, _query: &QuoteQuery) -> Result<Vec<QuoteRecord>, PersistenceError> {
            Ok(self.records.lock().await.iter().rev().cloned().collect())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl QuoteStore for FailingStore {
        async fn save(
            &self,
            _request: &PremiumRequest,
            _response: &PremiumResponse,
            _base_premium: f64,
        ) -> Result<QuoteRecordId, PersistenceError> {
            Err(PersistenceError::Storage("disk full".to_string()))
        }

        async fn fetch_by_id(
            &self,
            _id: &QuoteRecordId,
        ) -> Result<Option<QuoteRecord>, PersistenceError> {
            Err(PersistenceError::Storage("disk full".to_string()))
        }

        async fn list(&self, _query: &QuoteQuery) -> Result<Vec<QuoteRecord>, PersistenceError> {
            Err(PersistenceError::Storage("disk full".to_string()))
        }
    }

    fn request(year: i32) -> PremiumRequest {
        PremiumRequest {
            car: CarPayload {
                make: "Toyota".to_string(),
                model: "Corolla".to_string(),
                year,
                value: 100_000.0,
                registration_location: None,
            },
            deductible_percentage: 0.1,
            broker_fee: 50.0,
        }
    }

    fn reference_request() -> PremiumRequest {
        request(current_year() - 10)
    }

    #[tokio::test]
    async fn calculates_reference_quote_without_history() {
        let service = QuoteService::new(Arc::new(RatingEngine::default()));

        let outcome =
            service.calculate(&reference_request(), "req-1").await.expect("quote succeeds");

        assert!((outcome.response.applied_rate - 0.10).abs() < 1e-12);
        assert!((outcome.response.deductible_value - 10_000.0).abs() < 1e-6);
        assert!((outcome.response.policy_limit - 90_000.0).abs() < 1e-6);
        assert!((outcome.response.calculated_premium - 9_050.0).abs() < 1e-6);
        assert_eq!(outcome.response.car, reference_request().car);
        assert_eq!(outcome.persistence, PersistenceOutcome::Disabled);
    }

    #[tokio::test]
    async fn records_quote_when_store_is_attached() {
        let store = Arc::new(RecordingStore::default());
        let service = QuoteService::with_store(Arc::new(RatingEngine::default()), store.clone());

        let outcome = service.calculate(&reference_request(), "req-2").await.expect("quote");
        let PersistenceOutcome::Saved(id) = outcome.persistence else {
            panic!("expected saved outcome, got {:?}", outcome.persistence);
        };

        let record = service.fetch(&id).await.expect("record present");
        assert_eq!(record.calculated_premium, outcome.response.calculated_premium);
        assert_eq!(record.base_premium, outcome.premium.base_premium());
        assert_eq!(store.records.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn failed_history_write_still_returns_quote() {
        let service =
            QuoteService::with_store(Arc::new(RatingEngine::default()), Arc::new(FailingStore));

        let outcome = service.calculate(&reference_request(), "req-3").await.expect("quote");

        assert!((outcome.response.calculated_premium - 9_050.0).abs() < 1e-6);
        assert!(matches!(
            outcome.persistence,
            PersistenceOutcome::Failed(ref message) if message.contains("disk full")
        ));
    }

    #[tokio::test]
    async fn zero_deductible_is_rejected_at_the_boundary() {
        let service = QuoteService::new(Arc::new(RatingEngine::default()));
        let mut request = reference_request();
        request.deductible_percentage = 0.0;

        let error = service.calculate(&request, "req-4").await.expect_err("zero deductible");

        assert_eq!(error, ApplicationError::from(ValidationError::ZeroDeductible));
    }

    #[tokio::test]
    async fn invalid_vehicle_is_reported_before_rating() {
        let service = QuoteService::new(Arc::new(RatingEngine::default()));
        let mut request = reference_request();
        request.car.make = String::new();
        request.deductible_percentage = 5.0;

        let error = service.calculate(&request, "req-5").await.expect_err("invalid make");

        assert_eq!(
            error,
            ApplicationError::Domain(DomainError::Validation(ValidationError::EmptyMake))
        );
    }

    #[tokio::test]
    async fn history_operations_need_a_store() {
        let service = QuoteService::new(Arc::new(RatingEngine::default()));

        assert_eq!(
            service.fetch(&QuoteRecordId("rec-1".to_string())).await,
            Err(ApplicationError::HistoryDisabled)
        );
        assert_eq!(
            service.list(&QuoteQuery::default()).await,
            Err(ApplicationError::HistoryDisabled)
        );
    }

    #[tokio::test]
    async fn unknown_record_is_not_found() {
        let service = QuoteService::with_store(
            Arc::new(RatingEngine::default()),
            Arc::new(RecordingStore::default()),
        );

        let error = service.fetch(&QuoteRecordId("missing".to_string())).await;

        assert_eq!(error, Err(ApplicationError::NotFound("missing".to_string())));
    }

    #[tokio::test]
    async fn store_read_failures_surface_as_persistence_errors() {
        let service =
            QuoteService::with_store(Arc::new(RatingEngine::default()), Arc::new(FailingStore));

        let error = service.list(&QuoteQuery::default()).await.expect_err("store down");

        assert!(matches!(error, ApplicationError::Persistence(PersistenceError::Storage(_))));
    }
}
