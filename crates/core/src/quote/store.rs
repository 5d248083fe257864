use async_trait::async_trait;

use crate::errors::PersistenceError;
use crate::quote::dto::{PremiumRequest, PremiumResponse};
use crate::quote::record::{QuoteQuery, QuoteRecord, QuoteRecordId};

/// Write-once history of rated quotes. Records are never updated or deleted.
#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn save(
        &self,
        request: &PremiumRequest,
        response: &PremiumResponse,
        base_premium: f64,
    ) -> Result<QuoteRecordId, PersistenceError>;

    async fn fetch_by_id(&self, id: &QuoteRecordId)
        -> Result<Option<QuoteRecord>, PersistenceError>;

    async fn list(&self, query: &QuoteQuery) -> Result<Vec<QuoteRecord>, PersistenceError>;
}
