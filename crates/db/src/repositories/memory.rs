use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use autoquote_core::errors::PersistenceError;
use autoquote_core::quote::dto::{PremiumRequest, PremiumResponse};
use autoquote_core::quote::record::{QuoteQuery, QuoteRecord, QuoteRecordId};
use autoquote_core::quote::store::QuoteStore;

/// Process-local quote history. Records are kept in insertion order.
#[derive(Default)]
pub struct InMemoryQuoteStore {
    records: RwLock<Vec<QuoteRecord>>,
}

impl InMemoryQuoteStore {
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl QuoteStore for InMemoryQuoteStore {
    async fn save(
        &self,
        request: &PremiumRequest,
        response: &PremiumResponse,
        base_premium: f64,
    ) -> Result<QuoteRecordId, PersistenceError> {
        let id = QuoteRecordId(Uuid::new_v4().to_string());
        let record =
            QuoteRecord::snapshot(id.clone(), Utc::now(), request, response, base_premium)?;
        let mut records = self.records.write().await;
        records.push(record);
        Ok(id)
    }

    async fn fetch_by_id(
        &self,
        id: &QuoteRecordId,
    ) -> Result<Option<QuoteRecord>, PersistenceError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|record| &record.id == id).cloned())
    }

    async fn list(&self, query: &QuoteQuery) -> Result<Vec<QuoteRecord>, PersistenceError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .filter(|record| query.filters.matches(record))
            .skip(query.skip as usize)
            .take(query.limit as usize)
            .cloned()
            .collect())
    }
}
