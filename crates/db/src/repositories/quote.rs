use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use autoquote_core::errors::PersistenceError;
use autoquote_core::quote::dto::{PremiumRequest, PremiumResponse};
use autoquote_core::quote::record::{QuoteQuery, QuoteRecord, QuoteRecordId};
use autoquote_core::quote::store::QuoteStore;

use super::RepositoryError;
use crate::DbPool;

const SELECT_COLUMNS: &str = "SELECT id, created_at, car_make, car_model, car_year, car_value,
        deductible_percentage, broker_fee, has_location, city, state, postal_code,
        applied_rate, base_premium, deductible_value, policy_limit, calculated_premium,
        request_data, response_data
 FROM premium_calculation";

pub struct SqlQuoteStore {
    pool: DbPool,
}

impl SqlQuoteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, record: &QuoteRecord) -> Result<(), RepositoryError> {
        let request_data = encode_json("request_data", &record.request_data)?;
        let response_data = encode_json("response_data", &record.response_data)?;

        sqlx::query(
            "INSERT INTO premium_calculation (
                id, created_at, car_make, car_model, car_year, car_value,
                deductible_percentage, broker_fee, has_location, city, state, postal_code,
                applied_rate, base_premium, deductible_value, policy_limit, calculated_premium,
                request_data, response_data
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id.0)
        .bind(record.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .bind(&record.car_make)
        .bind(&record.car_model)
        .bind(record.car_year)
        .bind(record.car_value)
        .bind(record.deductible_percentage)
        .bind(record.broker_fee)
        .bind(record.has_location)
        .bind(&record.city)
        .bind(&record.state)
        .bind(&record.postal_code)
        .bind(record.applied_rate)
        .bind(record.base_premium)
        .bind(record.deductible_value)
        .bind(record.policy_limit)
        .bind(record.calculated_premium)
        .bind(request_data)
        .bind(response_data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch(&self, id: &QuoteRecordId) -> Result<Option<QuoteRecord>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn select(&self, query: &QuoteQuery) -> Result<Vec<QuoteRecord>, RepositoryError> {
        let filters = &query.filters;
        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        builder.push(" WHERE 1 = 1");

        if let Some(make) = &filters.car_make {
            builder.push(" AND car_make = ").push_bind(make.clone());
        }
        if let Some(model) = &filters.car_model {
            builder.push(" AND car_model = ").push_bind(model.clone());
        }
        if let Some(min_value) = filters.min_value {
            builder.push(" AND car_value >= ").push_bind(min_value);
        }
        if let Some(max_value) = filters.max_value {
            builder.push(" AND car_value <= ").push_bind(max_value);
        }
        if let Some(state) = &filters.state {
            builder.push(" AND state = ").push_bind(state.clone());
        }

        builder
            .push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
            .push_bind(i64::from(query.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(query.skip));

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(record_from_row).collect()
    }
}

#[async_trait]
impl QuoteStore for SqlQuoteStore {
    async fn save(
        &self,
        request: &PremiumRequest,
        response: &PremiumResponse,
        base_premium: f64,
    ) -> Result<QuoteRecordId, PersistenceError> {
        let id = QuoteRecordId(Uuid::new_v4().to_string());
        let record = QuoteRecord::snapshot(
            id.clone(),
            Utc::now().trunc_subsecs(6),
            request,
            response,
            base_premium,
        )?;
        self.insert(&record).await?;
        Ok(id)
    }

    async fn fetch_by_id(
        &self,
        id: &QuoteRecordId,
    ) -> Result<Option<QuoteRecord>, PersistenceError> {
        Ok(self.fetch(id).await?)
    }

    async fn list(&self, query: &QuoteQuery) -> Result<Vec<QuoteRecord>, PersistenceError> {
        Ok(self.select(query).await?)
    }
}

fn record_from_row(row: &SqliteRow) -> Result<QuoteRecord, RepositoryError> {
    let created_at: String = row.try_get("created_at")?;
    let request_data: String = row.try_get("request_data")?;
    let response_data: String = row.try_get("response_data")?;

    Ok(QuoteRecord {
        id: QuoteRecordId(row.try_get("id")?),
        created_at: parse_rfc3339("created_at", &created_at)?,
        car_make: row.try_get("car_make")?,
        car_model: row.try_get("car_model")?,
        car_year: row.try_get("car_year")?,
        car_value: row.try_get("car_value")?,
        deductible_percentage: row.try_get("deductible_percentage")?,
        broker_fee: row.try_get("broker_fee")?,
        has_location: row.try_get("has_location")?,
        city: row.try_get("city")?,
        state: row.try_get("state")?,
        postal_code: row.try_get("postal_code")?,
        applied_rate: row.try_get("applied_rate")?,
        base_premium: row.try_get("base_premium")?,
        deductible_value: row.try_get("deductible_value")?,
        policy_limit: row.try_get("policy_limit")?,
        calculated_premium: row.try_get("calculated_premium")?,
        request_data: parse_json("request_data", &request_data)?,
        response_data: parse_json("response_data", &response_data)?,
    })
}

fn parse_rfc3339(field: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value).map(|ts| ts.with_timezone(&Utc)).map_err(|err| {
        RepositoryError::Decode(format!("invalid {field} timestamp '{value}': {err}"))
    })
}

fn encode_json<T: serde::Serialize + ?Sized>(
    field: &str,
    value: &T,
) -> Result<String, RepositoryError> {
    serde_json::to_string(value)
        .map_err(|err| RepositoryError::Encode(format!("cannot encode {field}: {err}")))
}

fn parse_json(field: &str, value: &str) -> Result<serde_json::Value, RepositoryError> {
    serde_json::from_str(value)
        .map_err(|err| RepositoryError::Decode(format!("invalid {field} payload: {err}")))
}
