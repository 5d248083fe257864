use std::sync::Arc;

use autoquote_core::config::ServerConfig;
use autoquote_core::errors::{ApplicationError, InterfaceError};
use autoquote_core::quote::dto::{PremiumRequest, PremiumResponse};
use autoquote_core::quote::record::{QuoteFilters, QuoteQuery, QuoteRecord, QuoteRecordId};
use autoquote_core::quote::service::{PersistenceOutcome, QuoteService};
use autoquote_db::DbPool;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};
use uuid::Uuid;

use crate::auth::{require_api_key, ApiKeyGuard};
use crate::health;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";
pub const QUOTE_ID_HEADER: &str = "x-quote-id";
pub const PERSISTENCE_HEADER: &str = "x-quote-persistence";

const INTERNAL_ERROR_DETAIL: &str = "internal error; quote the correlation id when reporting it";

#[derive(Clone)]
pub struct ApiState {
    pub quotes: Arc<QuoteService>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub detail: String,
    pub correlation_id: String,
}

/// Query string accepted by the history listing.
#[derive(Debug, Default, Deserialize)]
pub struct CalculationsParams {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
    pub car_make: Option<String>,
    pub car_model: Option<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub state: Option<String>,
}

impl From<CalculationsParams> for QuoteQuery {
    fn from(params: CalculationsParams) -> Self {
        QuoteQuery::new(
            params.skip,
            params.limit,
            QuoteFilters {
                car_make: params.car_make,
                car_model: params.car_model,
                min_value: params.min_value,
                max_value: params.max_value,
                state: params.state,
            },
        )
    }
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

pub fn router(
    quotes: Arc<QuoteService>,
    db_pool: Option<DbPool>,
    server: &ServerConfig,
) -> Router {
    let guard = ApiKeyGuard::new(server.api_key.clone());

    let insurance = Router::new()
        .route("/insurance/calculate", post(calculate))
        .route("/insurance/calculations", get(list_calculations))
        .route("/insurance/calculations/{id}", get(get_calculation))
        .route_layer(middleware::from_fn_with_state(guard, require_api_key))
        .with_state(ApiState { quotes });

    let app = insurance.merge(health::router(db_pool)).layer(TraceLayer::new_for_http());

    if server.cors_allow_any_origin {
        app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any),
        )
    } else {
        app
    }
}

pub async fn calculate(
    State(state): State<ApiState>,
    payload: Result<Json<PremiumRequest>, JsonRejection>,
) -> ApiResult<(HeaderMap, Json<PremiumResponse>)> {
    let correlation_id = Uuid::new_v4().to_string();
    let Json(request) = payload.map_err(|rejection| {
        reject(InterfaceError::BadRequest {
            message: rejection.body_text(),
            correlation_id: correlation_id.clone(),
        })
    })?;

    let outcome = state
        .quotes
        .calculate(&request, &correlation_id)
        .await
        .map_err(|error| fail(error, &correlation_id))?;

    let mut headers = correlation_headers(&correlation_id);
    match &outcome.persistence {
        PersistenceOutcome::Saved(id) => {
            if let Ok(value) = HeaderValue::from_str(&id.0) {
                headers.insert(QUOTE_ID_HEADER, value);
            }
        }
        PersistenceOutcome::Failed(_) => {
            headers.insert(PERSISTENCE_HEADER, HeaderValue::from_static("failed"));
        }
        PersistenceOutcome::Disabled => {}
    }

    Ok((headers, Json(outcome.response)))
}

pub async fn get_calculation(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<QuoteRecord>> {
    let correlation_id = Uuid::new_v4().to_string();
    let record = state
        .quotes
        .fetch(&QuoteRecordId(id))
        .await
        .map_err(|error| fail(error, &correlation_id))?;
    Ok(Json(record))
}

pub async fn list_calculations(
    State(state): State<ApiState>,
    params: Result<Query<CalculationsParams>, QueryRejection>,
) -> ApiResult<Json<Vec<QuoteRecord>>> {
    let correlation_id = Uuid::new_v4().to_string();
    let Query(params) = params.map_err(|rejection| {
        reject(InterfaceError::BadRequest {
            message: rejection.body_text(),
            correlation_id: correlation_id.clone(),
        })
    })?;

    let records = state
        .quotes
        .list(&QuoteQuery::from(params))
        .await
        .map_err(|error| fail(error, &correlation_id))?;
    Ok(Json(records))
}

fn correlation_headers(correlation_id: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(correlation_id) {
        headers.insert(CORRELATION_ID_HEADER, value);
    }
    headers
}

fn fail(error: ApplicationError, correlation_id: &str) -> (StatusCode, Json<ApiError>) {
    let interface = error.into_interface(correlation_id);
    match &interface {
        InterfaceError::Internal { message, .. } => error!(
            event_name = "api.request.internal_error",
            correlation_id = %correlation_id,
            error = %message,
            "request failed with an internal error"
        ),
        other => warn!(
            event_name = "api.request.rejected",
            correlation_id = %correlation_id,
            error = %other,
            "request rejected"
        ),
    }
    reject(interface)
}

fn reject(error: InterfaceError) -> (StatusCode, Json<ApiError>) {
    let status = match &error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    // Internal messages stay in the `api.request.internal_error` log.
    let detail = match &error {
        InterfaceError::Internal { .. } => INTERNAL_ERROR_DETAIL.to_string(),
        other => other.message().to_string(),
    };

    (
        status,
        Json(ApiError {
            error: error.user_message().to_string(),
            detail,
            correlation_id: error.correlation_id().to_string(),
        }),
    )
}
