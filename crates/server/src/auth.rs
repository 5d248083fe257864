use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;
use uuid::Uuid;

use crate::api::ApiError;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone, Default)]
pub struct ApiKeyGuard {
    expected: Option<SecretString>,
}

impl ApiKeyGuard {
    pub fn new(expected: Option<SecretString>) -> Self {
        Self { expected }
    }

    fn admits(&self, presented: Option<&str>) -> bool {
        match &self.expected {
            None => true,
            Some(expected) => presented == Some(expected.expose_secret()),
        }
    }
}

pub async fn require_api_key(
    State(guard): State<ApiKeyGuard>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request.headers().get(API_KEY_HEADER).and_then(|value| value.to_str().ok());
    if guard.admits(presented) {
        return next.run(request).await;
    }

    let correlation_id = Uuid::new_v4().to_string();
    warn!(
        event_name = "api.auth.rejected",
        correlation_id = %correlation_id,
        path = %request.uri().path(),
        key_present = presented.is_some(),
        "rejected request without a valid api key"
    );

    (
        StatusCode::UNAUTHORIZED,
        Json(ApiError {
            error: "A valid API key is required.".to_string(),
            detail: format!("missing or invalid `{API_KEY_HEADER}` header"),
            correlation_id,
        }),
    )
        .into_response()
}
