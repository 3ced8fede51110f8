//! Improve-text service — the HTTP side of AI improvement.
//!
//! One endpoint: `POST /improve-text` with `{"text": ...}` and a bearer
//! token, answering `{"improvedText": ...}` on success or `{"error": ...}`
//! with a non-2xx status on failure. Preflight `OPTIONS` is answered
//! permissively so browser clients can reach it.

use crate::llm::openai;
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct ServiceState {
    pub http: reqwest::Client,
    pub openai_api_key: Option<String>,
}

impl ServiceState {
    pub fn from_env() -> Self {
        Self {
            http: reqwest::Client::new(),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("missing or invalid authorization header")]
    Unauthorized,
    #[error("text is required")]
    MissingText,
    #[error("OpenAI API key not configured")]
    KeyNotConfigured,
    #[error("{0}")]
    Upstream(String),
}

/// Error body matches what the pipeline's improvement client parses.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::MissingText => StatusCode::BAD_REQUEST,
            ServiceError::KeyNotConfigured => {
                log::error!("[SERVICE] OPENAI_API_KEY is not set");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServiceError::Upstream(msg) => {
                log::error!("[SERVICE] Upstream failure: {msg}");
                StatusCode::BAD_GATEWAY
            }
        };
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

#[derive(Deserialize)]
struct ImproveRequest {
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImproveResponse {
    improved_text: String,
}

pub fn router(state: ServiceState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ]);

    Router::new()
        .route("/improve-text", post(improve_text))
        .layer(cors)
        .with_state(Arc::new(state))
}

async fn improve_text(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Json(request): Json<ImproveRequest>,
) -> Result<Json<ImproveResponse>, ServiceError> {
    require_bearer(&headers)?;

    let text = request
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or(ServiceError::MissingText)?;
    let api_key = state
        .openai_api_key
        .as_deref()
        .ok_or(ServiceError::KeyNotConfigured)?;

    log::info!("[SERVICE] Improving {} chars", text.len());
    let improved = openai::complete_improvement(&state.http, api_key, &text)
        .await
        .map_err(|e| ServiceError::Upstream(e.to_string()))?;

    Ok(Json(ImproveResponse {
        improved_text: improved,
    }))
}

/// Token validation itself belongs to the backend gateway in front of this
/// service; here we only reject requests with no usable bearer token at all.
fn require_bearer(headers: &HeaderMap) -> Result<(), ServiceError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ServiceError::Unauthorized)?;
    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(()),
        _ => Err(ServiceError::Unauthorized),
    }
}
