//! Client for the improve-text function endpoint.
//!
//! Sends normalized or user-edited text to the improvement service and
//! returns the rewritten version. On any failure the caller keeps showing
//! the text it already had — this client never substitutes the original
//! text for a missing improvement.

use crate::config::BackendConfig;
use crate::entries::AuthContext;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImproveError {
    #[error("not authorized to request text improvement")]
    Unauthorized,
    #[error("improvement service failed: {0}")]
    Upstream(String),
    #[error("improvement request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Seam for the external text-completion service.
#[async_trait]
pub trait TextImprover: Send + Sync {
    async fn improve(&self, text: &str, auth: &AuthContext) -> Result<String, ImproveError>;
}

/// Success body of the improve-text function.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImproveResponse {
    improved_text: String,
}

/// Error body of the improve-text function.
#[derive(Debug, Deserialize)]
struct ImproveErrorBody {
    error: String,
}

pub struct ImprovementClient {
    http: reqwest::Client,
    endpoint: String,
    anon_key: String,
}

impl ImprovementClient {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/improve-text", config.functions_url()),
            anon_key: config.anon_key.clone(),
        }
    }
}

#[async_trait]
impl TextImprover for ImprovementClient {
    async fn improve(&self, text: &str, auth: &AuthContext) -> Result<String, ImproveError> {
        let start = std::time::Instant::now();
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&auth.access_token)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ImproveError::Unauthorized);
        }
        if !status.is_success() {
            let message = match response.json::<ImproveErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => format!("service returned {status}"),
            };
            log::error!("[LLM] Improvement service returned {status}: {message}");
            return Err(ImproveError::Upstream(message));
        }

        let body: ImproveResponse = response.json().await?;
        if body.improved_text.trim().is_empty() {
            return Err(ImproveError::Upstream("empty completion returned".to_string()));
        }

        log::info!(
            "[LLM] Improved {} chars in {}ms",
            text.len(),
            start.elapsed().as_millis()
        );
        Ok(body.improved_text)
    }
}
