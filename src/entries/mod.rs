//! Entry persistence gateway — the journal's durable records.
//!
//! Typed REST client against the managed backend's row API. Authorization is
//! always an explicit `AuthContext` parameter; row-level security on the
//! backend is what actually rejects writes to entries the caller does not
//! own, and this gateway maps those rejections to `AccessDenied`.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Separator between OCR passes appended to the same entry.
const APPEND_SEPARATOR: &str = "\n\n---\n\n";

/// The authenticated user on whose behalf every call is made.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub access_token: String,
}

/// Improvement lifecycle of an entry's text. Transitions are one-directional
/// per session: `pending → completed` on AI improvement, anything →
/// `manual_edited` on a direct user save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImprovementStatus {
    Pending,
    Completed,
    ManualEdited,
}

/// Where an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    Foto,
    Pdf,
    OcrManual,
}

/// The subset of an entry row this pipeline reads.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryText {
    pub texto_ocr: Option<String>,
    pub improved_text: Option<String>,
    pub improvement_status: Option<ImprovementStatus>,
}

impl EntryText {
    /// The text to display: the improved version when present, otherwise the
    /// OCR text. No other reconciliation between the two is attempted.
    pub fn display_text(&self) -> &str {
        self.improved_text
            .as_deref()
            .or(self.texto_ocr.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not authenticated")]
    Unauthorized,
    #[error("entry not found or not owned by the caller")]
    AccessDenied,
    #[error("persistence call failed: {0}")]
    Persistence(String),
    #[error("persistence transport failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Seam to the backing store, injectable so the editor state machine can be
/// tested without a backend.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Create an empty entry for `date` and return its id.
    async fn create_entry(
        &self,
        auth: &AuthContext,
        date: NaiveDate,
        source: EntrySource,
    ) -> Result<Uuid, StoreError>;

    /// Overwrite the entry's OCR text and status.
    async fn save_ocr_text(
        &self,
        auth: &AuthContext,
        entry_id: Uuid,
        text: &str,
        status: ImprovementStatus,
    ) -> Result<(), StoreError>;

    /// Store an AI-improved version alongside the OCR text and mark the
    /// entry `completed`.
    async fn save_improved_text(
        &self,
        auth: &AuthContext,
        entry_id: Uuid,
        improved: &str,
    ) -> Result<(), StoreError>;

    /// Append a new OCR pass to whatever text the entry already holds and
    /// mark it `pending` for later improvement. Returns the stored text.
    async fn append_ocr_text(
        &self,
        auth: &AuthContext,
        entry_id: Uuid,
        text: &str,
    ) -> Result<String, StoreError>;

    /// Fetch the entry's text fields.
    async fn fetch_entry_text(
        &self,
        auth: &AuthContext,
        entry_id: Uuid,
    ) -> Result<EntryText, StoreError>;
}

pub struct EntryGateway {
    http: reqwest::Client,
    entries_url: String,
    anon_key: String,
}

#[derive(Debug, Deserialize)]
struct CreatedRow {
    id: Uuid,
}

impl EntryGateway {
    pub fn new(config: &crate::config::BackendConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            entries_url: format!("{}/entradas", config.rest_url()),
            anon_key: config.anon_key.clone(),
        }
    }

    fn authed(&self, builder: reqwest::RequestBuilder, auth: &AuthContext) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&auth.access_token)
            .header("apikey", &self.anon_key)
    }

    /// Map a row-API response to rows, turning auth failures and empty
    /// (RLS-filtered) results into the right error.
    async fn expect_rows<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<Vec<T>, StoreError> {
        let status = response.status();
        match status {
            reqwest::StatusCode::UNAUTHORIZED => return Err(StoreError::Unauthorized),
            reqwest::StatusCode::FORBIDDEN => return Err(StoreError::AccessDenied),
            s if !s.is_success() => {
                let body = response.text().await.unwrap_or_default();
                log::error!("[STORE] Row API returned {status}: {body}");
                return Err(StoreError::Persistence(format!("row API returned {status}")));
            }
            _ => {}
        }
        let rows: Vec<T> = response.json().await?;
        // Under row-level security a write against someone else's entry
        // succeeds with zero rows rather than failing.
        if rows.is_empty() {
            return Err(StoreError::AccessDenied);
        }
        Ok(rows)
    }
}

#[async_trait]
impl EntryStore for EntryGateway {
    async fn create_entry(
        &self,
        auth: &AuthContext,
        date: NaiveDate,
        source: EntrySource,
    ) -> Result<Uuid, StoreError> {
        let request = self
            .authed(self.http.post(&self.entries_url), auth)
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({
                "user_id": auth.user_id,
                "fecha": date.format("%Y-%m-%d").to_string(),
                "fuente": source,
                "texto_ocr": "",
                "improvement_status": ImprovementStatus::Pending,
            }));

        let rows: Vec<CreatedRow> = Self::expect_rows(request.send().await?).await?;
        let id = rows[0].id;
        log::info!("[STORE] Created entry {id} for {date}");
        Ok(id)
    }

    async fn save_ocr_text(
        &self,
        auth: &AuthContext,
        entry_id: Uuid,
        text: &str,
        status: ImprovementStatus,
    ) -> Result<(), StoreError> {
        let url = format!("{}?id=eq.{}", self.entries_url, entry_id);
        let request = self
            .authed(self.http.patch(&url), auth)
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({
                "texto_ocr": text,
                "improvement_status": status,
            }));

        Self::expect_rows::<CreatedRow>(request.send().await?).await?;
        log::info!("[STORE] Saved {} chars to entry {entry_id} ({status:?})", text.len());
        Ok(())
    }

    async fn save_improved_text(
        &self,
        auth: &AuthContext,
        entry_id: Uuid,
        improved: &str,
    ) -> Result<(), StoreError> {
        let url = format!("{}?id=eq.{}", self.entries_url, entry_id);
        let request = self
            .authed(self.http.patch(&url), auth)
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({
                "improved_text": improved,
                "improvement_status": ImprovementStatus::Completed,
            }));

        Self::expect_rows::<CreatedRow>(request.send().await?).await?;
        log::info!("[STORE] Saved improved text to entry {entry_id}");
        Ok(())
    }

    async fn append_ocr_text(
        &self,
        auth: &AuthContext,
        entry_id: Uuid,
        text: &str,
    ) -> Result<String, StoreError> {
        let existing = self
            .fetch_entry_text(auth, entry_id)
            .await?
            .texto_ocr
            .unwrap_or_default();
        let combined = join_ocr_passes(&existing, text);
        self.save_ocr_text(auth, entry_id, &combined, ImprovementStatus::Pending)
            .await?;
        Ok(combined)
    }

    async fn fetch_entry_text(
        &self,
        auth: &AuthContext,
        entry_id: Uuid,
    ) -> Result<EntryText, StoreError> {
        let url = format!(
            "{}?id=eq.{}&select=texto_ocr,improved_text,improvement_status",
            self.entries_url, entry_id
        );
        let request = self.authed(self.http.get(&url), auth);
        let mut rows: Vec<EntryText> = Self::expect_rows(request.send().await?).await?;
        Ok(rows.remove(0))
    }
}

/// Concatenate a new OCR pass onto existing entry text.
pub fn join_ocr_passes(existing: &str, new_text: &str) -> String {
    if existing.is_empty() {
        new_text.to_string()
    } else {
        format!("{existing}{APPEND_SEPARATOR}{new_text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_to_backend_column_values() {
        assert_eq!(
            serde_json::to_string(&ImprovementStatus::ManualEdited).unwrap(),
            "\"manual_edited\""
        );
        assert_eq!(
            serde_json::to_string(&ImprovementStatus::Pending).unwrap(),
            "\"pending\""
        );
        let parsed: ImprovementStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(parsed, ImprovementStatus::Completed);
    }

    #[test]
    fn source_serializes_to_backend_values() {
        assert_eq!(serde_json::to_string(&EntrySource::OcrManual).unwrap(), "\"ocr_manual\"");
        assert_eq!(serde_json::to_string(&EntrySource::Foto).unwrap(), "\"foto\"");
    }

    #[test]
    fn display_text_prefers_improved_version() {
        let entry = EntryText {
            texto_ocr: Some("crudo".to_string()),
            improved_text: Some("mejorado".to_string()),
            improvement_status: Some(ImprovementStatus::Completed),
        };
        assert_eq!(entry.display_text(), "mejorado");

        let entry = EntryText {
            texto_ocr: Some("crudo".to_string()),
            improved_text: None,
            improvement_status: Some(ImprovementStatus::Pending),
        };
        assert_eq!(entry.display_text(), "crudo");
    }

    #[test]
    fn appended_passes_are_separated() {
        assert_eq!(join_ocr_passes("", "nuevo"), "nuevo");
        assert_eq!(join_ocr_passes("viejo", "nuevo"), "viejo\n\n---\n\nnuevo");
    }
}
