//! Environment-backed configuration for the managed backend.
//!
//! All remote endpoints hang off one base URL; the anon key identifies the
//! application to the backend gateway. User credentials are NOT config —
//! they arrive per call as an explicit `AuthContext`.

use crate::ocr::OcrLanguage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
}

/// Connection settings for the managed backend (rows, storage, functions).
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub anon_key: String,
    pub photos_bucket: String,
}

impl BackendConfig {
    /// Read from `DIARIO_BACKEND_URL` / `DIARIO_ANON_KEY` /
    /// `DIARIO_PHOTOS_BUCKET` (bucket defaults to "diario-fotos").
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = require_var("DIARIO_BACKEND_URL")?;
        let anon_key = require_var("DIARIO_ANON_KEY")?;
        let photos_bucket =
            std::env::var("DIARIO_PHOTOS_BUCKET").unwrap_or_else(|_| "diario-fotos".to_string());
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            photos_bucket,
        })
    }

    /// Row API root (PostgREST conventions).
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.base_url)
    }

    /// Serverless functions root.
    pub fn functions_url(&self) -> String {
        format!("{}/functions/v1", self.base_url)
    }

    /// Object storage root.
    pub fn storage_url(&self) -> String {
        format!("{}/storage/v1", self.base_url)
    }
}

/// OCR language set from `DIARIO_OCR_LANGS` (comma-separated traineddata
/// codes). Unknown codes are ignored; an empty or unset variable yields the
/// Spanish + English default.
pub fn ocr_languages_from_env() -> Vec<OcrLanguage> {
    let parsed: Vec<OcrLanguage> = std::env::var("DIARIO_OCR_LANGS")
        .unwrap_or_default()
        .split(',')
        .filter_map(OcrLanguage::from_code)
        .collect();
    if parsed.is_empty() {
        vec![OcrLanguage::Spanish, OcrLanguage::English]
    } else {
        parsed
    }
}

fn require_var(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

/// Load `.env.local` then `.env` from the crate root, first hit wins.
/// Call once at startup, before reading any config.
pub fn load_dotenv() {
    let manifest_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    for env_file in [".env.local", ".env"] {
        let path = manifest_dir.join(env_file);
        if path.exists() {
            match dotenvy::from_path(&path) {
                Ok(_) => eprintln!("[STARTUP] Loaded {}", path.display()),
                Err(e) => eprintln!("[STARTUP] Failed to load {}: {}", path.display(), e),
            }
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_roots_derive_from_base_url() {
        let config = BackendConfig {
            base_url: "https://backend.example.com".to_string(),
            anon_key: "anon".to_string(),
            photos_bucket: "diario-fotos".to_string(),
        };
        assert_eq!(config.rest_url(), "https://backend.example.com/rest/v1");
        assert_eq!(config.functions_url(), "https://backend.example.com/functions/v1");
        assert_eq!(config.storage_url(), "https://backend.example.com/storage/v1");
    }
}
