//! Photo storage — uploaded page images in the backend's object store.
//!
//! Images travel as raw bytes; stored objects are referenced by opaque path
//! strings of the form `{year}/{timestamp}_{name}`.

use crate::config::BackendConfig;
use crate::entries::{AuthContext, StoreError};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};

/// A stored page image.
#[derive(Debug, Clone)]
pub struct StoredPhoto {
    pub path: String,
    pub public_url: String,
}

/// Seam to the object store holding uploaded page images.
#[async_trait]
pub trait PhotoStorage: Send + Sync {
    async fn upload(
        &self,
        auth: &AuthContext,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredPhoto, StoreError>;

    fn public_url(&self, path: &str) -> String;
}

pub struct PhotoStore {
    http: reqwest::Client,
    storage_url: String,
    bucket: String,
    anon_key: String,
}

impl PhotoStore {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            storage_url: config.storage_url(),
            bucket: config.photos_bucket.clone(),
            anon_key: config.anon_key.clone(),
        }
    }

    /// Object path for a page image: year folder, millisecond timestamp
    /// prefix so repeated uploads of the same file never collide.
    pub fn object_path(date: NaiveDate, file_name: &str) -> String {
        format!("{}/{}_{}", date.year(), Utc::now().timestamp_millis(), file_name)
    }
}

#[async_trait]
impl PhotoStorage for PhotoStore {
    /// Upload image bytes under `path`. Returns the stored path and its
    /// public URL.
    async fn upload(
        &self,
        auth: &AuthContext,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredPhoto, StoreError> {
        let url = format!("{}/object/{}/{}", self.storage_url, self.bucket, path);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&auth.access_token)
            .header("apikey", &self.anon_key)
            .header("content-type", content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        match status {
            reqwest::StatusCode::UNAUTHORIZED => return Err(StoreError::Unauthorized),
            reqwest::StatusCode::FORBIDDEN => return Err(StoreError::AccessDenied),
            s if !s.is_success() => {
                let body = response.text().await.unwrap_or_default();
                log::error!("[STORAGE] Upload returned {status}: {body}");
                return Err(StoreError::Persistence(format!("upload returned {status}")));
            }
            _ => {}
        }

        log::info!("[STORAGE] Uploaded {path}");
        Ok(StoredPhoto {
            path: path.to_string(),
            public_url: self.public_url(path),
        })
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/object/public/{}/{}", self.storage_url, self.bucket, path)
    }
}
