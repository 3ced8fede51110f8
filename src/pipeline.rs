//! Page ingest pipeline — capture/upload → entry → OCR → stored text.
//!
//! This is the multi-step flow behind "add a page": store the image, create
//! the entry record, run recognition, normalize, append the text to the
//! entry. Review/editing of the text afterwards is the editor controller's
//! job.

use crate::capture::{capture_jpeg, CaptureError, FrameSource};
use crate::editor::Notice;
use crate::entries::{AuthContext, EntrySource, EntryStore, StoreError};
use crate::ocr::{
    dates::find_dates, normalize::normalize, ExtractionError, TextRecognizer,
    LOW_CONFIDENCE_THRESHOLD,
};
use crate::storage::{PhotoStorage, PhotoStore, StoredPhoto};
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What an ingest produced: the durable pieces plus advisory notices.
#[derive(Debug)]
pub struct IngestOutcome {
    pub entry_id: Uuid,
    pub photo: StoredPhoto,
    /// Normalized text appended to the entry; empty for non-image files.
    pub text: String,
    pub notices: Vec<Notice>,
}

/// Ingest one uploaded file for `date`. PDFs are stored without recognition;
/// images go through OCR and the normalized text is appended to the entry.
pub async fn ingest_file(
    photos: &dyn PhotoStorage,
    store: &dyn EntryStore,
    recognizer: &dyn TextRecognizer,
    auth: &AuthContext,
    date: NaiveDate,
    file_name: &str,
    bytes: Vec<u8>,
    content_type: &str,
) -> Result<IngestOutcome, IngestError> {
    let is_pdf = content_type.contains("pdf");
    let source = if is_pdf { EntrySource::Pdf } else { EntrySource::Foto };

    let path = PhotoStore::object_path(date, file_name);
    let image_bytes = if is_pdf { None } else { Some(bytes.clone()) };
    let photo = photos.upload(auth, &path, bytes, content_type).await?;
    let entry_id = store.create_entry(auth, date, source).await?;

    let (text, notices) = match image_bytes {
        Some(bytes) => {
            let recognition = recognizer.extract(&bytes).await?;
            let normalized = normalize(&recognition.text);

            let mut notices = Vec::new();
            if recognition.confidence < LOW_CONFIDENCE_THRESHOLD {
                notices.push(Notice::LowConfidence {
                    confidence: recognition.confidence,
                });
            }
            let date_count = find_dates(&normalized).len();
            if date_count > 0 {
                notices.push(Notice::DatesDetected { count: date_count });
            }

            let stored = store.append_ocr_text(auth, entry_id, &normalized).await?;
            log::info!(
                "[INGEST] Entry {entry_id}: {} chars of OCR text stored",
                stored.len()
            );
            (normalized, notices)
        }
        None => {
            log::info!("[INGEST] Entry {entry_id}: PDF stored, no recognition");
            (String::new(), Vec::new())
        }
    };

    Ok(IngestOutcome {
        entry_id,
        photo,
        text,
        notices,
    })
}

/// Ingest a freshly captured camera frame for `date`. The capture device is
/// released as soon as the frame is encoded, before any network call.
pub async fn ingest_camera_frame(
    camera: &dyn FrameSource,
    photos: &dyn PhotoStorage,
    store: &dyn EntryStore,
    recognizer: &dyn TextRecognizer,
    auth: &AuthContext,
    date: NaiveDate,
) -> Result<IngestOutcome, IngestError> {
    let jpeg = capture_jpeg(camera)?;
    let file_name = format!("foto_{}.jpg", chrono::Utc::now().timestamp_millis());
    ingest_file(photos, store, recognizer, auth, date, &file_name, jpeg, "image/jpeg").await
}
