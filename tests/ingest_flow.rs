//! End-to-end ingest tests over stubbed storage, persistence, recognition
//! and capture seams.

use async_trait::async_trait;
use chrono::NaiveDate;
use diario_scan::capture::{CaptureError, FrameLease, FrameSource};
use diario_scan::editor::Notice;
use diario_scan::entries::{
    AuthContext, EntrySource, EntryStore, EntryText, ImprovementStatus, StoreError,
};
use diario_scan::ocr::{ExtractionError, RecognitionResult, TextRecognizer};
use diario_scan::pipeline::{ingest_camera_frame, ingest_file};
use diario_scan::storage::{PhotoStorage, StoredPhoto};
use image::DynamicImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

fn auth() -> AuthContext {
    AuthContext {
        user_id: Uuid::new_v4(),
        access_token: "token".to_string(),
    }
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, 14).unwrap()
}

#[derive(Default)]
struct StubPhotos {
    uploads: Mutex<Vec<(String, String, usize)>>,
}

#[async_trait]
impl PhotoStorage for StubPhotos {
    async fn upload(
        &self,
        _auth: &AuthContext,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredPhoto, StoreError> {
        self.uploads.lock().unwrap().push((
            path.to_string(),
            content_type.to_string(),
            bytes.len(),
        ));
        Ok(StoredPhoto {
            path: path.to_string(),
            public_url: format!("https://backend.example.com/{path}"),
        })
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://backend.example.com/{path}")
    }
}

struct RecordingStore {
    entry_id: Uuid,
    created: Mutex<Vec<(NaiveDate, EntrySource)>>,
    appended: Mutex<Vec<(Uuid, String)>>,
}

impl RecordingStore {
    fn new() -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            created: Mutex::new(Vec::new()),
            appended: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl EntryStore for RecordingStore {
    async fn create_entry(
        &self,
        _auth: &AuthContext,
        date: NaiveDate,
        source: EntrySource,
    ) -> Result<Uuid, StoreError> {
        self.created.lock().unwrap().push((date, source));
        Ok(self.entry_id)
    }

    async fn save_ocr_text(
        &self,
        _auth: &AuthContext,
        _entry_id: Uuid,
        _text: &str,
        _status: ImprovementStatus,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    async fn save_improved_text(
        &self,
        _auth: &AuthContext,
        _entry_id: Uuid,
        _improved: &str,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    async fn append_ocr_text(
        &self,
        _auth: &AuthContext,
        entry_id: Uuid,
        text: &str,
    ) -> Result<String, StoreError> {
        self.appended
            .lock()
            .unwrap()
            .push((entry_id, text.to_string()));
        Ok(text.to_string())
    }

    async fn fetch_entry_text(
        &self,
        _auth: &AuthContext,
        _entry_id: Uuid,
    ) -> Result<EntryText, StoreError> {
        Err(StoreError::AccessDenied)
    }
}

struct StubRecognizer {
    text: &'static str,
    confidence: f32,
    calls: Mutex<usize>,
}

impl StubRecognizer {
    fn new(text: &'static str, confidence: f32) -> Self {
        Self {
            text,
            confidence,
            calls: Mutex::new(0),
        }
    }
}

#[async_trait]
impl TextRecognizer for StubRecognizer {
    async fn extract(&self, _image: &[u8]) -> Result<RecognitionResult, ExtractionError> {
        *self.calls.lock().unwrap() += 1;
        Ok(RecognitionResult {
            text: self.text.to_string(),
            confidence: self.confidence,
        })
    }
}

#[tokio::test]
async fn image_ingest_stores_photo_and_normalized_text() {
    let photos = StubPhotos::default();
    let store = RecordingStore::new();
    let recognizer = StubRecognizer::new("ho|a   mundo.", 88.0);

    let outcome = ingest_file(
        &photos,
        &store,
        &recognizer,
        &auth(),
        date(),
        "pagina.jpg",
        vec![1, 2, 3],
        "image/jpeg",
    )
    .await
    .unwrap();

    assert_eq!(outcome.entry_id, store.entry_id);
    assert_eq!(outcome.text, "hola mundo.");
    assert!(outcome.notices.is_empty());

    let uploads = photos.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].0.starts_with("2024/"));
    assert!(uploads[0].0.ends_with("_pagina.jpg"));
    assert_eq!(uploads[0].1, "image/jpeg");
    assert_eq!(outcome.photo.path, uploads[0].0);

    assert_eq!(
        store.created.lock().unwrap().as_slice(),
        &[(date(), EntrySource::Foto)]
    );
    let appended = store.appended.lock().unwrap();
    assert_eq!(appended.as_slice(), &[(store.entry_id, "hola mundo.".to_string())]);
}

#[tokio::test]
async fn low_confidence_and_dates_produce_notices() {
    let photos = StubPhotos::default();
    let store = RecordingStore::new();
    let recognizer = StubRecognizer::new("Hoy es 12/03/2024 y ayer 11/03/2024.", 41.5);

    let outcome = ingest_file(
        &photos,
        &store,
        &recognizer,
        &auth(),
        date(),
        "pagina.jpg",
        vec![0; 16],
        "image/jpeg",
    )
    .await
    .unwrap();

    assert_eq!(
        outcome.notices,
        vec![
            Notice::LowConfidence { confidence: 41.5 },
            Notice::DatesDetected { count: 2 },
        ]
    );
}

#[tokio::test]
async fn pdf_ingest_skips_recognition() {
    let photos = StubPhotos::default();
    let store = RecordingStore::new();
    let recognizer = StubRecognizer::new("should never run", 90.0);

    let outcome = ingest_file(
        &photos,
        &store,
        &recognizer,
        &auth(),
        date(),
        "diario.pdf",
        vec![0; 32],
        "application/pdf",
    )
    .await
    .unwrap();

    assert_eq!(outcome.text, "");
    assert!(outcome.notices.is_empty());
    assert_eq!(*recognizer.calls.lock().unwrap(), 0);
    assert!(store.appended.lock().unwrap().is_empty());
    assert_eq!(
        store.created.lock().unwrap().as_slice(),
        &[(date(), EntrySource::Pdf)]
    );
    assert_eq!(photos.uploads.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn store_failure_surfaces_after_upload() {
    struct FailingStore;

    #[async_trait]
    impl EntryStore for FailingStore {
        async fn create_entry(
            &self,
            _auth: &AuthContext,
            _date: NaiveDate,
            _source: EntrySource,
        ) -> Result<Uuid, StoreError> {
            Err(StoreError::Unauthorized)
        }

        async fn save_ocr_text(
            &self,
            _auth: &AuthContext,
            _entry_id: Uuid,
            _text: &str,
            _status: ImprovementStatus,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        async fn save_improved_text(
            &self,
            _auth: &AuthContext,
            _entry_id: Uuid,
            _improved: &str,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        async fn append_ocr_text(
            &self,
            _auth: &AuthContext,
            _entry_id: Uuid,
            _text: &str,
        ) -> Result<String, StoreError> {
            Ok(String::new())
        }

        async fn fetch_entry_text(
            &self,
            _auth: &AuthContext,
            _entry_id: Uuid,
        ) -> Result<EntryText, StoreError> {
            Err(StoreError::AccessDenied)
        }
    }

    let photos = StubPhotos::default();
    let recognizer = StubRecognizer::new("texto", 90.0);

    let err = ingest_file(
        &photos,
        &FailingStore,
        &recognizer,
        &auth(),
        date(),
        "pagina.jpg",
        vec![1],
        "image/jpeg",
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("not authenticated"));
    // The photo was already uploaded before the entry write failed.
    assert_eq!(photos.uploads.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn camera_ingest_releases_device_and_stores_jpeg() {
    struct TestCamera {
        released: Arc<AtomicBool>,
    }

    impl FrameSource for TestCamera {
        fn acquire(&self) -> Result<FrameLease, CaptureError> {
            let released = self.released.clone();
            Ok(FrameLease::new(DynamicImage::new_rgb8(8, 8), move || {
                released.store(true, Ordering::SeqCst);
            }))
        }
    }

    let released = Arc::new(AtomicBool::new(false));
    let camera = TestCamera {
        released: released.clone(),
    };
    let photos = StubPhotos::default();
    let store = RecordingStore::new();
    let recognizer = StubRecognizer::new("pagina capturada.", 75.0);

    let outcome = ingest_camera_frame(&camera, &photos, &store, &recognizer, &auth(), date())
        .await
        .unwrap();

    assert!(released.load(Ordering::SeqCst));
    assert_eq!(outcome.text, "pagina capturada.");

    let uploads = photos.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].0.contains("_foto_"));
    assert!(uploads[0].0.ends_with(".jpg"));
    assert_eq!(uploads[0].1, "image/jpeg");
    assert!(uploads[0].2 > 0);
}
