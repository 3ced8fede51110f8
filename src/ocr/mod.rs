//! OCR domain — text recognition over scanned journal pages.
//!
//! Wraps the Tesseract engine behind the `TextRecognizer` seam so the editor
//! pipeline can be driven with a stub in tests. External code should only use
//! the public items exported here.

pub mod dates;
pub mod normalize;

use async_trait::async_trait;
use thiserror::Error;

/// Confidence below this is worth a warning to the user. Advisory only —
/// the result is still returned and usable.
pub const LOW_CONFIDENCE_THRESHOLD: f32 = 60.0;

/// Languages the recognition engine is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrLanguage {
    Spanish,
    English,
}

impl OcrLanguage {
    /// Tesseract traineddata code.
    pub fn code(self) -> &'static str {
        match self {
            OcrLanguage::Spanish => "spa",
            OcrLanguage::English => "eng",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "spa" => Some(OcrLanguage::Spanish),
            "eng" => Some(OcrLanguage::English),
            _ => None,
        }
    }
}

/// What the engine produced for one image. Created once per submission,
/// consumed by normalization; not persisted verbatim.
#[derive(Debug, Clone)]
pub struct RecognitionResult {
    /// Raw text exactly as recognized; may be empty.
    pub text: String,
    /// Mean recognition confidence in [0, 100].
    pub confidence: f32,
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("recognition engine failed to initialize: {0}")]
    EngineInit(String),
    #[error("image is not readable: {0}")]
    UnreadableImage(String),
    #[error("text recognition failed: {0}")]
    Recognition(String),
    #[error("recognition task was interrupted")]
    Interrupted,
}

/// Boundary for the external recognition engine. Extraction suspends the
/// caller until the engine completes; no automatic retry on failure.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn extract(&self, image: &[u8]) -> Result<RecognitionResult, ExtractionError>;
}

/// Tesseract-backed recognizer. Recognition is CPU-bound and can take
/// seconds on a full page, so it runs on the blocking pool.
pub struct TesseractRecognizer {
    languages: Vec<OcrLanguage>,
}

impl TesseractRecognizer {
    pub fn new(languages: Vec<OcrLanguage>) -> Self {
        Self { languages }
    }

    /// Joined language string for Tesseract, e.g. "spa+eng".
    fn lang_spec(&self) -> String {
        self.languages
            .iter()
            .map(|l| l.code())
            .collect::<Vec<_>>()
            .join("+")
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new(vec![OcrLanguage::Spanish, OcrLanguage::English])
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn extract(&self, image: &[u8]) -> Result<RecognitionResult, ExtractionError> {
        // Decode first so an unreadable image fails before the engine spins up.
        image::load_from_memory(image)
            .map_err(|e| ExtractionError::UnreadableImage(e.to_string()))?;

        let lang = self.lang_spec();
        let bytes = image.to_vec();
        let start = std::time::Instant::now();

        let result = tokio::task::spawn_blocking(move || recognize_blocking(&lang, &bytes))
            .await
            .map_err(|_| ExtractionError::Interrupted)??;

        log::info!(
            "[OCR] Extracted {} chars in {}ms, confidence={:.1}",
            result.text.len(),
            start.elapsed().as_millis(),
            result.confidence
        );
        Ok(result)
    }
}

fn recognize_blocking(lang: &str, image: &[u8]) -> Result<RecognitionResult, ExtractionError> {
    let mut engine = leptess::LepTess::new(None, lang)
        .map_err(|e| ExtractionError::EngineInit(format!("{e} (is Tesseract installed?)")))?;

    engine
        .set_image_from_mem(image)
        .map_err(|e| ExtractionError::UnreadableImage(e.to_string()))?;

    // Tesseract assumes 300 DPI; must be set after the image.
    engine.set_source_resolution(300);

    let text = engine
        .get_utf8_text()
        .map_err(|e| ExtractionError::Recognition(e.to_string()))?;
    let confidence = engine.mean_text_conf().clamp(0, 100) as f32;

    Ok(RecognitionResult { text, confidence })
}
