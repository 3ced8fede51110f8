//! Diario Scan — journal digitization pipeline.
//!
//! Users photograph or upload handwritten diary pages; this crate extracts
//! the text (OCR), cleans it up, optionally improves it with an AI rewrite,
//! and saves it to the user's journal. The graphical presentation layer and
//! the managed backend are external collaborators — this crate is the
//! pipeline between them.
//!
//! Domains:
//!   - capture/   — one-frame acquisition from a capture device
//!   - ocr/       — Tesseract recognition, text normalization, date detection
//!   - llm/       — AI text improvement (client + service-side model call)
//!   - entries/   — entry record persistence gateway
//!   - storage/   — page images in the object store
//!   - editor/    — session state machine around review/edit/save
//!   - pipeline   — multi-step ingest orchestration
//!   - service/   — the improve-text HTTP endpoint

pub mod capture;
pub mod config;
pub mod editor;
pub mod entries;
pub mod llm;
pub mod ocr;
pub mod pipeline;
pub mod service;
pub mod storage;

pub use editor::{EditorController, EditorPhase, Notice, Session};
pub use entries::{AuthContext, EntryGateway, ImprovementStatus};
pub use llm::ImprovementClient;
pub use ocr::{RecognitionResult, TesseractRecognizer};
