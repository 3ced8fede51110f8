//! Editor session controller — review and edit one entry's extracted text.
//!
//! Orchestrates extraction, normalization, AI improvement and the final save
//! around a single-use session: `Closed → Extracting → Open → (Improving |
//! Saving) → ...`, back to `Closed` on save-success or close. While a
//! suspending operation is outstanding the controller gates every other
//! transition, and a generation counter makes sure a result that lands after
//! the session was closed is discarded instead of mutating a newer session.
//!
//! Operations return structured outcomes (values plus advisory `Notice`s);
//! surfacing them to the user is the presentation layer's job.

use crate::entries::{AuthContext, EntryStore, ImprovementStatus, StoreError};
use crate::llm::{ImproveError, TextImprover};
use crate::ocr::{
    dates::find_dates, normalize::normalize, ExtractionError, TextRecognizer,
    LOW_CONFIDENCE_THRESHOLD,
};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use uuid::Uuid;

/// Advisory side observations. Never errors, never blocking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Notice {
    /// Recognition confidence under the warning threshold — the text is
    /// usable but may contain errors.
    LowConfidence { confidence: f32 },
    /// Date-like substrings were spotted in the normalized text.
    DatesDetected { count: usize },
}

/// Transient editing state for one entry's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub raw_text: String,
    pub normalized_text: String,
    /// Starts equal to `normalized_text` (or an accepted improvement) and
    /// diverges only through explicit user edits.
    pub edited_text: String,
    /// Improvement returned by the AI, held until the user accepts or
    /// discards it. Never applied automatically.
    pub proposed_improvement: Option<String>,
    pub entry_id: Option<Uuid>,
}

impl Session {
    fn from_text(raw: String, normalized: String, entry_id: Option<Uuid>) -> Self {
        Self {
            raw_text: raw,
            edited_text: normalized.clone(),
            normalized_text: normalized,
            proposed_improvement: None,
            entry_id,
        }
    }
}

/// Where the controller currently is, for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorPhase {
    Closed,
    Extracting,
    Open,
    Improving,
    Saving,
}

enum Phase {
    Closed,
    Extracting,
    Open(Session),
    Improving(Session),
    Saving(Session),
}

impl Phase {
    fn name(&self) -> EditorPhase {
        match self {
            Phase::Closed => EditorPhase::Closed,
            Phase::Extracting => EditorPhase::Extracting,
            Phase::Open(_) => EditorPhase::Open,
            Phase::Improving(_) => EditorPhase::Improving,
            Phase::Saving(_) => EditorPhase::Saving,
        }
    }
}

struct Inner {
    phase: Phase,
    /// Bumped on every close/reset; a suspended operation that resumes with
    /// a stale generation discards its result.
    generation: u64,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("another operation is in progress: {0}")]
    Busy(&'static str),
    #[error("no editor session is open")]
    NotOpen,
    #[error("cannot save without an entry id")]
    MissingEntryId,
    #[error("no proposed improvement to accept")]
    NoProposedImprovement,
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Improvement(#[from] ImproveError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of an extraction request.
#[derive(Debug)]
pub enum ExtractionOutcome {
    /// The session opened with the extracted text.
    Opened {
        session: Session,
        notices: Vec<Notice>,
    },
    /// The session was closed while extraction was in flight; the late
    /// result was dropped without touching anything.
    Discarded,
}

/// Result of an improvement request.
#[derive(Debug)]
pub enum ImprovementOutcome {
    /// An improved version is proposed; it is applied only by
    /// `accept_improvement`.
    Proposed(String),
    Discarded,
}

/// Result of a save.
#[derive(Debug)]
pub enum SaveOutcome {
    Saved { entry_id: Uuid },
    Discarded,
}

pub struct EditorController {
    recognizer: Arc<dyn TextRecognizer>,
    improver: Arc<dyn TextImprover>,
    store: Arc<dyn EntryStore>,
    inner: Mutex<Inner>,
}

impl EditorController {
    pub fn new(
        recognizer: Arc<dyn TextRecognizer>,
        improver: Arc<dyn TextImprover>,
        store: Arc<dyn EntryStore>,
    ) -> Self {
        Self {
            recognizer,
            improver,
            store,
            inner: Mutex::new(Inner {
                phase: Phase::Closed,
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The lock is only held between awaits; a panicked holder leaves
        // plain data we can still read.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> EditorPhase {
        self.lock().phase.name()
    }

    /// Session fields as the presentation layer should show them. `None`
    /// when closed or still extracting.
    pub fn session(&self) -> Option<Session> {
        match &self.lock().phase {
            Phase::Open(s) | Phase::Improving(s) | Phase::Saving(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Run OCR over `image` and open the session with the normalized text.
    /// On engine failure the controller returns to `Closed` and the error is
    /// surfaced; nothing is persisted either way.
    pub async fn start_extraction(
        &self,
        image: &[u8],
        entry_id: Option<Uuid>,
    ) -> Result<ExtractionOutcome, SessionError> {
        let generation = {
            let mut inner = self.lock();
            match inner.phase {
                Phase::Closed => {}
                Phase::Extracting => return Err(SessionError::Busy("extraction")),
                Phase::Improving(_) => return Err(SessionError::Busy("improvement")),
                Phase::Saving(_) => return Err(SessionError::Busy("save")),
                Phase::Open(_) => return Err(SessionError::Busy("open session")),
            }
            inner.phase = Phase::Extracting;
            inner.generation
        };

        let result = self.recognizer.extract(image).await;

        let mut inner = self.lock();
        if inner.generation != generation || !matches!(inner.phase, Phase::Extracting) {
            log::info!("[EDITOR] Dropping stale extraction result");
            return Ok(ExtractionOutcome::Discarded);
        }

        let recognition = match result {
            Ok(r) => r,
            Err(e) => {
                inner.phase = Phase::Closed;
                return Err(e.into());
            }
        };

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

        let session = Session::from_text(recognition.text, normalized, entry_id);
        inner.phase = Phase::Open(session.clone());
        Ok(ExtractionOutcome::Opened { session, notices })
    }

    /// Open directly with literal text (manual entry), skipping extraction.
    /// Raw, normalized and edited text all start as the given input.
    pub fn open_with_text(
        &self,
        text: &str,
        entry_id: Option<Uuid>,
    ) -> Result<Session, SessionError> {
        let mut inner = self.lock();
        match inner.phase {
            Phase::Closed => {}
            Phase::Extracting => return Err(SessionError::Busy("extraction")),
            Phase::Improving(_) => return Err(SessionError::Busy("improvement")),
            Phase::Saving(_) => return Err(SessionError::Busy("save")),
            Phase::Open(_) => return Err(SessionError::Busy("open session")),
        }
        let session = Session {
            raw_text: text.to_string(),
            normalized_text: text.to_string(),
            edited_text: text.to_string(),
            proposed_improvement: None,
            entry_id,
        };
        inner.phase = Phase::Open(session.clone());
        Ok(session)
    }

    /// Replace the edited text. The user owns this field; no other session
    /// field changes.
    pub fn edit(&self, text: &str) -> Result<(), SessionError> {
        let mut inner = self.lock();
        match &mut inner.phase {
            Phase::Open(session) => {
                session.edited_text = text.to_string();
                Ok(())
            }
            Phase::Closed | Phase::Extracting => Err(SessionError::NotOpen),
            Phase::Improving(_) => Err(SessionError::Busy("improvement")),
            Phase::Saving(_) => Err(SessionError::Busy("save")),
        }
    }

    /// Attach the owning entry to the session (e.g. after creating one).
    pub fn assign_entry(&self, entry_id: Uuid) -> Result<(), SessionError> {
        let mut inner = self.lock();
        match &mut inner.phase {
            Phase::Open(session) => {
                session.entry_id = Some(entry_id);
                Ok(())
            }
            _ => Err(SessionError::NotOpen),
        }
    }

    /// Send the edited text to the improvement service. On success the
    /// result is held as a proposal; on failure the session is exactly as it
    /// was, the previously displayed text untouched.
    pub async fn request_improvement(
        &self,
        auth: &AuthContext,
    ) -> Result<ImprovementOutcome, SessionError> {
        let (generation, text) = {
            let mut inner = self.lock();
            let generation = inner.generation;
            match std::mem::replace(&mut inner.phase, Phase::Closed) {
                Phase::Open(session) => {
                    let text = session.edited_text.clone();
                    inner.phase = Phase::Improving(session);
                    (generation, text)
                }
                other => {
                    let err = match &other {
                        Phase::Extracting => SessionError::Busy("extraction"),
                        Phase::Improving(_) => SessionError::Busy("improvement"),
                        Phase::Saving(_) => SessionError::Busy("save"),
                        _ => SessionError::NotOpen,
                    };
                    inner.phase = other;
                    return Err(err);
                }
            }
        };

        let result = self.improver.improve(&text, auth).await;

        let mut inner = self.lock();
        if inner.generation != generation || !matches!(inner.phase, Phase::Improving(_)) {
            log::info!("[EDITOR] Dropping stale improvement result");
            return Ok(ImprovementOutcome::Discarded);
        }
        let Phase::Improving(mut session) = std::mem::replace(&mut inner.phase, Phase::Closed)
        else {
            unreachable!("phase checked above");
        };

        match result {
            Ok(improved) => {
                session.proposed_improvement = Some(improved.clone());
                inner.phase = Phase::Open(session);
                Ok(ImprovementOutcome::Proposed(improved))
            }
            Err(e) => {
                inner.phase = Phase::Open(session);
                Err(e.into())
            }
        }
    }

    /// Copy the proposed improvement into the edited text.
    pub fn accept_improvement(&self) -> Result<(), SessionError> {
        let mut inner = self.lock();
        match &mut inner.phase {
            Phase::Open(session) => match session.proposed_improvement.take() {
                Some(improved) => {
                    session.edited_text = improved;
                    Ok(())
                }
                None => Err(SessionError::NoProposedImprovement),
            },
            _ => Err(SessionError::NotOpen),
        }
    }

    /// Drop the proposed improvement, keeping the edited text as is.
    pub fn discard_improvement(&self) -> Result<(), SessionError> {
        let mut inner = self.lock();
        match &mut inner.phase {
            Phase::Open(session) => {
                session.proposed_improvement = None;
                Ok(())
            }
            _ => Err(SessionError::NotOpen),
        }
    }

    /// Persist the edited text as a direct user save (`manual_edited`) and
    /// close the session. On failure the session stays `Open` with every
    /// field intact so nothing the user typed is lost.
    ///
    /// Saving without an entry id is a programming error in the calling
    /// flow; it fails before any persistence call is made.
    pub async fn save(&self, auth: &AuthContext) -> Result<SaveOutcome, SessionError> {
        let (generation, entry_id, text) = {
            let mut inner = self.lock();
            let generation = inner.generation;
            match std::mem::replace(&mut inner.phase, Phase::Closed) {
                Phase::Open(session) => {
                    let Some(entry_id) = session.entry_id else {
                        inner.phase = Phase::Open(session);
                        return Err(SessionError::MissingEntryId);
                    };
                    let text = session.edited_text.clone();
                    inner.phase = Phase::Saving(session);
                    (generation, entry_id, text)
                }
                other => {
                    let err = match &other {
                        Phase::Extracting => SessionError::Busy("extraction"),
                        Phase::Improving(_) => SessionError::Busy("improvement"),
                        Phase::Saving(_) => SessionError::Busy("save"),
                        _ => SessionError::NotOpen,
                    };
                    inner.phase = other;
                    return Err(err);
                }
            }
        };

        let result = self
            .store
            .save_ocr_text(auth, entry_id, &text, ImprovementStatus::ManualEdited)
            .await;

        let mut inner = self.lock();
        if inner.generation != generation || !matches!(inner.phase, Phase::Saving(_)) {
            log::info!("[EDITOR] Dropping stale save result");
            return Ok(SaveOutcome::Discarded);
        }
        let Phase::Saving(session) = std::mem::replace(&mut inner.phase, Phase::Closed) else {
            unreachable!("phase checked above");
        };

        match result {
            Ok(()) => {
                // Session is single-use: save-success is terminal.
                inner.generation += 1;
                log::info!("[EDITOR] Saved entry {entry_id}, session closed");
                Ok(SaveOutcome::Saved { entry_id })
            }
            Err(e) => {
                inner.phase = Phase::Open(session);
                Err(e.into())
            }
        }
    }

    /// Close the session from any state, discarding all fields. An external
    /// call still in flight is not cancelled; its late result will be
    /// discarded when it lands.
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.phase = Phase::Closed;
        inner.generation += 1;
    }
}
