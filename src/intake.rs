//! Garment intake pipeline.
//!
//! Drives a photo through segmentation, candidate selection, attribute
//! extraction, user review and persistence:
//!
//! ```text
//! Idle -> Segmenting -> PartSelection -> Analyzing -> Review -> Submitting
//!   ^          |              ^    ^          |          ^          |
//!   +----------+ (failure)    |    +----------+ (failure) +----------+ (failure)
//!                             +----------------------------------------+ (success)
//! ```
//!
//! Every operation checks the current state and is rejected with
//! [`WardrobeError::InvalidState`] when it does not apply. Remote calls run
//! without holding the state lock; when a response arrives after `reset()`
//! (or after a new session started) it is discarded and the caller gets
//! [`WardrobeError::Superseded`].

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::garment::{DraftPatch, GarmentDraft, GarmentRecord};
use crate::domain::segment::{AnalysisResponse, SegmentCandidate, SourceImage};
use crate::error::{WardrobeError, WardrobeResult};
use crate::services::WardrobeApi;

/// Remote collaborators of the intake flow.
#[async_trait]
pub trait IntakeBackend: Send + Sync {
    async fn segment(
        &self,
        user_id: &str,
        image: &SourceImage,
    ) -> WardrobeResult<Vec<SegmentCandidate>>;

    async fn analyze(
        &self,
        candidate: &SegmentCandidate,
        user_id: &str,
    ) -> WardrobeResult<AnalysisResponse>;

    async fn persist(&self, draft: &GarmentDraft) -> WardrobeResult<GarmentRecord>;
}

#[async_trait]
impl IntakeBackend for WardrobeApi {
    async fn segment(
        &self,
        user_id: &str,
        image: &SourceImage,
    ) -> WardrobeResult<Vec<SegmentCandidate>> {
        WardrobeApi::segment(self, user_id, image).await
    }

    async fn analyze(
        &self,
        candidate: &SegmentCandidate,
        user_id: &str,
    ) -> WardrobeResult<AnalysisResponse> {
        self.analyze_selected(&candidate.image_path, user_id).await
    }

    async fn persist(&self, draft: &GarmentDraft) -> WardrobeResult<GarmentRecord> {
        self.create_item(draft).await
    }
}

/// State names, for guards and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeStage {
    Idle,
    Segmenting,
    PartSelection,
    Analyzing,
    Review,
    Submitting,
}

impl IntakeStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Segmenting => "Segmenting",
            Self::PartSelection => "PartSelection",
            Self::Analyzing => "Analyzing",
            Self::Review => "Review",
            Self::Submitting => "Submitting",
        }
    }
}

/// Data owned by one intake session (one source photo).
#[derive(Debug, Clone)]
struct Session {
    id: Uuid,
    image: Arc<SourceImage>,
    candidates: Vec<SegmentCandidate>,
}

#[derive(Debug)]
enum IntakeState {
    Idle,
    Segmenting(Session),
    PartSelection(Session),
    Analyzing {
        session: Session,
        candidate: SegmentCandidate,
    },
    Review {
        session: Session,
        draft: GarmentDraft,
    },
    Submitting {
        session: Session,
        draft: GarmentDraft,
    },
}

impl IntakeState {
    fn stage(&self) -> IntakeStage {
        match self {
            Self::Idle => IntakeStage::Idle,
            Self::Segmenting(_) => IntakeStage::Segmenting,
            Self::PartSelection(_) => IntakeStage::PartSelection,
            Self::Analyzing { .. } => IntakeStage::Analyzing,
            Self::Review { .. } => IntakeStage::Review,
            Self::Submitting { .. } => IntakeStage::Submitting,
        }
    }

    fn session(&self) -> Option<&Session> {
        match self {
            Self::Idle => None,
            Self::Segmenting(s) | Self::PartSelection(s) => Some(s),
            Self::Analyzing { session, .. }
            | Self::Review { session, .. }
            | Self::Submitting { session, .. } => Some(session),
        }
    }

    /// Whether this is `stage` of session `id`.
    fn is(&self, stage: IntakeStage, id: Uuid) -> bool {
        self.stage() == stage && self.session().map(|s| s.id) == Some(id)
    }
}

fn invalid(operation: &'static str, state: &IntakeState) -> WardrobeError {
    WardrobeError::InvalidState {
        operation,
        state: state.stage().as_str(),
    }
}

/// State machine for adding garments from a photo.
pub struct IntakePipeline {
    backend: Arc<dyn IntakeBackend>,
    user_id: String,
    state: Mutex<IntakeState>,
}

impl IntakePipeline {
    pub fn new(backend: Arc<dyn IntakeBackend>, user_id: impl Into<String>) -> Self {
        Self {
            backend,
            user_id: user_id.into(),
            state: Mutex::new(IntakeState::Idle),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn stage(&self) -> IntakeStage {
        self.state.lock().stage()
    }

    /// Whether a source photo is currently held.
    pub fn has_image(&self) -> bool {
        self.state.lock().session().is_some()
    }

    /// Candidates of the current session (empty while idle or segmenting).
    pub fn candidates(&self) -> Vec<SegmentCandidate> {
        self.state
            .lock()
            .session()
            .map(|s| s.candidates.clone())
            .unwrap_or_default()
    }

    /// Candidate whose attributes are being extracted.
    pub fn analyzing_candidate(&self) -> Option<SegmentCandidate> {
        match &*self.state.lock() {
            IntakeState::Analyzing { candidate, .. } => Some(candidate.clone()),
            _ => None,
        }
    }

    /// Draft under review, if any.
    ///
    /// Outside `Review` and `Submitting` there is no draft: after a
    /// successful submit the next [`select_candidate`](Self::select_candidate)
    /// starts again from [`GarmentDraft::empty`] for the pipeline's user.
    pub fn draft(&self) -> Option<GarmentDraft> {
        match &*self.state.lock() {
            IntakeState::Review { draft, .. } | IntakeState::Submitting { draft, .. } => {
                Some(draft.clone())
            }
            _ => None,
        }
    }

    /// Upload a photo and segment it into candidates.
    #[instrument(skip(self, image), fields(user_id = %self.user_id, session_id = tracing::field::Empty))]
    pub async fn begin_intake(&self, image: SourceImage) -> WardrobeResult<Vec<SegmentCandidate>> {
        let session = {
            let mut state = self.state.lock();
            if !matches!(*state, IntakeState::Idle) {
                return Err(invalid("begin_intake", &state));
            }
            let session = Session {
                id: Uuid::new_v4(),
                image: Arc::new(image),
                candidates: Vec::new(),
            };
            *state = IntakeState::Segmenting(session.clone());
            session
        };
        tracing::Span::current().record("session_id", tracing::field::display(session.id));
        debug!("Segmenting source photo");

        let result = self.backend.segment(&self.user_id, &session.image).await;

        let mut state = self.state.lock();
        if !state.is(IntakeStage::Segmenting, session.id) {
            warn!("Discarding segmentation response for a superseded session");
            return Err(WardrobeError::Superseded);
        }

        match result {
            Ok(candidates) if !candidates.is_empty() => {
                info!(count = candidates.len(), "Segmentation produced candidates");
                *state = IntakeState::PartSelection(Session {
                    candidates: candidates.clone(),
                    ..session
                });
                Ok(candidates)
            }
            Ok(_) => {
                warn!("Segmentation found no garment");
                *state = IntakeState::Idle;
                Err(WardrobeError::NoSubjectDetected)
            }
            Err(e) => {
                warn!(error = %e, "Segmentation failed");
                *state = IntakeState::Idle;
                Err(match e {
                    WardrobeError::SegmentationFailed(msg) => WardrobeError::SegmentationFailed(msg),
                    other => WardrobeError::SegmentationFailed(other.to_string()),
                })
            }
        }
    }

    /// Pick one candidate and extract its attributes into a fresh draft.
    #[instrument(skip(self, candidate), fields(user_id = %self.user_id, key = %candidate.category_key))]
    pub async fn select_candidate(&self, candidate: &SegmentCandidate) -> WardrobeResult<GarmentDraft> {
        let session = {
            let mut state = self.state.lock();
            let session = match &*state {
                IntakeState::PartSelection(session) => session.clone(),
                other => return Err(invalid("select_candidate", other)),
            };
            if !session.candidates.contains(candidate) {
                return Err(WardrobeError::UnknownCandidate(candidate.image_path.clone()));
            }
            *state = IntakeState::Analyzing {
                session: session.clone(),
                candidate: candidate.clone(),
            };
            session
        };
        debug!(session_id = %session.id, image_path = %candidate.image_path, "Analyzing candidate");

        let result = self.backend.analyze(candidate, &self.user_id).await;

        let mut state = self.state.lock();
        if !state.is(IntakeStage::Analyzing, session.id) {
            warn!("Discarding analysis response for a superseded session");
            return Err(WardrobeError::Superseded);
        }

        match result {
            Ok(analysis) => {
                let draft = GarmentDraft::from_analysis(&self.user_id, candidate, analysis);
                info!(category = %draft.category_main, "Draft ready for review");
                *state = IntakeState::Review {
                    session,
                    draft: draft.clone(),
                };
                Ok(draft)
            }
            Err(e) => {
                warn!(error = %e, "Analysis failed");
                *state = IntakeState::PartSelection(session);
                Err(match e {
                    WardrobeError::AnalysisFailed(msg) => WardrobeError::AnalysisFailed(msg),
                    other => WardrobeError::AnalysisFailed(other.to_string()),
                })
            }
        }
    }

    /// Merge user edits into the draft under review.
    pub fn update_draft(&self, patch: DraftPatch) -> WardrobeResult<GarmentDraft> {
        let mut state = self.state.lock();
        match &mut *state {
            IntakeState::Review { draft, .. } => {
                draft.apply(patch)?;
                Ok(draft.clone())
            }
            other => Err(invalid("update_draft", other)),
        }
    }

    /// Persist the draft. On success the pipeline returns to candidate
    /// selection so further garments can be taken from the same photo; the
    /// submitted draft is dropped and only the owning user id carries over.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn submit(&self) -> WardrobeResult<GarmentRecord> {
        let (session_id, payload) = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, IntakeState::Idle) {
                IntakeState::Review { session, draft } => {
                    let id = session.id;
                    let payload = draft.to_persist_payload();
                    *state = IntakeState::Submitting { session, draft };
                    (id, payload)
                }
                other => {
                    let err = invalid("submit", &other);
                    *state = other;
                    return Err(err);
                }
            }
        };

        let result = self.backend.persist(&payload).await;

        let mut state = self.state.lock();
        if !state.is(IntakeStage::Submitting, session_id) {
            warn!("Discarding persist response for a superseded session");
            return Err(WardrobeError::Superseded);
        }
        let (session, draft) = match std::mem::replace(&mut *state, IntakeState::Idle) {
            IntakeState::Submitting { session, draft } => (session, draft),
            // `is` above guarantees Submitting
            other => {
                *state = other;
                return Err(WardrobeError::Superseded);
            }
        };

        match result {
            Ok(record) => {
                info!(item_id = record.id(), "Garment saved");
                *state = IntakeState::PartSelection(session);
                Ok(record)
            }
            Err(e) => {
                warn!(error = %e, "Saving garment failed, edits kept");
                *state = IntakeState::Review { session, draft };
                Err(match e {
                    WardrobeError::PersistFailed(msg) => WardrobeError::PersistFailed(msg),
                    other => WardrobeError::PersistFailed(other.to_string()),
                })
            }
        }
    }

    /// Drop the photo, candidates and draft, whatever the current state.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        let previous = state.stage();
        *state = IntakeState::Idle;
        debug!(from = previous.as_str(), "Intake reset");
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::VecDeque;
    use tokio::sync::Notify;

    use crate::domain::garment::fixtures;

    /// Scripted backend: each call pops the next queued reply.
    #[derive(Default)]
    pub struct MockBackend {
        pub segments: Mutex<VecDeque<WardrobeResult<Vec<SegmentCandidate>>>>,
        pub analyses: Mutex<VecDeque<WardrobeResult<AnalysisResponse>>>,
        pub persist_failures: Mutex<VecDeque<WardrobeError>>,
        pub persisted: Mutex<Vec<GarmentRecord>>,
        /// When set, segmentation waits for a notification before replying.
        pub gate: Option<Arc<Notify>>,
        /// When set, analysis waits for a notification before replying.
        pub analysis_gate: Option<Arc<Notify>>,
    }

    impl MockBackend {
        pub fn with_segments(self, reply: WardrobeResult<Vec<SegmentCandidate>>) -> Self {
            self.segments.lock().push_back(reply);
            self
        }

        pub fn with_analysis(self, reply: WardrobeResult<AnalysisResponse>) -> Self {
            self.analyses.lock().push_back(reply);
            self
        }

        pub fn failing_persist(self, error: WardrobeError) -> Self {
            self.persist_failures.lock().push_back(error);
            self
        }
    }

    #[async_trait]
    impl IntakeBackend for MockBackend {
        async fn segment(
            &self,
            _user_id: &str,
            _image: &SourceImage,
        ) -> WardrobeResult<Vec<SegmentCandidate>> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.segments
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn analyze(
            &self,
            _candidate: &SegmentCandidate,
            _user_id: &str,
        ) -> WardrobeResult<AnalysisResponse> {
            if let Some(gate) = &self.analysis_gate {
                gate.notified().await;
            }
            self.analyses.lock().pop_front().unwrap_or_else(|| {
                Err(WardrobeError::AnalysisFailed("no scripted reply".to_string()))
            })
        }

        async fn persist(&self, draft: &GarmentDraft) -> WardrobeResult<GarmentRecord> {
            if let Some(err) = self.persist_failures.lock().pop_front() {
                return Err(err);
            }
            let mut persisted = self.persisted.lock();
            let record = fixtures::record(persisted.len() as i64 + 1, draft.clone());
            persisted.push(record.clone());
            Ok(record)
        }
    }

    pub fn candidate(key: &str) -> SegmentCandidate {
        SegmentCandidate {
            category_key: key.to_string(),
            label: key.to_string(),
            image_path: format!("uploads/u1/{key}.png"),
        }
    }

    pub fn photo() -> SourceImage {
        SourceImage::new("outfit.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF])
    }

    pub fn analysis(attributes: serde_json::Value) -> AnalysisResponse {
        serde_json::from_value(serde_json::json!({
            "attributes": attributes,
            "selected_image": "uploads/u1/selected.png",
            "embedding_vector": [0.5, 0.25]
        }))
        .expect("valid analysis fixture")
    }
}
