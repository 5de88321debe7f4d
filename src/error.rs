//! Unified client error handling
//!
//! Every failure the intake flow, the weather cache, location resolution and
//! the session layer can surface. None of them is fatal: callers recover by
//! returning to a well-defined prior state and showing `user_message()`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WardrobeError {
    #[error("No garment detected in the photo")]
    NoSubjectDetected,

    #[error("Segmentation failed: {0}")]
    SegmentationFailed(String),

    #[error("Attribute analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Saving the garment failed: {0}")]
    PersistFailed(String),

    #[error("Location could not be resolved")]
    LocationUnresolved,

    #[error("Weather fetch failed: {0}")]
    WeatherFetchFailed(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Operation `{operation}` is not valid in state {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Response discarded: the intake session was reset")]
    Superseded,

    #[error("Candidate `{0}` is not part of this intake session")]
    UnknownCandidate(String),

    #[error("Invalid draft: {0}")]
    InvalidDraft(String),

    #[error("Remote request failed: {0}")]
    Remote(String),

    #[error("Storage error")]
    Storage(#[from] anyhow::Error),
}

impl WardrobeError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoSubjectDetected => "NO_SUBJECT_DETECTED",
            Self::SegmentationFailed(_) => "SEGMENTATION_FAILED",
            Self::AnalysisFailed(_) => "ANALYSIS_FAILED",
            Self::PersistFailed(_) => "PERSIST_FAILED",
            Self::LocationUnresolved => "LOCATION_UNRESOLVED",
            Self::WeatherFetchFailed(_) => "WEATHER_FETCH_FAILED",
            Self::AuthFailed(_) => "AUTH_FAILED",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::Superseded => "SUPERSEDED",
            Self::UnknownCandidate(_) => "UNKNOWN_CANDIDATE",
            Self::InvalidDraft(_) => "INVALID_DRAFT",
            Self::Remote(_) => "REMOTE_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::NoSubjectDetected => {
                "No garment could be found in this photo. Please upload another one.".to_string()
            }
            Self::SegmentationFailed(_) => {
                "The photo could not be processed. Please upload it again.".to_string()
            }
            Self::AnalysisFailed(_) => {
                "This piece could not be analyzed. Try another candidate.".to_string()
            }
            Self::PersistFailed(_) => {
                "Saving failed. Your edits are kept, please try again.".to_string()
            }
            Self::LocationUnresolved => {
                "Your location could not be determined. Please enter a city name.".to_string()
            }
            Self::WeatherFetchFailed(_) => "Weather is currently unavailable.".to_string(),
            Self::AuthFailed(msg) => msg.clone(),
            Self::InvalidDraft(msg) => msg.clone(),
            // Don't leak internal details
            Self::InvalidState { .. }
            | Self::Superseded
            | Self::UnknownCandidate(_)
            | Self::Remote(_)
            | Self::Storage(_) => {
                "Something went wrong, please try again.".to_string()
            }
        }
    }
}

pub type WardrobeResult<T> = Result<T, WardrobeError>;
