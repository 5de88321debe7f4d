//! Segmentation and attribute-extraction wire types.

use serde::{Deserialize, Serialize};

use super::serde_helpers::{lenient_number, vec_or_default};
use crate::error::{WardrobeError, WardrobeResult};

/// Raw photo handed to the intake flow.
#[derive(Clone)]
pub struct SourceImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl SourceImage {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

impl std::fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceImage")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// One subject crop cut out of the source photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentCandidate {
    pub category_key: String,
    pub label: String,
    pub image_path: String,
}

/// `/segment` response body. A service-side failure arrives as a
/// successful response carrying only `error`.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentResponse {
    #[serde(default, deserialize_with = "vec_or_default")]
    pub parts: Vec<SegmentCandidate>,
    pub error: Option<String>,
}

impl SegmentResponse {
    /// Candidates, or `SegmentationFailed` when the service reported an error.
    pub fn into_parts(self) -> WardrobeResult<Vec<SegmentCandidate>> {
        match self.error {
            Some(error) => Err(WardrobeError::SegmentationFailed(error)),
            None => Ok(self.parts),
        }
    }
}

/// Attributes returned by the analysis service. Every field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractedAttributes {
    pub category_main: Option<String>,
    pub category_sub: Option<String>,
    pub default_layer: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub warmth_level: Option<f64>,
    pub materials: Option<Vec<String>>,
    pub is_windproof: Option<bool>,
    pub waterproof_level: Option<String>,
    pub breathability: Option<String>,
    pub collar_type: Option<String>,
    pub length_type: Option<String>,
    pub color_pattern: Option<String>,
    pub main_color: Option<String>,
    pub seasons: Option<Vec<String>>,
    pub fit: Option<String>,
    pub styles: Option<Vec<String>>,
    pub occasions: Option<Vec<String>>,
    pub gender: Option<String>,
}

/// `/analyze-selected` response body
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisResponse {
    #[serde(default)]
    pub attributes: ExtractedAttributes,
    pub selected_image: Option<String>,
    pub embedding_vector: Option<Vec<f32>>,
}
