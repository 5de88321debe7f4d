//! Garment draft and persisted record types.
//!
//! A [`GarmentDraft`] is the editable record built during intake review. It
//! keeps `category_sub` inside the value set of `category_main` at all times:
//! patches that change the main category reset the sub-category, and a
//! sub-category that does not belong is rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use super::catalog::{self, GENDER_UNISEX, STATUS_NORMAL, STATUS_NOT_OWNED};
use super::segment::{AnalysisResponse, SegmentCandidate};
use super::serde_helpers::{flexible_timestamp, string_or, vec_or_default};
use crate::error::{WardrobeError, WardrobeResult};

/// Image path sent when the draft has none.
pub const PLACEHOLDER_IMAGE: &str = "uploads/default.png";

pub const DEFAULT_BREATHABILITY: &str = "medium";
pub const DEFAULT_COLOR_PATTERN: &str = "solid";

// Stored rows may carry null for these columns
fn breathability_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    string_or(d, DEFAULT_BREATHABILITY)
}

fn color_pattern_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    string_or(d, DEFAULT_COLOR_PATTERN)
}

fn gender_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    string_or(d, GENDER_UNISEX)
}

fn default_breathability() -> String {
    DEFAULT_BREATHABILITY.to_string()
}

fn default_color_pattern() -> String {
    DEFAULT_COLOR_PATTERN.to_string()
}

fn default_gender() -> String {
    GENDER_UNISEX.to_string()
}

/// Editable garment record (`POST /items/` body).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GarmentDraft {
    pub user_id: String,

    // Category
    pub category_main: String,
    pub category_sub: String,
    #[serde(default)]
    pub default_layer: Option<String>,

    // Physical attributes
    pub warmth_level: u8,
    pub is_windproof: bool,
    pub waterproof_level: String,
    #[serde(
        default = "default_breathability",
        deserialize_with = "breathability_or_default"
    )]
    pub breathability: String,
    pub fit: String,
    #[serde(default)]
    pub collar_type: Option<String>,
    #[serde(default)]
    pub length_type: Option<String>,

    // Appearance
    #[serde(
        default = "default_color_pattern",
        deserialize_with = "color_pattern_or_default"
    )]
    pub color_pattern: String,
    pub main_color: String,
    pub status: String,

    // Tag sets
    #[serde(default, deserialize_with = "vec_or_default")]
    pub materials: Vec<String>,
    #[serde(default, deserialize_with = "vec_or_default")]
    pub seasons: Vec<String>,
    #[serde(default, deserialize_with = "vec_or_default")]
    pub styles: Vec<String>,
    #[serde(default, deserialize_with = "vec_or_default")]
    pub occasions: Vec<String>,

    #[serde(default = "default_gender", deserialize_with = "gender_or_default")]
    pub gender: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_vector: Option<Vec<f32>>,
}

impl GarmentDraft {
    /// Empty template owned by `user_id`.
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            category_main: String::new(),
            category_sub: String::new(),
            default_layer: None,
            warmth_level: 3,
            is_windproof: false,
            waterproof_level: "none".to_string(),
            breathability: DEFAULT_BREATHABILITY.to_string(),
            fit: "regular".to_string(),
            collar_type: None,
            length_type: None,
            color_pattern: DEFAULT_COLOR_PATTERN.to_string(),
            main_color: String::new(),
            status: STATUS_NORMAL.to_string(),
            materials: Vec::new(),
            seasons: Vec::new(),
            styles: Vec::new(),
            occasions: Vec::new(),
            gender: GENDER_UNISEX.to_string(),
            image_url: None,
            embedding_vector: None,
        }
    }

    /// Fresh draft filled from an analysis response for `candidate`.
    ///
    /// Missing list attributes become empty lists, the gender is trimmed and
    /// defaults to unisex, and a missing main category falls back to the
    /// candidate's segment key.
    pub fn from_analysis(
        user_id: impl Into<String>,
        candidate: &SegmentCandidate,
        analysis: AnalysisResponse,
    ) -> Self {
        let mut draft = Self::empty(user_id);
        let attrs = analysis.attributes;

        draft.category_main = attrs
            .category_main
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .or_else(|| catalog::main_for_segment_key(&candidate.category_key).map(String::from))
            .unwrap_or_default();

        if let Some(sub) = attrs.category_sub {
            let sub = sub.trim();
            if catalog::is_valid_sub(&draft.category_main, sub) {
                draft.category_sub = sub.to_string();
            } else {
                debug!(
                    main = %draft.category_main,
                    sub = sub,
                    "Dropping extracted sub-category outside the main category"
                );
            }
        }

        if let Some(level) = attrs.warmth_level {
            draft.warmth_level = level.round().clamp(1.0, 5.0) as u8;
        }
        if let Some(windproof) = attrs.is_windproof {
            draft.is_windproof = windproof;
        }
        overwrite(&mut draft.waterproof_level, attrs.waterproof_level);
        overwrite(&mut draft.breathability, attrs.breathability);
        overwrite(&mut draft.fit, attrs.fit);
        overwrite(&mut draft.color_pattern, attrs.color_pattern);
        overwrite(&mut draft.main_color, attrs.main_color);
        draft.default_layer = attrs.default_layer;
        draft.collar_type = attrs.collar_type;
        draft.length_type = attrs.length_type;

        draft.materials = attrs.materials.unwrap_or_default();
        draft.seasons = attrs.seasons.unwrap_or_default();
        draft.styles = attrs.styles.unwrap_or_default();
        draft.occasions = attrs.occasions.unwrap_or_default();

        draft.gender = attrs
            .gender
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| GENDER_UNISEX.to_string());

        draft.image_url = analysis.selected_image;
        draft.embedding_vector = analysis.embedding_vector;
        draft
    }

    /// Merge user edits. Validation happens before any field changes, so a
    /// rejected patch leaves the draft untouched.
    pub fn apply(&mut self, patch: DraftPatch) -> WardrobeResult<()> {
        let main = patch
            .category_main
            .clone()
            .unwrap_or_else(|| self.category_main.clone());
        let main_changed = main != self.category_main;

        if main_changed && !catalog::is_main_category(&main) {
            return Err(WardrobeError::InvalidDraft(format!(
                "unknown category `{main}`"
            )));
        }

        let sub = match &patch.category_sub {
            Some(sub) => sub.clone(),
            None if main_changed => String::new(),
            None => self.category_sub.clone(),
        };
        if !sub.is_empty() && !catalog::is_valid_sub(&main, &sub) {
            return Err(WardrobeError::InvalidDraft(format!(
                "`{sub}` is not a kind of `{main}`"
            )));
        }

        if let Some(level) = patch.warmth_level {
            if !(1..=5).contains(&level) {
                return Err(WardrobeError::InvalidDraft(format!(
                    "warmth level {level} is outside 1-5"
                )));
            }
        }

        self.category_main = main;
        self.category_sub = sub;

        if let Some(level) = patch.warmth_level {
            self.warmth_level = level;
        }
        if let Some(windproof) = patch.is_windproof {
            self.is_windproof = windproof;
        }
        overwrite(&mut self.waterproof_level, patch.waterproof_level);
        overwrite(&mut self.breathability, patch.breathability);
        overwrite(&mut self.fit, patch.fit);
        overwrite(&mut self.color_pattern, patch.color_pattern);
        overwrite(&mut self.main_color, patch.main_color);
        overwrite(&mut self.status, patch.status);
        overwrite(&mut self.gender, patch.gender);

        if patch.default_layer.is_some() {
            self.default_layer = patch.default_layer;
        }
        if patch.collar_type.is_some() {
            self.collar_type = patch.collar_type;
        }
        if patch.length_type.is_some() {
            self.length_type = patch.length_type;
        }
        if patch.image_url.is_some() {
            self.image_url = patch.image_url;
        }

        if let Some(tags) = patch.materials {
            self.materials = dedup_tags(tags);
        }
        if let Some(tags) = patch.seasons {
            self.seasons = dedup_tags(tags);
        }
        if let Some(tags) = patch.styles {
            self.styles = dedup_tags(tags);
        }
        if let Some(tags) = patch.occasions {
            self.occasions = dedup_tags(tags);
        }

        Ok(())
    }

    /// Copy ready for `POST /items/`, with the placeholder image when none is set.
    pub fn to_persist_payload(&self) -> GarmentDraft {
        let mut payload = self.clone();
        if payload.image_url.as_deref().map_or(true, str::is_empty) {
            payload.image_url = Some(PLACEHOLDER_IMAGE.to_string());
        }
        payload
    }
}

fn overwrite(field: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *field = value;
    }
}

fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Partial update produced by the review form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftPatch {
    pub category_main: Option<String>,
    pub category_sub: Option<String>,
    pub default_layer: Option<String>,
    pub warmth_level: Option<u8>,
    pub is_windproof: Option<bool>,
    pub waterproof_level: Option<String>,
    pub breathability: Option<String>,
    pub fit: Option<String>,
    pub collar_type: Option<String>,
    pub length_type: Option<String>,
    pub color_pattern: Option<String>,
    pub main_color: Option<String>,
    pub status: Option<String>,
    pub materials: Option<Vec<String>>,
    pub seasons: Option<Vec<String>>,
    pub styles: Option<Vec<String>>,
    pub occasions: Option<Vec<String>>,
    pub gender: Option<String>,
    pub image_url: Option<String>,
}

/// Persisted garment. `id` and `created_at` are assigned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GarmentRecord {
    id: i64,
    #[serde(
        default,
        deserialize_with = "flexible_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub garment: GarmentDraft,
}

impl GarmentRecord {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Case-insensitive match on sub-category, materials or main color.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }

        let g = &self.garment;
        g.category_sub.to_lowercase().contains(&term)
            || g.materials.join(" ").to_lowercase().contains(&term)
            || g.main_color.to_lowercase().contains(&term)
    }

    /// `"all"` matches everything, otherwise the main category must be equal.
    pub fn matches_category(&self, category: &str) -> bool {
        category == "all" || self.garment.category_main == category
    }

    /// Virtual garments are listed with the owned ones but kept apart in display.
    pub fn is_owned(&self) -> bool {
        self.garment.status != STATUS_NOT_OWNED
    }

    /// Copy with a new wear status.
    pub fn with_status(&self, status: &str) -> WardrobeResult<GarmentRecord> {
        if !catalog::STATUSES.contains(&status) {
            return Err(WardrobeError::InvalidDraft(format!(
                "unknown status `{status}`"
            )));
        }
        let mut record = self.clone();
        record.garment.status = status.to_string();
        Ok(record)
    }
}

/// `POST /items/generate_virtual` body. The backend renders a garment
/// image from these attributes and stores it as not owned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VirtualItemRequest {
    pub user_id: String,
    pub category_main: String,
    pub category_sub: String,
    pub main_color: String,
    pub materials: Vec<String>,
    pub styles: Vec<String>,
    pub seasons: Vec<String>,
    pub warmth_level: u8,
    pub gender: String,
}

impl VirtualItemRequest {
    /// Request describing `draft`. Rejects drafts the generator cannot render.
    pub fn from_draft(draft: &GarmentDraft) -> WardrobeResult<Self> {
        if !catalog::is_main_category(&draft.category_main) {
            return Err(WardrobeError::InvalidDraft(format!(
                "unknown category `{}`",
                draft.category_main
            )));
        }
        if draft.category_sub.is_empty()
            || !catalog::is_valid_sub(&draft.category_main, &draft.category_sub)
        {
            return Err(WardrobeError::InvalidDraft(format!(
                "`{}` is not a kind of `{}`",
                draft.category_sub, draft.category_main
            )));
        }
        if draft.main_color.trim().is_empty() {
            return Err(WardrobeError::InvalidDraft(
                "a virtual garment needs a main color".to_string(),
            ));
        }

        Ok(Self {
            user_id: draft.user_id.clone(),
            category_main: draft.category_main.clone(),
            category_sub: draft.category_sub.clone(),
            main_color: draft.main_color.trim().to_string(),
            materials: draft.materials.clone(),
            styles: draft.styles.clone(),
            seasons: draft.seasons.clone(),
            warmth_level: draft.warmth_level.clamp(1, 5),
            gender: draft.gender.clone(),
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Build a record as the server would return it.
    pub fn record(id: i64, garment: GarmentDraft) -> GarmentRecord {
        GarmentRecord {
            id,
            created_at: Some(Utc::now()),
            garment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::segment::ExtractedAttributes;

    fn candidate(key: &str) -> SegmentCandidate {
        SegmentCandidate {
            category_key: key.to_string(),
            label: "Upper body".to_string(),
            image_path: format!("uploads/u1/{key}.png"),
        }
    }

    fn analysis(attributes: ExtractedAttributes) -> AnalysisResponse {
        AnalysisResponse {
            attributes,
            selected_image: Some("uploads/u1/upper_clean.png".to_string()),
            embedding_vector: Some(vec![0.1, 0.2]),
        }
    }

    #[test]
    fn missing_lists_become_empty() {
        let draft =
            GarmentDraft::from_analysis("u1", &candidate("upper"), analysis(Default::default()));

        assert_eq!(draft.materials, Vec::<String>::new());
        assert_eq!(draft.seasons, Vec::<String>::new());
        assert_eq!(draft.styles, Vec::<String>::new());
        assert_eq!(draft.occasions, Vec::<String>::new());
    }

    #[test]
    fn main_category_falls_back_to_segment_key() {
        let draft =
            GarmentDraft::from_analysis("u1", &candidate("upper"), analysis(Default::default()));
        assert_eq!(draft.category_main, "top garment");

        let draft =
            GarmentDraft::from_analysis("u1", &candidate("shoes"), analysis(Default::default()));
        assert_eq!(draft.category_main, "footwear");

        let draft =
            GarmentDraft::from_analysis("u1", &candidate("mystery"), analysis(Default::default()));
        assert_eq!(draft.category_main, "");
    }

    #[test]
    fn extracted_main_wins_over_segment_key() {
        let attrs = ExtractedAttributes {
            category_main: Some("one-piece".to_string()),
            category_sub: Some("dress".to_string()),
            ..Default::default()
        };
        let draft = GarmentDraft::from_analysis("u1", &candidate("upper"), analysis(attrs));

        assert_eq!(draft.category_main, "one-piece");
        assert_eq!(draft.category_sub, "dress");
    }

    #[test]
    fn gender_is_trimmed_and_defaulted() {
        let attrs = ExtractedAttributes {
            gender: Some("  womenswear \n".to_string()),
            ..Default::default()
        };
        let draft = GarmentDraft::from_analysis("u1", &candidate("upper"), analysis(attrs));
        assert_eq!(draft.gender, "womenswear");

        let draft =
            GarmentDraft::from_analysis("u1", &candidate("upper"), analysis(Default::default()));
        assert_eq!(draft.gender, "unisex");
    }

    #[test]
    fn foreign_sub_category_is_dropped_on_extraction() {
        let attrs = ExtractedAttributes {
            category_sub: Some("jeans".to_string()),
            warmth_level: Some(9.0),
            ..Default::default()
        };
        let draft = GarmentDraft::from_analysis("u1", &candidate("upper"), analysis(attrs));

        assert_eq!(draft.category_main, "top garment");
        assert_eq!(draft.category_sub, "");
        assert_eq!(draft.warmth_level, 5);
        assert_eq!(draft.image_url.as_deref(), Some("uploads/u1/upper_clean.png"));
    }

    #[test]
    fn changing_main_resets_sub() {
        let mut draft = GarmentDraft::empty("u1");
        draft
            .apply(DraftPatch {
                category_main: Some("top garment".to_string()),
                category_sub: Some("hoodie".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(draft.category_sub, "hoodie");

        draft
            .apply(DraftPatch {
                category_main: Some("bottom garment".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(draft.category_main, "bottom garment");
        assert_eq!(draft.category_sub, "");
    }

    #[test]
    fn rejected_patch_leaves_draft_untouched() {
        let mut draft = GarmentDraft::empty("u1");
        draft.category_main = "top garment".to_string();
        let before = draft.clone();

        let err = draft
            .apply(DraftPatch {
                category_sub: Some("sandals".to_string()),
                main_color: Some("red".to_string()),
                ..Default::default()
            })
            .unwrap_err();

        assert!(matches!(err, WardrobeError::InvalidDraft(_)));
        assert_eq!(draft, before);

        assert!(draft
            .apply(DraftPatch {
                warmth_level: Some(0),
                ..Default::default()
            })
            .is_err());
    }

    #[test]
    fn tag_edits_are_deduplicated() {
        let mut draft = GarmentDraft::empty("u1");
        draft
            .apply(DraftPatch {
                seasons: Some(vec![
                    "spring".to_string(),
                    " autumn".to_string(),
                    "spring".to_string(),
                ]),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(draft.seasons, vec!["spring", "autumn"]);
    }

    #[test]
    fn persist_payload_defaults_image() {
        let draft = GarmentDraft::empty("u1");
        assert_eq!(
            draft.to_persist_payload().image_url.as_deref(),
            Some(PLACEHOLDER_IMAGE)
        );
    }

    #[test]
    fn record_decodes_server_shape() {
        let record: GarmentRecord = serde_json::from_value(serde_json::json!({
            "id": 7,
            "user_id": "u1",
            "image_url": "uploads/u1/a.png",
            "created_at": "2024-05-01T10:00:00",
            "category_main": "top garment",
            "category_sub": "shirt",
            "warmth_level": 2,
            "materials": ["cotton"],
            "is_windproof": false,
            "waterproof_level": "none",
            "breathability": "high",
            "color_pattern": "solid",
            "main_color": "White",
            "status": "normal",
            "seasons": ["summer"],
            "fit": "regular",
            "styles": ["business"],
            "occasions": null,
            "gender": "unisex"
        }))
        .unwrap();

        assert_eq!(record.id(), 7);
        assert!(record.created_at().is_some());
        assert!(record.garment.occasions.is_empty());
        assert!(record.matches_search("white"));
        assert!(record.matches_search("COTTON"));
        assert!(!record.matches_search("denim"));
        assert!(record.matches_category("all"));
        assert!(!record.matches_category("footwear"));
    }

    #[test]
    fn status_change_is_validated() {
        let record = fixtures::record(1, GarmentDraft::empty("u1"));
        assert_eq!(record.with_status("washing").unwrap().garment.status, "washing");
        assert!(record.with_status("lost").is_err());
    }

    #[test]
    fn listed_record_with_null_columns_uses_defaults() {
        let records: Vec<GarmentRecord> = serde_json::from_value(serde_json::json!([{
            "id": 11,
            "user_id": "u1",
            "image_url": "uploads/u1/b.png",
            "created_at": "2024-05-02T09:00:00",
            "category_main": "bottom garment",
            "category_sub": "jeans",
            "warmth_level": 3,
            "materials": ["denim"],
            "is_windproof": false,
            "waterproof_level": "none",
            "breathability": null,
            "color_pattern": null,
            "main_color": "blue",
            "status": "normal",
            "seasons": [],
            "fit": "regular",
            "styles": [],
            "gender": null
        }]))
        .unwrap();

        let garment = &records[0].garment;
        assert_eq!(garment.breathability, DEFAULT_BREATHABILITY);
        assert_eq!(garment.color_pattern, DEFAULT_COLOR_PATTERN);
        assert_eq!(garment.gender, GENDER_UNISEX);
        assert!(garment.occasions.is_empty());
    }

    #[test]
    fn not_owned_records_are_virtual() {
        let record = fixtures::record(2, GarmentDraft::empty("u1"));
        assert!(record.is_owned());

        let virtual_item = record.with_status(STATUS_NOT_OWNED).unwrap();
        assert!(!virtual_item.is_owned());
        assert!(virtual_item.with_status("normal").unwrap().is_owned());
    }

    #[test]
    fn virtual_request_requires_a_renderable_draft() {
        let mut draft = GarmentDraft::empty("u1");
        assert!(VirtualItemRequest::from_draft(&draft).is_err());

        draft
            .apply(DraftPatch {
                category_main: Some("top garment".to_string()),
                category_sub: Some("shirt".to_string()),
                styles: Some(vec!["business".to_string()]),
                ..Default::default()
            })
            .unwrap();
        assert!(matches!(
            VirtualItemRequest::from_draft(&draft),
            Err(WardrobeError::InvalidDraft(_))
        ));

        draft.main_color = " white ".to_string();
        let request = VirtualItemRequest::from_draft(&draft).unwrap();
        assert_eq!(request.main_color, "white");
        assert_eq!(request.warmth_level, 3);
        assert_eq!(request.gender, GENDER_UNISEX);

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["category_sub"], "shirt");
        assert_eq!(body["styles"], serde_json::json!(["business"]));
    }
}
