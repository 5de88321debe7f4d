//! Recommendation request and feedback payloads.
//!
//! The outfit algorithm runs remotely; these types only carry the client's
//! inputs (session, location, tag selection, target categories) to it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::categories::TargetCategorySet;

/// Temperature assumed when the weather summary carries none.
pub const DEFAULT_FEEDBACK_TEMP: i32 = 20;

/// `POST /recommend/outfit` body
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationRequest {
    pub user_id: String,
    pub location: String,
    pub gender: String,
    pub style: String,
    pub scenario: String,
    pub target_categories: TargetCategorySet,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutfitItem {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub warmth: f64,
    #[serde(default, rename = "type")]
    pub kind: String,
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationResult {
    pub status: String,
    #[serde(default)]
    pub weather_summary: String,
    #[serde(default)]
    pub outfit: HashMap<String, OutfitItem>,
    #[serde(default)]
    pub ai_comment: String,
    #[serde(default)]
    pub score: f64,
    pub virtual_tryon_url: Option<String>,
    pub message: Option<String>,
}

impl RecommendationResult {
    pub fn is_failed(&self) -> bool {
        self.status == "failed"
    }

    fn piece_id(&self, slots: &[&str]) -> Option<i64> {
        slots
            .iter()
            .find_map(|slot| self.outfit.get(*slot))
            .map(|item| item.id)
    }

    /// First integer followed by a degree marker in the weather summary.
    pub fn summary_temperature(&self) -> Option<i32> {
        let chars: Vec<char> = self.weather_summary.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            if chars[i].is_ascii_digit() {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let marker = chars.get(i).copied();
                if matches!(marker, Some('°') | Some('度')) {
                    let digits: String = chars[start..i].iter().collect();
                    let negative = start > 0 && chars[start - 1] == '-';
                    return digits
                        .parse::<i32>()
                        .ok()
                        .map(|t| if negative { -t } else { t });
                }
            } else {
                i += 1;
            }
        }
        None
    }
}

/// `POST /recommend/feedback` body
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackRequest {
    pub user_id: String,
    pub top_id: Option<i64>,
    pub bottom_id: Option<i64>,
    pub outer_id: Option<i64>,
    pub one_piece_id: Option<i64>,
    pub feedback_code: i32,
    pub weather_temp: i32,
    pub gender: String,
}

impl FeedbackRequest {
    pub fn for_result(
        result: &RecommendationResult,
        user_id: &str,
        gender: &str,
        feedback_code: i32,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            top_id: result.piece_id(&["top"]),
            bottom_id: result.piece_id(&["bottom"]),
            outer_id: result.piece_id(&["outer"]),
            one_piece_id: result.piece_id(&["one_piece", "onepiece"]),
            feedback_code,
            weather_temp: result
                .summary_temperature()
                .unwrap_or(DEFAULT_FEEDBACK_TEMP),
            gender: gender.to_string(),
        }
    }
}
