//! Per-user body and lifestyle profile (`/user/profile`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::serde_helpers::{flexible_timestamp, vec_or_default};

/// Feeling of temperature, from -2 (very cold-sensitive) to 2 (very
/// heat-sensitive).
pub const THERMAL_RANGE: std::ops::RangeInclusive<i32> = -2..=2;

/// Editable profile. Missing fields decode to the backend defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub thermal_sensitivity: i32,
    pub sweat_tendency: bool,
    pub body_shape: String,
    pub commute_method: String,
    pub occupation: String,
    pub fit_preference: String,
    #[serde(deserialize_with = "vec_or_default")]
    pub avoid_colors: Vec<String>,
    #[serde(deserialize_with = "vec_or_default")]
    pub preferred_styles: Vec<String>,
    #[serde(deserialize_with = "vec_or_default")]
    pub preferred_colors: Vec<String>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            thermal_sensitivity: 0,
            sweat_tendency: false,
            body_shape: "standard".to_string(),
            commute_method: "cycling".to_string(),
            occupation: "student".to_string(),
            fit_preference: "regular".to_string(),
            avoid_colors: Vec::new(),
            preferred_styles: Vec::new(),
            preferred_colors: Vec::new(),
        }
    }
}

impl UserProfile {
    pub fn thermal_label(&self) -> &'static str {
        match self.thermal_sensitivity {
            i32::MIN..=-2 => "very cold-sensitive",
            -1 => "cold-sensitive",
            0 => "normal",
            1 => "heat-sensitive",
            _ => "very heat-sensitive",
        }
    }

    /// Copy ready for `PUT /user/profile`: thermal sensitivity clamped and
    /// a color never both preferred and avoided.
    pub fn normalized(&self) -> Self {
        let mut profile = self.clone();
        profile.thermal_sensitivity = profile
            .thermal_sensitivity
            .clamp(*THERMAL_RANGE.start(), *THERMAL_RANGE.end());
        let avoid = profile.avoid_colors.clone();
        profile.preferred_colors.retain(|c| !avoid.contains(c));
        profile
    }
}

/// `GET`/`PUT /user/profile` response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserProfileRecord {
    pub user_id: String,
    #[serde(default, deserialize_with = "flexible_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub profile: UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_record_uses_defaults() {
        let record: UserProfileRecord = serde_json::from_value(serde_json::json!({
            "user_id": "u1",
            "updated_at": "2024-06-01T12:00:00",
            "thermal_sensitivity": -1,
            "avoid_colors": null
        }))
        .unwrap();

        assert_eq!(record.user_id, "u1");
        assert!(record.updated_at.is_some());
        assert_eq!(record.profile.thermal_label(), "cold-sensitive");
        assert_eq!(record.profile.commute_method, "cycling");
        assert!(record.profile.avoid_colors.is_empty());
    }

    #[test]
    fn normalization_clamps_and_resolves_color_conflicts() {
        let profile = UserProfile {
            thermal_sensitivity: 5,
            avoid_colors: vec!["red".to_string()],
            preferred_colors: vec!["red".to_string(), "navy".to_string()],
            ..Default::default()
        };

        let normalized = profile.normalized();

        assert_eq!(normalized.thermal_sensitivity, 2);
        assert_eq!(normalized.thermal_label(), "very heat-sensitive");
        assert_eq!(normalized.preferred_colors, vec!["navy"]);
    }
}
