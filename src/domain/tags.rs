//! Per-user preference tags (`GET /user/tags`).

use serde::Deserialize;

use super::serde_helpers::vec_or_default;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserTags {
    #[serde(default, deserialize_with = "vec_or_default")]
    pub styles: Vec<String>,
    #[serde(default, deserialize_with = "vec_or_default")]
    pub occasions: Vec<String>,
}
