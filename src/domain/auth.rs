//! Authentication domain types
//!
//! Token contract of the wardrobe backend (`/token`, `/register`).

use serde::{Deserialize, Serialize};

/// Register request
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Response of both `/token` and `/register`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub user_id: String,
    pub username: String,
}

/// Persisted authentication state. Written only as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub username: String,
}

impl From<TokenResponse> for Session {
    fn from(tr: TokenResponse) -> Self {
        Self {
            token: tr.access_token,
            user_id: tr.user_id,
            username: tr.username,
        }
    }
}

/// Backend error body (`{"detail": ...}` from the API, `{"message": ...}` elsewhere)
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub detail: Option<serde_json::Value>,
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn get_message(&self) -> Option<String> {
        self.message.clone().or_else(|| match &self.detail {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        })
    }
}
