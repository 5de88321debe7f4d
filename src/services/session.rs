//! Persisted login session and user preferences.
//!
//! Token, user id and username live in one storage record, so a session is
//! either fully present or absent. Failed logins never touch storage.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domain::auth::{Credentials, Session, TokenResponse};
use crate::error::{WardrobeError, WardrobeResult};
use crate::services::WardrobeApi;
use crate::storage::{self, keys, KeyValueStore};

/// User id used for requests made before anyone has logged in.
pub const GUEST_USER_ID: &str = "test_user";

pub const DEFAULT_GENDER: &str = "menswear";

#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> WardrobeResult<TokenResponse>;

    async fn register(&self, credentials: &Credentials) -> WardrobeResult<TokenResponse>;
}

#[async_trait]
impl AuthBackend for WardrobeApi {
    async fn login(&self, username: &str, password: &str) -> WardrobeResult<TokenResponse> {
        WardrobeApi::login(self, username, password).await
    }

    async fn register(&self, credentials: &Credentials) -> WardrobeResult<TokenResponse> {
        WardrobeApi::register(self, credentials).await
    }
}

#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn AuthBackend>, store: Arc<dyn KeyValueStore>) -> Self {
        Self { backend, store }
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> WardrobeResult<Session> {
        let credentials = validate(username, password)?;
        let token = self
            .backend
            .login(&credentials.username, &credentials.password)
            .await
            .map_err(into_auth_failure)?;
        self.establish(token)
    }

    #[instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &str) -> WardrobeResult<Session> {
        let credentials = validate(username, password)?;
        let token = self
            .backend
            .register(&credentials)
            .await
            .map_err(into_auth_failure)?;
        self.establish(token)
    }

    pub fn logout(&self) -> WardrobeResult<()> {
        self.store.remove(keys::SESSION)?;
        info!("Logged out");
        Ok(())
    }

    pub fn current(&self) -> Option<Session> {
        storage::get_json(self.store.as_ref(), keys::SESSION)
    }

    pub fn user_id(&self) -> Option<String> {
        self.current().map(|s| s.user_id)
    }

    /// Logged-in user id, or the guest id when nobody is logged in.
    pub fn effective_user_id(&self) -> String {
        self.user_id().unwrap_or_else(|| GUEST_USER_ID.to_string())
    }

    pub fn preferred_gender(&self) -> String {
        self.store
            .get(keys::PREFERRED_GENDER)
            .filter(|g| !g.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GENDER.to_string())
    }

    pub fn set_preferred_gender(&self, gender: &str) -> WardrobeResult<()> {
        self.store.set(keys::PREFERRED_GENDER, gender.trim())?;
        Ok(())
    }

    fn establish(&self, token: TokenResponse) -> WardrobeResult<Session> {
        let session = Session::from(token);
        storage::set_json(self.store.as_ref(), keys::SESSION, &session)?;
        info!(user_id = %session.user_id, username = %session.username, "Session established");
        Ok(session)
    }
}

fn validate(username: &str, password: &str) -> WardrobeResult<Credentials> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(WardrobeError::AuthFailed(
            "Username and password are required".to_string(),
        ));
    }
    Ok(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

fn into_auth_failure(e: WardrobeError) -> WardrobeError {
    match e {
        WardrobeError::AuthFailed(msg) => WardrobeError::AuthFailed(msg),
        other => {
            warn!(error = %other, "Authentication request failed");
            WardrobeError::AuthFailed(other.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct FakeAuth {
        registered: Mutex<Vec<String>>,
    }

    fn token(user_id: &str, username: &str) -> TokenResponse {
        TokenResponse {
            access_token: format!("tok-{user_id}"),
            token_type: Some("bearer".to_string()),
            user_id: user_id.to_string(),
            username: username.to_string(),
        }
    }

    #[async_trait]
    impl AuthBackend for FakeAuth {
        async fn login(&self, username: &str, password: &str) -> WardrobeResult<TokenResponse> {
            if password == "hunter2" {
                Ok(token("7", username))
            } else {
                Err(WardrobeError::AuthFailed(
                    "Incorrect username or password".to_string(),
                ))
            }
        }

        async fn register(&self, credentials: &Credentials) -> WardrobeResult<TokenResponse> {
            let mut registered = self.registered.lock();
            if registered.contains(&credentials.username) {
                return Err(WardrobeError::Remote("Username already registered".to_string()));
            }
            registered.push(credentials.username.clone());
            Ok(token("8", &credentials.username))
        }
    }

    fn sessions() -> (SessionStore, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (
            SessionStore::new(Arc::new(FakeAuth::default()), store.clone()),
            store,
        )
    }

    #[tokio::test]
    async fn login_writes_whole_session() {
        let (sessions, _) = sessions();

        let session = sessions.login(" mei ", "hunter2").await.unwrap();

        assert_eq!(session.username, "mei");
        assert_eq!(sessions.current(), Some(session));
        assert_eq!(sessions.user_id().as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn failed_login_leaves_storage_untouched() {
        let (sessions, store) = sessions();

        let err = sessions.login("mei", "wrong").await.unwrap_err();

        assert!(matches!(err, WardrobeError::AuthFailed(ref m) if m == "Incorrect username or password"));
        assert!(store.is_empty());
        assert_eq!(sessions.effective_user_id(), GUEST_USER_ID);
    }

    #[tokio::test]
    async fn failed_login_keeps_previous_session() {
        let (sessions, _) = sessions();
        let first = sessions.login("mei", "hunter2").await.unwrap();

        assert!(sessions.login("mei", "wrong").await.is_err());

        assert_eq!(sessions.current(), Some(first));
    }

    #[tokio::test]
    async fn register_failures_become_auth_failures() {
        let (sessions, _) = sessions();
        sessions.register("lin", "pw").await.unwrap();
        sessions.logout().unwrap();

        let err = sessions.register("lin", "pw").await.unwrap_err();

        assert_eq!(err.error_code(), "AUTH_FAILED");
        assert!(sessions.current().is_none());
    }

    #[tokio::test]
    async fn blank_credentials_are_rejected_locally() {
        let (sessions, store) = sessions();
        assert!(sessions.login("  ", "hunter2").await.is_err());
        assert!(sessions.register("lin", "").await.is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn gender_defaults_to_menswear() {
        let (sessions, _) = sessions();
        assert_eq!(sessions.preferred_gender(), DEFAULT_GENDER);

        sessions.set_preferred_gender("womenswear").unwrap();
        assert_eq!(sessions.preferred_gender(), "womenswear");
    }
}
