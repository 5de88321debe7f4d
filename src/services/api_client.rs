//! Wardrobe backend client.
//!
//! Provides type-safe methods for:
//! - Photo segmentation and attribute extraction
//! - Garment persistence (create, list, update, delete)
//! - Weather lookup
//! - Preference tags, user profile and outfit recommendation
//! - Login and registration

use anyhow::{Context, Result};
use parking_lot::RwLock;
use reqwest::{multipart, Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};
use url::Url;

use crate::domain::auth::{Credentials, ErrorBody, TokenResponse};
use crate::domain::garment::{GarmentDraft, GarmentRecord, VirtualItemRequest};
use crate::domain::location::LocationKey;
use crate::domain::profile::{UserProfile, UserProfileRecord};
use crate::domain::recommend::{FeedbackRequest, RecommendationRequest, RecommendationResult};
use crate::domain::segment::{AnalysisResponse, SegmentCandidate, SegmentResponse, SourceImage};
use crate::domain::tags::UserTags;
use crate::domain::weather::WeatherPayload;
use crate::error::{WardrobeError, WardrobeResult};

/// Maps a failure description to the error kind of the calling operation.
type ErrorKind = fn(String) -> WardrobeError;

/// Client for the wardrobe backend.
#[derive(Clone)]
pub struct WardrobeApi {
    client: Client,
    base_url: Url,
    bearer: Arc<RwLock<Option<String>>>,
}

impl WardrobeApi {
    /// Create a new backend client.
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
            .context("Invalid wardrobe API URL")?;

        tracing::info!(base_url = %base_url, "Wardrobe client initialized");

        Ok(Self {
            client,
            base_url,
            bearer: Arc::new(RwLock::new(None)),
        })
    }

    /// Attach (or clear) the bearer token sent with every request.
    pub fn set_bearer_token(&self, token: Option<String>) {
        *self.bearer.write() = token;
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> WardrobeResult<Url> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| WardrobeError::Remote(format!("invalid path {path}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.bearer.read().as_deref() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Send a request and decode a JSON body, mapping every failure through `kind`.
    async fn send<R: DeserializeOwned>(&self, req: RequestBuilder, kind: ErrorKind) -> WardrobeResult<R> {
        let response = self.dispatch(req, kind).await?;

        response.json::<R>().await.map_err(|e| {
            error!(error = %e, "Failed to parse backend response");
            kind(format!("invalid response: {e}"))
        })
    }

    /// Send a request and check its status, leaving the body unread.
    async fn dispatch(&self, req: RequestBuilder, kind: ErrorKind) -> WardrobeResult<reqwest::Response> {
        let response = self.authorize(req).send().await.map_err(|e| {
            error!(error = %e, "Backend request failed");
            kind(format!("backend unavailable: {e}"))
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.get_message())
            .unwrap_or_else(|| format!("backend error: {status}"));

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!(status = %status, message = %message, "Backend rejected credentials");
            }
            _ => error!(status = %status, message = %message, "Backend error"),
        }
        Err(kind(message))
    }

    async fn post_json<T: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
        kind: ErrorKind,
    ) -> WardrobeResult<R> {
        let url = self.url(path, &[])?;
        debug!(url = %url, "Backend POST");
        self.send(self.client.post(url).json(body), kind).await
    }

    async fn get_json<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        kind: ErrorKind,
    ) -> WardrobeResult<R> {
        let url = self.url(path, query)?;
        debug!(url = %url, "Backend GET");
        self.send(self.client.get(url), kind).await
    }

    /// Check backend reachability.
    pub async fn health_check(&self) -> Result<()> {
        let url = self.base_url.join("docs").context("Invalid health URL")?;

        self.client
            .get(url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .context("Wardrobe backend health check failed")?
            .error_for_status()
            .context("Wardrobe backend unhealthy")?;

        Ok(())
    }

    // =========================================================================
    // Intake Endpoints
    // =========================================================================

    /// Cut a photo into candidate garment crops.
    #[instrument(skip(self, image), fields(file = %image.file_name, bytes = image.bytes.len()))]
    pub async fn segment(
        &self,
        user_id: &str,
        image: &SourceImage,
    ) -> WardrobeResult<Vec<SegmentCandidate>> {
        let part = multipart::Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)
            .map_err(|e| WardrobeError::SegmentationFailed(format!("bad content type: {e}")))?;
        let form = multipart::Form::new().part("file", part);

        let url = self.url("segment", &[("user_id", user_id)])?;
        let response: SegmentResponse = self
            .send(
                self.client.post(url).multipart(form),
                WardrobeError::SegmentationFailed,
            )
            .await?;

        response.into_parts()
    }

    /// Extract attributes of one segmented crop.
    #[instrument(skip(self))]
    pub async fn analyze_selected(
        &self,
        image_path: &str,
        user_id: &str,
    ) -> WardrobeResult<AnalysisResponse> {
        #[derive(Serialize)]
        struct Request<'a> {
            image_path: &'a str,
            user_id: &'a str,
        }

        self.post_json(
            "analyze-selected",
            &Request {
                image_path,
                user_id,
            },
            WardrobeError::AnalysisFailed,
        )
        .await
    }

    // =========================================================================
    // Item Endpoints
    // =========================================================================

    /// Persist a new garment.
    #[instrument(skip(self, draft), fields(user_id = %draft.user_id))]
    pub async fn create_item(&self, draft: &GarmentDraft) -> WardrobeResult<GarmentRecord> {
        self.post_json("items/", draft, WardrobeError::PersistFailed)
            .await
    }

    /// List every garment of a user.
    #[instrument(skip(self))]
    pub async fn list_items(&self, user_id: &str) -> WardrobeResult<Vec<GarmentRecord>> {
        self.get_json("items/", &[("user_id", user_id)], WardrobeError::Remote)
            .await
    }

    /// Replace a stored garment.
    #[instrument(skip(self, record), fields(item_id = record.id()))]
    pub async fn update_item(&self, record: &GarmentRecord) -> WardrobeResult<GarmentRecord> {
        let url = self.url(
            &format!("items/{}", record.id()),
            &[("user_id", record.garment.user_id.as_str())],
        )?;
        self.send(
            self.client.put(url).json(record),
            WardrobeError::PersistFailed,
        )
        .await
    }

    /// Change only the wear status of a stored garment.
    pub async fn update_status(
        &self,
        record: &GarmentRecord,
        status: &str,
    ) -> WardrobeResult<GarmentRecord> {
        let updated = record.with_status(status)?;
        self.update_item(&updated).await
    }

    /// Generate a garment image from attributes and store it as not owned.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, category = %request.category_sub))]
    pub async fn generate_virtual_item(
        &self,
        request: &VirtualItemRequest,
    ) -> WardrobeResult<GarmentRecord> {
        self.post_json("items/generate_virtual", request, WardrobeError::PersistFailed)
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete_item(&self, item_id: i64, user_id: &str) -> WardrobeResult<()> {
        let url = self.url(&format!("items/{item_id}"), &[("user_id", user_id)])?;
        self.dispatch(self.client.delete(url), WardrobeError::PersistFailed)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Weather & Preferences
    // =========================================================================

    /// Raw weather payload for a location key.
    #[instrument(skip(self, location), fields(location = %location))]
    pub async fn weather(&self, location: &LocationKey) -> WardrobeResult<WeatherPayload> {
        self.get_json(
            "weather",
            &[("location_input", location.as_str())],
            WardrobeError::WeatherFetchFailed,
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn user_tags(&self, user_id: &str) -> WardrobeResult<UserTags> {
        self.get_json("user/tags", &[("user_id", user_id)], WardrobeError::Remote)
            .await
    }

    /// Profile of a user; the backend creates a default one on first access.
    #[instrument(skip(self))]
    pub async fn user_profile(&self, user_id: &str) -> WardrobeResult<UserProfileRecord> {
        self.get_json("user/profile", &[("user_id", user_id)], WardrobeError::Remote)
            .await
    }

    #[instrument(skip(self, profile))]
    pub async fn update_user_profile(
        &self,
        user_id: &str,
        profile: &UserProfile,
    ) -> WardrobeResult<UserProfileRecord> {
        let url = self.url("user/profile", &[("user_id", user_id)])?;
        self.send(
            self.client.put(url).json(&profile.normalized()),
            WardrobeError::Remote,
        )
        .await
    }

    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn recommend_outfit(
        &self,
        request: &RecommendationRequest,
    ) -> WardrobeResult<RecommendationResult> {
        self.post_json("recommend/outfit", request, WardrobeError::Remote)
            .await
    }

    #[instrument(skip(self, feedback), fields(code = feedback.feedback_code))]
    pub async fn send_feedback(&self, feedback: &FeedbackRequest) -> WardrobeResult<()> {
        let url = self.url("recommend/feedback", &[])?;
        self.dispatch(self.client.post(url).json(feedback), WardrobeError::Remote)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Auth Endpoints
    // =========================================================================

    /// OAuth2 password form login.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> WardrobeResult<TokenResponse> {
        let url = self.url("token", &[])?;
        self.send(
            self.client
                .post(url)
                .form(&[("username", username), ("password", password)]),
            WardrobeError::AuthFailed,
        )
        .await
    }

    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn register(&self, credentials: &Credentials) -> WardrobeResult<TokenResponse> {
        self.post_json("register", credentials, WardrobeError::AuthFailed)
            .await
    }
}
