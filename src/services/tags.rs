//! Style and occasion choices for the recommendation form.
//!
//! Starts from the built-in defaults and merges the user's own tags from the
//! backend. The remote list is fetched at most once per catalog, no matter how
//! often the selection changes.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::domain::catalog::{DEFAULT_OCCASIONS, DEFAULT_STYLES};
use crate::domain::tags::UserTags;
use crate::error::WardrobeResult;
use crate::services::WardrobeApi;

#[async_trait]
pub trait TagSource: Send + Sync {
    async fn user_tags(&self, user_id: &str) -> WardrobeResult<UserTags>;
}

#[async_trait]
impl TagSource for WardrobeApi {
    async fn user_tags(&self, user_id: &str) -> WardrobeResult<UserTags> {
        WardrobeApi::user_tags(self, user_id).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Choice {
    options: Vec<String>,
    selected: String,
}

impl Choice {
    fn from_defaults(defaults: &[&str]) -> Self {
        let options: Vec<String> = defaults.iter().map(|s| s.to_string()).collect();
        let selected = options.first().cloned().unwrap_or_default();
        Self { options, selected }
    }

    /// Replace the options with a non-empty remote list, keeping the
    /// selection when it survives.
    fn merge(&mut self, remote: &[String]) {
        let remote: Vec<String> = remote
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if remote.is_empty() {
            return;
        }
        if !remote.contains(&self.selected) {
            self.selected = remote[0].clone();
        }
        self.options = remote;
    }

    fn select(&mut self, value: &str) -> bool {
        if self.options.iter().any(|o| o == value) {
            self.selected = value.to_string();
            true
        } else {
            false
        }
    }
}

struct TagState {
    styles: Choice,
    occasions: Choice,
}

pub struct TagCatalog {
    source: Arc<dyn TagSource>,
    user_id: String,
    fetched: OnceCell<()>,
    state: Mutex<TagState>,
}

impl TagCatalog {
    pub fn new(source: Arc<dyn TagSource>, user_id: impl Into<String>) -> Self {
        Self {
            source,
            user_id: user_id.into(),
            fetched: OnceCell::new(),
            state: Mutex::new(TagState {
                styles: Choice::from_defaults(&DEFAULT_STYLES),
                occasions: Choice::from_defaults(&DEFAULT_OCCASIONS),
            }),
        }
    }

    /// Fetch and merge the user's tags. Only the first call hits the
    /// backend; a failed fetch keeps the defaults.
    pub async fn load(&self) {
        self.fetched
            .get_or_init(|| async {
                match self.source.user_tags(&self.user_id).await {
                    Ok(tags) => {
                        debug!(
                            styles = tags.styles.len(),
                            occasions = tags.occasions.len(),
                            "User tags loaded"
                        );
                        let mut state = self.state.lock();
                        state.styles.merge(&tags.styles);
                        state.occasions.merge(&tags.occasions);
                    }
                    Err(e) => warn!(user_id = %self.user_id, error = %e, "Keeping default tags"),
                }
            })
            .await;
    }

    pub fn styles(&self) -> Vec<String> {
        self.state.lock().styles.options.clone()
    }

    pub fn occasions(&self) -> Vec<String> {
        self.state.lock().occasions.options.clone()
    }

    pub fn selected_style(&self) -> String {
        self.state.lock().styles.selected.clone()
    }

    pub fn selected_occasion(&self) -> String {
        self.state.lock().occasions.selected.clone()
    }

    /// Returns `false` when `style` is not one of the options.
    pub fn select_style(&self, style: &str) -> bool {
        self.state.lock().styles.select(style)
    }

    pub fn select_occasion(&self, occasion: &str) -> bool {
        self.state.lock().occasions.select(occasion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WardrobeError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeTags {
        reply: Option<UserTags>,
        calls: AtomicUsize,
    }

    impl FakeTags {
        fn new(reply: Option<UserTags>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TagSource for FakeTags {
        async fn user_tags(&self, _user_id: &str) -> WardrobeResult<UserTags> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .clone()
                .ok_or_else(|| WardrobeError::Remote("503".to_string()))
        }
    }

    fn tags(styles: &[&str], occasions: &[&str]) -> UserTags {
        UserTags {
            styles: styles.iter().map(|s| s.to_string()).collect(),
            occasions: occasions.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn fetches_once_regardless_of_selection_changes() {
        let source = FakeTags::new(Some(tags(&["casual", "vintage"], &[])));
        let catalog = TagCatalog::new(source.clone(), "u1");

        catalog.load().await;
        catalog.select_style("vintage");
        catalog.load().await;
        catalog.select_style("casual");
        catalog.load().await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn remote_lists_replace_defaults_only_when_non_empty() {
        let source = FakeTags::new(Some(tags(&["vintage", "street"], &[])));
        let catalog = TagCatalog::new(source, "u1");

        catalog.load().await;

        assert_eq!(catalog.styles(), vec!["vintage", "street"]);
        assert_eq!(catalog.selected_style(), "vintage");
        assert_eq!(catalog.occasions().len(), DEFAULT_OCCASIONS.len());
        assert_eq!(catalog.selected_occasion(), DEFAULT_OCCASIONS[0]);
    }

    #[tokio::test]
    async fn surviving_selection_is_kept() {
        let source = FakeTags::new(Some(tags(&["street", DEFAULT_STYLES[1]], &[])));
        let catalog = TagCatalog::new(source, "u1");
        assert!(catalog.select_style(DEFAULT_STYLES[1]));

        catalog.load().await;

        assert_eq!(catalog.selected_style(), DEFAULT_STYLES[1]);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_defaults_and_is_not_retried() {
        let source = FakeTags::new(None);
        let catalog = TagCatalog::new(source.clone(), "u1");

        catalog.load().await;
        catalog.load().await;

        assert_eq!(catalog.styles().len(), DEFAULT_STYLES.len());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_selection_is_rejected() {
        let catalog = TagCatalog::new(FakeTags::new(None), "u1");
        assert!(!catalog.select_occasion("moon landing"));
        assert_eq!(catalog.selected_occasion(), DEFAULT_OCCASIONS[0]);
    }
}
