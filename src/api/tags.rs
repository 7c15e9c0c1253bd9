use std::sync::{Arc, OnceLock};
use std::time::Duration;

use log::{info, warn};
use reqwest::Client;

use crate::api::error::FetchError;

/// Remote endpoint listing every tag the service accepts.
pub const CAAS_TAGS_URL: &str = "https://cataas.com/api/tags?json=true";

/// Handle to the list of tags the service accepts.
///
/// Clones share the same list. The list is published at most once; until then
/// it reads as empty and every tag lookup misses.
#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    tags: Arc<OnceLock<Vec<String>>>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that is already published with `tags`.
    pub fn with_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let registry = Self::new();
        registry.publish(tags.into_iter().map(Into::into).collect());
        registry
    }

    /// Publishes the tag list. Returns `false` if a list was already published,
    /// in which case `tags` is discarded.
    pub fn publish(&self, tags: Vec<String>) -> bool {
        self.tags.set(tags).is_ok()
    }

    pub fn is_published(&self) -> bool {
        self.tags.get().is_some()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags().iter().any(|t| t == tag)
    }

    pub fn tags(&self) -> &[String] {
        self.tags.get().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.tags().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags().is_empty()
    }

    /// Populates the registry from the service's tag listing.
    pub async fn fetch(&self, timeout: Duration) -> Result<usize, FetchError> {
        self.fetch_from(CAAS_TAGS_URL, timeout).await
    }

    /// Fetches a JSON array of tags from `url` and publishes it.
    ///
    /// On failure nothing is published and the registry stays empty.
    pub async fn fetch_from(&self, url: &str, timeout: Duration) -> Result<usize, FetchError> {
        info!("Fetching available tags from {}", url);

        let client = Client::builder().timeout(timeout).build()?;
        let body = client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let tags: Vec<String> = serde_json::from_slice(&body)?;
        let count = tags.len();

        if self.publish(tags) {
            info!("Registered {} available tags", count);
        } else {
            warn!("Tag list already published, ignoring {} fetched tags", count);
        }

        Ok(self.len())
    }
}
