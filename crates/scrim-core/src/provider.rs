//! Resource providers
//!
//! Turn a [`MediaHandle`] into a playable [`NativePlayer`]. The controller
//! owns exactly one provider and calls [`ResourceProvider::cancel`] before
//! every new resolution.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::media::{ItemOptions, MediaEngine, MediaHandle, MediaId, MediaUrl, NativePlayer};
use crate::{Error, Result};

/// Build an item straight from a URL, failing with `BadUrl` if it does not parse
pub fn open_url(
    engine: &dyn MediaEngine,
    url: &MediaUrl,
    options: ItemOptions,
) -> Result<Arc<dyn NativePlayer>> {
    let parsed = url
        .to_url()
        .ok_or_else(|| Error::BadUrl(url.to_string()))?;
    Ok(engine.open(&parsed, options))
}

/// Pluggable resolver for media handles
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Engine used for URL-based resolution
    fn engine(&self) -> &dyn MediaEngine;

    fn allows_cellular_access(&self) -> bool {
        true
    }

    fn set_allows_cellular_access(&self, _allowed: bool) {}

    /// Abort any in-flight resolution; a no-op with nothing pending
    fn cancel(&self) {}

    /// Options for items this provider creates
    fn item_options(&self) -> ItemOptions {
        ItemOptions {
            allows_cellular_access: self.allows_cellular_access(),
            ..ItemOptions::default()
        }
    }

    async fn resolve_id(&self, _id: &MediaId) -> Result<Arc<dyn NativePlayer>> {
        Err(Error::NotImplemented)
    }

    async fn resolve_url(&self, url: &MediaUrl) -> Result<Arc<dyn NativePlayer>> {
        open_url(self.engine(), url, self.item_options())
    }

    async fn resolve_id_url(&self, _id: &MediaId, url: &MediaUrl) -> Result<Arc<dyn NativePlayer>> {
        open_url(self.engine(), url, self.item_options())
    }

    /// Dispatch on the handle shape
    async fn resolve(&self, handle: &MediaHandle) -> Result<Arc<dyn NativePlayer>> {
        match handle {
            MediaHandle::Id(id) => self.resolve_id(id).await,
            MediaHandle::Url(url) => self.resolve_url(url).await,
            MediaHandle::IdUrl { id, url } => self.resolve_id_url(id, url).await,
        }
    }
}

/// Provider with only the default behaviours: URLs open directly, ids are unsupported
pub struct DirectProvider {
    engine: Arc<dyn MediaEngine>,
    cellular: AtomicBool,
}

impl DirectProvider {
    pub fn new(engine: Arc<dyn MediaEngine>) -> Self {
        Self {
            engine,
            cellular: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl ResourceProvider for DirectProvider {
    fn engine(&self) -> &dyn MediaEngine {
        self.engine.as_ref()
    }

    fn allows_cellular_access(&self) -> bool {
        self.cellular.load(Ordering::Relaxed)
    }

    fn set_allows_cellular_access(&self, allowed: bool) {
        self.cellular.store(allowed, Ordering::Relaxed);
    }
}

/// Provider resolving ids through an id → URL table
pub struct CatalogProvider {
    engine: Arc<dyn MediaEngine>,
    entries: RwLock<HashMap<MediaId, MediaUrl>>,
    cellular: AtomicBool,
    generation: AtomicU64,
    lookup_delay: Duration,
}

impl CatalogProvider {
    pub fn new(engine: Arc<dyn MediaEngine>) -> Self {
        Self {
            engine,
            entries: RwLock::new(HashMap::new()),
            cellular: AtomicBool::new(true),
            generation: AtomicU64::new(0),
            lookup_delay: Duration::ZERO,
        }
    }

    /// Simulated latency of an id lookup
    pub fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = delay;
        self
    }

    pub fn insert(&self, id: impl Into<MediaId>, url: impl Into<MediaUrl>) {
        self.entries.write().insert(id.into(), url.into());
    }

    pub fn entries(&self) -> Vec<(MediaId, MediaUrl)> {
        let mut entries: Vec<_> = self
            .entries
            .read()
            .iter()
            .map(|(id, url)| (id.clone(), url.clone()))
            .collect();
        entries.sort_by(|a, b| a.0 .0.cmp(&b.0 .0));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl ResourceProvider for CatalogProvider {
    fn engine(&self) -> &dyn MediaEngine {
        self.engine.as_ref()
    }

    fn allows_cellular_access(&self) -> bool {
        self.cellular.load(Ordering::Relaxed)
    }

    fn set_allows_cellular_access(&self, allowed: bool) {
        self.cellular.store(allowed, Ordering::Relaxed);
    }

    fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    async fn resolve_id(&self, id: &MediaId) -> Result<Arc<dyn NativePlayer>> {
        let generation = self.generation.load(Ordering::SeqCst);
        if !self.lookup_delay.is_zero() {
            tokio::time::sleep(self.lookup_delay).await;
        }
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(id = %id, "Catalog lookup cancelled");
            return Err(Error::Cancelled);
        }

        let url = self
            .entries
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        open_url(self.engine.as_ref(), &url, self.item_options())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;
    use crate::sim::SimEngine;

    #[tokio::test]
    async fn test_default_id_resolution_is_not_implemented() {
        let provider = DirectProvider::new(Arc::new(SimEngine::manual()));
        let err = provider.resolve(&MediaHandle::id("movie-1")).await.unwrap_err();
        assert!(matches!(err, Error::NotImplemented));
        assert_eq!(err.code(), codes::FILE_DOES_NOT_EXIST);
    }

    #[tokio::test]
    async fn test_url_resolution() {
        let engine = Arc::new(SimEngine::manual());
        let provider = DirectProvider::new(engine.clone());

        let item = provider
            .resolve(&MediaHandle::url("https://example.com/a.mp4"))
            .await;
        tokio_test::assert_ok!(item);

        let err = provider
            .resolve(&MediaHandle::id_url("a", "::not a url::"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadUrl(_)));
        assert_eq!(engine.opened().len(), 1);
    }

    #[tokio::test]
    async fn test_cellular_flag_is_forwarded() {
        let engine = Arc::new(SimEngine::manual());
        let provider = DirectProvider::new(engine.clone());
        assert!(provider.allows_cellular_access());
        provider.set_allows_cellular_access(false);

        provider
            .resolve(&MediaHandle::url("https://example.com/a.mp4"))
            .await
            .unwrap();
        assert!(!engine.last_opened().unwrap().options().allows_cellular_access);
    }

    #[test]
    fn test_cancel_with_nothing_pending() {
        let direct = DirectProvider::new(Arc::new(SimEngine::manual()));
        direct.cancel();
        direct.cancel();

        let catalog = CatalogProvider::new(Arc::new(SimEngine::manual()));
        catalog.cancel();
        catalog.cancel();
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_catalog_lookup() {
        let catalog = CatalogProvider::new(Arc::new(SimEngine::manual()));
        catalog.insert("intro", "https://example.com/intro.mp4");

        tokio_test::assert_ok!(catalog.resolve(&MediaHandle::id("intro")).await);
        let err = catalog.resolve(&MediaHandle::id("missing")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_catalog_cancel_discards_late_lookup() {
        let catalog = Arc::new(
            CatalogProvider::new(Arc::new(SimEngine::manual()))
                .with_lookup_delay(Duration::from_millis(50)),
        );
        catalog.insert("intro", "https://example.com/intro.mp4");

        let lookup = {
            let catalog = Arc::clone(&catalog);
            tokio::spawn(async move { catalog.resolve(&MediaHandle::id("intro")).await })
        };
        tokio::task::yield_now().await;
        catalog.cancel();

        let result = lookup.await.unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
