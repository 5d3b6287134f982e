//! Cache decorator for factor sources.
//!
//! Successful loads are persisted to a [`FactorCache`]; failed loads fall back to
//! whatever the cache holds, or to an identity table when it holds nothing. Cache
//! trouble never fails the load. It is reported on a notification channel instead.

use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::FactorSource;
use crate::core::{FactorTable, FxError, FxResult, LoadCallback, LoadOutcome};

/// Storage for the last good table, as an opaque blob.
///
/// Called from background tasks, so implementations must be thread safe.
pub trait FactorCache: Send + Sync {
    fn persist(&self, data: &[u8]) -> anyhow::Result<()>;

    /// `Ok(None)` when nothing has been stored yet.
    fn retrieve(&self) -> anyhow::Result<Option<Vec<u8>>>;
}

/// Cache backed by a pair of closures.
pub struct FnCache<P, R> {
    persist: P,
    retrieve: R,
}

impl<P, R> FnCache<P, R>
where
    P: Fn(&[u8]) -> anyhow::Result<()> + Send + Sync,
    R: Fn() -> anyhow::Result<Option<Vec<u8>>> + Send + Sync,
{
    pub fn new(persist: P, retrieve: R) -> Self {
        Self { persist, retrieve }
    }
}

impl<P, R> FactorCache for FnCache<P, R>
where
    P: Fn(&[u8]) -> anyhow::Result<()> + Send + Sync,
    R: Fn() -> anyhow::Result<Option<Vec<u8>>> + Send + Sync,
{
    fn persist(&self, data: &[u8]) -> anyhow::Result<()> {
        (self.persist)(data)
    }

    fn retrieve(&self) -> anyhow::Result<Option<Vec<u8>>> {
        (self.retrieve)()
    }
}

/// Cache kept in a single file.
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FactorCache for FileCache {
    fn persist(&self, data: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        std::fs::write(&self.path, data)
            .with_context(|| format!("Failed to write cache file: {}", self.path.display()))
    }

    fn retrieve(&self) -> anyhow::Result<Option<Vec<u8>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        std::fs::read(&self.path)
            .map(Some)
            .with_context(|| format!("Failed to read cache file: {}", self.path.display()))
    }
}

struct CachingInner {
    source: Arc<dyn FactorSource>,
    cache: Option<Arc<dyn FactorCache>>,
    notices: broadcast::Sender<FxError>,
}

impl CachingInner {
    fn notify(&self, error: FxError) {
        warn!(error = %error, "Factor cache notice");
        // Nobody listening is fine.
        let _ = self.notices.send(error);
    }

    fn store(&self, table: &FactorTable) {
        let Some(cache) = &self.cache else {
            return;
        };
        match cache.persist(table.to_csv().as_bytes()) {
            Ok(()) => debug!("Persisted factor table to cache"),
            Err(e) => self.notify(FxError::cache_failed(format!("{e:#}"))),
        }
    }

    fn fallback(&self, error: FxError) -> FactorTable {
        self.notify(error);

        let Some(cache) = &self.cache else {
            self.notify(FxError::cache_failed("no cache configured"));
            return FactorTable::new();
        };
        match cache.retrieve() {
            Ok(Some(data)) => {
                debug!("Serving factor table from cache");
                FactorTable::parse_csv(&data)
            }
            Ok(None) => {
                self.notify(FxError::cache_failed("there is no data in cache"));
                FactorTable::new()
            }
            Err(e) => {
                self.notify(FxError::cache_failed(format!("{e:#}")));
                FactorTable::new()
            }
        }
    }
}

/// Wraps a source with persist-on-success and fallback-on-failure.
pub struct CachingSource {
    inner: Arc<CachingInner>,
}

impl CachingSource {
    pub fn new(source: Arc<dyn FactorSource>, cache: Arc<dyn FactorCache>) -> Self {
        Self::build(source, Some(cache))
    }

    /// A decorator with no cache: failures fall back straight to the identity table.
    pub fn without_cache(source: Arc<dyn FactorSource>) -> Self {
        Self::build(source, None)
    }

    /// Binds the cache to a single file.
    pub fn with_file(source: Arc<dyn FactorSource>, path: impl Into<PathBuf>) -> Self {
        Self::new(source, Arc::new(FileCache::new(path)))
    }

    fn build(source: Arc<dyn FactorSource>, cache: Option<Arc<dyn FactorCache>>) -> Self {
        let (notices, _) = broadcast::channel(32);
        Self {
            inner: Arc::new(CachingInner {
                source,
                cache,
                notices,
            }),
        }
    }

    /// Non-fatal errors: inner load failures and cache trouble.
    pub fn subscribe(&self) -> broadcast::Receiver<FxError> {
        self.inner.notices.subscribe()
    }
}

#[async_trait]
impl FactorSource for CachingSource {
    fn name(&self) -> &str {
        self.inner.source.name()
    }

    async fn load(&self) -> FxResult<FactorTable> {
        match self.inner.source.load().await {
            Ok(table) => {
                self.inner.store(&table);
                Ok(table)
            }
            Err(FxError::Cancelled) => Err(FxError::Cancelled),
            Err(e @ (FxError::ConcurrencyViolation(_) | FxError::Disposed(_))) => Err(e),
            Err(e) => Ok(self.inner.fallback(e)),
        }
    }

    fn load_async(self: Arc<Self>, on_done: LoadCallback) -> FxResult<()> {
        let inner = Arc::clone(&self.inner);
        Arc::clone(&self.inner.source).load_async(Box::new(move |outcome| {
            let outcome = match outcome {
                LoadOutcome::Loaded(table) => {
                    inner.store(&table);
                    LoadOutcome::Loaded(table)
                }
                LoadOutcome::Failed(e) => LoadOutcome::Loaded(inner.fallback(e)),
                LoadOutcome::Cancelled => LoadOutcome::Cancelled,
            };
            on_done(outcome);
        }))
    }

    fn cancel(&self) {
        self.inner.source.cancel();
    }

    fn dispose(&self) {
        self.inner.source.dispose();
    }
}
