use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::watcher::FileWatcher;
use super::{EventBus, UpdateStrategy};
use crate::core::{FxError, FxResult, LiveFactorProvider, StrategyEvent};
use crate::sources::{FactorSource, FileSource};

struct Shared {
    source: Arc<dyn FactorSource>,
    provider: Arc<LiveFactorProvider>,
    events: EventBus,
    disposed: AtomicBool,
}

impl Shared {
    async fn refresh(&self) -> FxResult<()> {
        match self.source.load().await {
            Ok(table) => {
                self.provider.update(table);
                if !self.disposed.load(Ordering::Acquire) {
                    self.events.publish(StrategyEvent::Loaded { delay: None });
                }
                Ok(())
            }
            Err(e) => {
                if !self.disposed.load(Ordering::Acquire) {
                    warn!(error = %e, "Factor reload after file change failed");
                    self.events.publish(StrategyEvent::LoadError {
                        error: e.clone(),
                        delay: None,
                    });
                }
                Err(e)
            }
        }
    }
}

struct Watching {
    _watcher: FileWatcher,
    pump: JoinHandle<()>,
}

/// Reloads whenever the watched file changes on disk.
///
/// Events carry no delay since nothing is scheduled.
pub struct FileWatchStrategy {
    shared: Arc<Shared>,
    path: PathBuf,
    poll: Duration,
    initialized: tokio::sync::Mutex<bool>,
    watching: Mutex<Option<Watching>>,
}

impl FileWatchStrategy {
    pub const DEFAULT_POLL: Duration = Duration::from_secs(1);

    /// Watches `path` and reads it with a [`FileSource`].
    pub fn new(path: impl Into<PathBuf>, poll: Duration) -> Self {
        let path = path.into();
        Self::with_source(Arc::new(FileSource::new(path.clone())), path, poll)
    }

    /// Watches `path` but loads through `source`, for instance a cache-wrapped one.
    pub fn with_source(source: Arc<dyn FactorSource>, path: impl Into<PathBuf>, poll: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                provider: Arc::new(LiveFactorProvider::identity()),
                events: EventBus::new(),
                disposed: AtomicBool::new(false),
            }),
            path: path.into(),
            poll,
            initialized: tokio::sync::Mutex::new(false),
            watching: Mutex::new(None),
        }
    }

    fn check_disposed(&self) -> FxResult<()> {
        if self.shared.disposed.load(Ordering::Acquire) {
            return Err(FxError::Disposed("FileWatchStrategy"));
        }
        Ok(())
    }
}

#[async_trait]
impl UpdateStrategy for FileWatchStrategy {
    async fn create_and_init_provider(&self) -> FxResult<Arc<LiveFactorProvider>> {
        self.check_disposed()?;
        let mut initialized = self.initialized.lock().await;
        if !*initialized {
            // Set only once the pump is stored; a dropped future leaves it unset.
            let (watcher, mut changes) = FileWatcher::spawn(&self.path, self.poll);
            let _ = self.shared.refresh().await;

            let shared = Arc::clone(&self.shared);
            let pump = tokio::spawn(async move {
                while changes.recv().await.is_some() {
                    let _ = shared.refresh().await;
                }
            });
            let mut watching = self.watching.lock().unwrap_or_else(PoisonError::into_inner);
            if self.shared.disposed.load(Ordering::Acquire) {
                pump.abort();
            } else {
                *watching = Some(Watching {
                    _watcher: watcher,
                    pump,
                });
                info!(path = %self.path.display(), "Watching factor file");
            }
            *initialized = true;
        }
        Ok(Arc::clone(&self.shared.provider))
    }

    async fn force_update(&self) -> FxResult<()> {
        self.check_disposed()?;
        self.shared.refresh().await
    }

    fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let watching = self.watching.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(watching) = watching {
            watching.pump.abort();
        }
        self.shared.source.cancel();
        self.shared.source.dispose();
        info!("File watch strategy disposed");
    }

    fn subscribe(&self) -> broadcast::Receiver<StrategyEvent> {
        self.shared.events.subscribe()
    }
}

impl Drop for FileWatchStrategy {
    fn drop(&mut self) {
        self.dispose();
    }
}
