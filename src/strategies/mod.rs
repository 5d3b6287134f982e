//! Update strategies decide when factor tables are refreshed.

pub mod file_watch;
pub mod one_shot;
pub mod scheduled;
pub mod watcher;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::core::{FxResult, LiveFactorProvider, StrategyEvent};

pub use file_watch::FileWatchStrategy;
pub use one_shot::OneShotStrategy;
pub use scheduled::{Backoff, ScheduledStrategy};

/// Owns a provider and the source feeding it.
#[async_trait]
pub trait UpdateStrategy: Send + Sync {
    /// Returns the provider, loading it the first time.
    ///
    /// A failed first load still yields a provider (holding the identity table)
    /// and is reported as a load-error event.
    async fn create_and_init_provider(&self) -> FxResult<Arc<LiveFactorProvider>>;

    /// Refreshes outside the regular schedule.
    async fn force_update(&self) -> FxResult<()>;

    /// Stops all refresh activity and releases the source. Idempotent.
    fn dispose(&self);

    /// Events for every refresh attempt from now on.
    fn subscribe(&self) -> broadcast::Receiver<StrategyEvent>;
}

/// Fans strategy events out to every subscriber.
#[derive(Debug, Clone)]
pub(crate) struct EventBus {
    sender: broadcast::Sender<StrategyEvent>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        let (sender, _receiver) = broadcast::channel(64);
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<StrategyEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn publish(&self, event: StrategyEvent) {
        // Lagging or absent listeners never block a refresh.
        let _ = self.sender.send(event);
    }
}
