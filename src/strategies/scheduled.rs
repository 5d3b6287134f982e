//! Timer-driven refresh with a caller-supplied backoff policy.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{EventBus, UpdateStrategy};
use crate::core::{FxError, FxResult, LiveFactorProvider, LoadOutcome, StrategyEvent};
use crate::sources::FactorSource;

/// Maps "was the last load successful" to the next delay in milliseconds.
pub type Backoff = Arc<dyn Fn(bool) -> u64 + Send + Sync>;

/// Shortest wait between two scheduled refreshes.
pub const MIN_DELAY: Duration = Duration::from_millis(100);

struct Shared {
    source: Arc<dyn FactorSource>,
    backoff: Backoff,
    provider: Arc<LiveFactorProvider>,
    events: EventBus,
    disposed: AtomicBool,
    initialized: tokio::sync::Mutex<bool>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Shared {
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn next_delay(&self, succeeded: bool) -> Duration {
        Duration::from_millis((self.backoff)(succeeded)).max(MIN_DELAY)
    }

    fn disarm(&self) {
        if let Some(handle) = self.timer.lock().unwrap_or_else(PoisonError::into_inner).take() {
            handle.abort();
        }
    }

    /// Replaces any pending timer with one firing after `delay`.
    fn arm(self: &Arc<Self>, delay: Duration) {
        let mut slot = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_disposed() {
            return;
        }
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        let shared = Arc::clone(self);
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            shared.tick();
        }));
        debug!(?delay, "Next factor refresh armed");
    }

    /// Starts a background load; its outcome is handled in [`finish`](Self::finish).
    fn tick(self: &Arc<Self>) {
        if self.is_disposed() {
            return;
        }
        let shared = Arc::clone(self);
        let started = Arc::clone(&self.source)
            .load_async(Box::new(move |outcome| shared.finish(outcome)));
        if let Err(e) = started {
            self.fail(e);
        }
    }

    fn finish(self: &Arc<Self>, outcome: LoadOutcome) {
        if self.is_disposed() {
            return;
        }
        match outcome {
            LoadOutcome::Loaded(table) => {
                self.provider.update(table);
                self.succeed();
            }
            LoadOutcome::Failed(e) => self.fail(e),
            LoadOutcome::Cancelled => self.fail(FxError::Cancelled),
        }
    }

    fn succeed(self: &Arc<Self>) {
        if self.is_disposed() {
            return;
        }
        let delay = self.next_delay(true);
        self.events.publish(StrategyEvent::Loaded { delay: Some(delay) });
        self.arm(delay);
    }

    fn fail(self: &Arc<Self>, error: FxError) {
        if self.is_disposed() {
            return;
        }
        let delay = self.next_delay(false);
        warn!(error = %error, ?delay, "Factor refresh failed");
        self.events.publish(StrategyEvent::LoadError {
            error,
            delay: Some(delay),
        });
        self.arm(delay);
    }
}

/// Refreshes on a timer whose interval follows a backoff policy.
///
/// After every attempt a [`StrategyEvent`] carrying the chosen delay is published,
/// then the next timer is armed. Only one timer is ever pending.
pub struct ScheduledStrategy {
    shared: Arc<Shared>,
}

impl ScheduledStrategy {
    pub fn new<F>(source: Arc<dyn FactorSource>, backoff: F) -> Self
    where
        F: Fn(bool) -> u64 + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                source,
                backoff: Arc::new(backoff),
                provider: Arc::new(LiveFactorProvider::identity()),
                events: EventBus::new(),
                disposed: AtomicBool::new(false),
                initialized: tokio::sync::Mutex::new(false),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Fixed intervals for the success and failure branches.
    pub fn with_intervals(source: Arc<dyn FactorSource>, success: Duration, failure: Duration) -> Self {
        let (success, failure) = (millis(success), millis(failure));
        Self::new(source, move |ok| if ok { success } else { failure })
    }

    fn check_disposed(&self) -> FxResult<()> {
        if self.shared.is_disposed() {
            return Err(FxError::Disposed("ScheduledStrategy"));
        }
        Ok(())
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl UpdateStrategy for ScheduledStrategy {
    async fn create_and_init_provider(&self) -> FxResult<Arc<LiveFactorProvider>> {
        self.check_disposed()?;
        let mut initialized = self.shared.initialized.lock().await;
        if !*initialized {
            // Set only after the first load settled; a dropped future leaves it unset.
            match self.shared.source.load().await {
                Ok(table) => {
                    self.shared.provider.update(table);
                    self.shared.succeed();
                }
                Err(FxError::Cancelled) if self.shared.is_disposed() => {}
                Err(e) => self.shared.fail(e),
            }
            *initialized = true;
            info!("Scheduled strategy initialized");
        }
        Ok(Arc::clone(&self.shared.provider))
    }

    async fn force_update(&self) -> FxResult<()> {
        self.check_disposed()?;
        self.shared.disarm();
        self.shared.tick();
        Ok(())
    }

    fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shared.disarm();
        self.shared.source.cancel();
        self.shared.source.dispose();
        info!("Scheduled strategy disposed");
    }

    fn subscribe(&self) -> broadcast::Receiver<StrategyEvent> {
        self.shared.events.subscribe()
    }
}

impl Drop for ScheduledStrategy {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Currency, FactorTable};
    use crate::sources::FixedSource;
    use rust_decimal_macros::dec;

    fn eur(rate: rust_decimal::Decimal) -> FactorTable {
        FactorTable::from_rates([(Currency::Eur, rate)])
    }

    #[tokio::test(start_paused = true)]
    async fn test_delays_follow_backoff_with_floor() {
        let source = Arc::new(FixedSource::new(eur(dec!(1.4))));
        let strategy = ScheduledStrategy::new(
            Arc::clone(&source) as Arc<dyn FactorSource>,
            |ok| if ok { 20 } else { 250 },
        );
        let mut events = strategy.subscribe();

        let provider = strategy.create_and_init_provider().await.unwrap();
        assert_eq!(provider.snapshot().get(Currency::Eur), dec!(1.4));
        assert_eq!(
            events.recv().await.unwrap(),
            StrategyEvent::Loaded { delay: Some(MIN_DELAY) }
        );

        source.set_failure(Some("offline".into()));
        let event = events.recv().await.unwrap();
        assert!(event.is_error());
        assert_eq!(event.delay(), Some(Duration::from_millis(250)));

        source.set_failure(None);
        source.set_table(eur(dec!(1.5)));
        assert!(!events.recv().await.unwrap().is_error());
        assert_eq!(provider.snapshot().get(Currency::Eur), dec!(1.5));

        strategy.dispose();
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_init_reuses_provider_without_loading() {
        let source = Arc::new(FixedSource::new(eur(dec!(1.4))));
        let strategy = ScheduledStrategy::with_intervals(
            Arc::clone(&source) as Arc<dyn FactorSource>,
            Duration::from_secs(3600),
            Duration::from_secs(3600),
        );
        let mut events = strategy.subscribe();

        let first = strategy.create_and_init_provider().await.unwrap();
        events.recv().await.unwrap();

        source.set_table(eur(dec!(2)));
        let second = strategy.create_and_init_provider().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.snapshot().get(Currency::Eur), dec!(1.4));
        assert!(events.try_recv().is_err());

        strategy.dispose();
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_init_is_retried_and_schedules() {
        let source = Arc::new(FixedSource::new(eur(dec!(1.4))).with_latency(Duration::from_secs(10)));
        let strategy = ScheduledStrategy::new(Arc::clone(&source) as Arc<dyn FactorSource>, |_| 100);
        let mut events = strategy.subscribe();

        let abandoned =
            tokio::time::timeout(Duration::from_secs(1), strategy.create_and_init_provider()).await;
        assert!(abandoned.is_err());
        assert!(events.try_recv().is_err());

        let provider = strategy.create_and_init_provider().await.unwrap();
        assert_eq!(provider.snapshot().get(Currency::Eur), dec!(1.4));
        assert_eq!(
            events.recv().await.unwrap(),
            StrategyEvent::Loaded { delay: Some(MIN_DELAY) }
        );

        source.set_table(eur(dec!(1.5)));
        let next = tokio::time::timeout(Duration::from_secs(120), events.recv())
            .await
            .expect("timer should be armed after the retried init")
            .unwrap();
        assert!(!next.is_error());
        assert_eq!(provider.snapshot().get(Currency::Eur), dec!(1.5));

        strategy.dispose();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_init_still_returns_provider() {
        let strategy = ScheduledStrategy::with_intervals(
            Arc::new(FixedSource::failing("offline")),
            Duration::from_secs(3600),
            Duration::from_secs(60),
        );
        let mut events = strategy.subscribe();

        let provider = strategy.create_and_init_provider().await.unwrap();
        assert!(provider.snapshot().is_identity());
        assert_eq!(
            events.recv().await.unwrap(),
            StrategyEvent::LoadError {
                error: FxError::Source("offline".into()),
                delay: Some(Duration::from_secs(60)),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_update_refreshes_before_schedule() {
        let source = Arc::new(FixedSource::new(eur(dec!(1.4))));
        let strategy = ScheduledStrategy::with_intervals(
            Arc::clone(&source) as Arc<dyn FactorSource>,
            Duration::from_secs(3600),
            Duration::from_secs(3600),
        );
        let mut events = strategy.subscribe();
        let provider = strategy.create_and_init_provider().await.unwrap();
        events.recv().await.unwrap();

        source.set_table(eur(dec!(2)));
        strategy.force_update().await.unwrap();
        assert!(!events.recv().await.unwrap().is_error());
        assert_eq!(provider.snapshot().get(Currency::Eur), dec!(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_stops_refreshes() {
        let source = Arc::new(FixedSource::new(eur(dec!(1.4))).with_latency(Duration::from_secs(1)));
        let strategy = ScheduledStrategy::new(Arc::clone(&source) as Arc<dyn FactorSource>, |_| 100);
        let mut events = strategy.subscribe();
        strategy.create_and_init_provider().await.unwrap();
        events.recv().await.unwrap();

        strategy.force_update().await.unwrap();
        strategy.dispose();
        strategy.dispose();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(events.try_recv().is_err());
        assert!(matches!(strategy.force_update().await, Err(FxError::Disposed(_))));
        assert!(matches!(
            strategy.create_and_init_provider().await,
            Err(FxError::Disposed(_))
        ));
    }
}
