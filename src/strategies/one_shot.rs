use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, broadcast};
use tracing::{info, warn};

use super::{EventBus, UpdateStrategy};
use crate::core::{Currency, FactorTable, FxError, FxResult, LiveFactorProvider, StrategyEvent};
use crate::sources::{FactorSource, FixedSource};

/// Loads when asked and never in the background.
pub struct OneShotStrategy {
    source: Arc<dyn FactorSource>,
    provider: Mutex<Option<Arc<LiveFactorProvider>>>,
    events: EventBus,
    disposed: AtomicBool,
}

impl OneShotStrategy {
    pub fn new(source: Arc<dyn FactorSource>) -> Self {
        Self {
            source,
            provider: Mutex::new(None),
            events: EventBus::new(),
            disposed: AtomicBool::new(false),
        }
    }

    /// Serves preset rates. Pivot, unknown and non-positive entries are dropped.
    pub fn fixed<I>(rates: I) -> Self
    where
        I: IntoIterator<Item = (Currency, Decimal)>,
    {
        Self::new(Arc::new(FixedSource::new(FactorTable::from_rates(rates))))
    }

    fn check_disposed(&self) -> FxResult<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(FxError::Disposed("OneShotStrategy"));
        }
        Ok(())
    }

    async fn refresh(&self, provider: &LiveFactorProvider) -> FxResult<()> {
        match self.source.load().await {
            Ok(table) => {
                provider.update(table);
                self.events.publish(StrategyEvent::Loaded { delay: None });
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "One-shot factor load failed");
                self.events.publish(StrategyEvent::LoadError {
                    error: e.clone(),
                    delay: None,
                });
                Err(e)
            }
        }
    }
}

#[async_trait]
impl UpdateStrategy for OneShotStrategy {
    async fn create_and_init_provider(&self) -> FxResult<Arc<LiveFactorProvider>> {
        self.check_disposed()?;
        let mut slot = self.provider.lock().await;
        if let Some(provider) = slot.as_ref() {
            return Ok(Arc::clone(provider));
        }

        let provider = Arc::new(LiveFactorProvider::identity());
        // Reported as an event; the caller still gets a usable provider.
        let _ = self.refresh(&provider).await;
        *slot = Some(Arc::clone(&provider));
        Ok(provider)
    }

    async fn force_update(&self) -> FxResult<()> {
        self.check_disposed()?;
        let provider = {
            let mut slot = self.provider.lock().await;
            Arc::clone(slot.get_or_insert_with(|| Arc::new(LiveFactorProvider::identity())))
        };
        self.refresh(&provider).await
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.source.dispose();
        info!("One-shot strategy disposed");
    }

    fn subscribe(&self) -> broadcast::Receiver<StrategyEvent> {
        self.events.subscribe()
    }
}

impl Drop for OneShotStrategy {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FactorProvider;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_fixed_rates_filter_invalid_entries() {
        let strategy = OneShotStrategy::fixed([
            (Currency::Eur, dec!(1.4)),
            (Currency::Usd, dec!(3)),
            (Currency::Unknown, dec!(3)),
            (Currency::Gbp, dec!(-1)),
        ]);
        let provider = strategy.create_and_init_provider().await.unwrap();
        let table = provider.snapshot();

        assert_eq!(table.get(Currency::Eur), dec!(1.4));
        assert_eq!(table.get(Currency::Gbp), Decimal::ONE);
        assert_eq!(provider.get_factor(Currency::Eur, Currency::Usd), dec!(1.4));
    }

    #[tokio::test]
    async fn test_init_is_idempotent_and_force_reloads() {
        let source = Arc::new(FixedSource::new(FactorTable::from_rates([(
            Currency::Eur,
            dec!(1.4),
        )])));
        let strategy = OneShotStrategy::new(Arc::clone(&source) as Arc<dyn FactorSource>);
        let mut events = strategy.subscribe();

        let first = strategy.create_and_init_provider().await.unwrap();
        let second = strategy.create_and_init_provider().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(events.try_recv().unwrap(), StrategyEvent::Loaded { delay: None });
        assert!(events.try_recv().is_err());

        source.set_table(FactorTable::from_rates([(Currency::Eur, dec!(1.5))]));
        strategy.force_update().await.unwrap();
        assert_eq!(first.snapshot().get(Currency::Eur), dec!(1.5));
    }

    #[tokio::test]
    async fn test_failed_init_yields_identity_provider() {
        let strategy = OneShotStrategy::new(Arc::new(FixedSource::failing("offline")));
        let mut events = strategy.subscribe();

        let provider = strategy.create_and_init_provider().await.unwrap();
        assert!(provider.snapshot().is_identity());
        assert!(events.try_recv().unwrap().is_error());

        assert_eq!(
            strategy.force_update().await,
            Err(FxError::Source("offline".into()))
        );
    }

    #[tokio::test]
    async fn test_disposed_strategy_refuses_work() {
        let strategy = OneShotStrategy::fixed(std::iter::empty());
        strategy.dispose();
        strategy.dispose();
        assert!(matches!(
            strategy.create_and_init_provider().await,
            Err(FxError::Disposed(_))
        ));
        assert!(matches!(
            strategy.force_update().await,
            Err(FxError::Disposed(_))
        ));
    }
}
