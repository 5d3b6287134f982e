//! Process-wide money settings.
//!
//! Holds the active update strategy, its provider and the default currency used by
//! the ambient [`Money`](crate::core::Money) operations. Code that can pass a
//! provider explicitly should prefer the `*_with` operations instead.
//!
//! Until [`install`] is called, [`current`] serves identity factors in the pivot
//! currency.

use arc_swap::ArcSwapOption;
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::{Currency, FxResult, LiveFactorProvider};
use crate::strategies::{OneShotStrategy, UpdateStrategy};

static ACTIVE: ArcSwapOption<MoneySettings> = ArcSwapOption::const_empty();

/// An initialized strategy, its provider and the default currency.
pub struct MoneySettings {
    strategy: Arc<dyn UpdateStrategy>,
    provider: Arc<LiveFactorProvider>,
    default_currency: Currency,
}

impl MoneySettings {
    /// Initializes `strategy` and binds its provider.
    pub async fn new(strategy: Arc<dyn UpdateStrategy>, default_currency: Currency) -> FxResult<Self> {
        let provider = strategy.create_and_init_provider().await?;
        Ok(Self {
            strategy,
            provider,
            default_currency,
        })
    }

    /// Settings that never convert: identity factors, pivot as default currency.
    pub fn identity() -> Self {
        Self {
            strategy: Arc::new(OneShotStrategy::fixed(std::iter::empty())),
            provider: Arc::new(LiveFactorProvider::identity()),
            default_currency: Currency::PIVOT,
        }
    }

    pub fn strategy(&self) -> &Arc<dyn UpdateStrategy> {
        &self.strategy
    }

    pub fn provider(&self) -> &Arc<LiveFactorProvider> {
        &self.provider
    }

    pub fn default_currency(&self) -> Currency {
        self.default_currency
    }
}

/// The active settings, falling back to [`MoneySettings::identity`].
pub fn current() -> Arc<MoneySettings> {
    if let Some(active) = ACTIVE.load_full() {
        return active;
    }
    let identity = Arc::new(MoneySettings::identity());
    let previous =
        ACTIVE.compare_and_swap(&None::<Arc<MoneySettings>>, Some(Arc::clone(&identity)));
    match &*previous {
        // Lost the race to a concurrent install or another fallback.
        Some(active) => Arc::clone(active),
        None => {
            debug!("No money settings installed, using identity factors");
            identity
        }
    }
}

/// Makes `settings` the active ones. The previously active strategy is disposed.
pub fn install(settings: Arc<MoneySettings>) {
    let previous = ACTIVE.swap(Some(Arc::clone(&settings)));
    if let Some(previous) = previous {
        if !Arc::ptr_eq(&previous, &settings) {
            previous.strategy.dispose();
        }
    }
    info!(default_currency = %settings.default_currency, "Money settings installed");
}

/// Drops the active settings and disposes their strategy.
pub fn reset() {
    if let Some(previous) = ACTIVE.swap(None) {
        previous.strategy.dispose();
    }
}
