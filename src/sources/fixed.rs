use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::FactorSource;
use crate::core::{FactorTable, FlightControl, FxError, FxResult, LoadCallback};

#[derive(Debug, Clone)]
struct FixedState {
    table: FactorTable,
    failure: Option<String>,
    latency: Duration,
}

/// Serves a preset table, or a preset failure.
///
/// Useful for offline setups and for exercising strategies and the cache decorator.
pub struct FixedSource {
    state: Mutex<FixedState>,
    flight: FlightControl,
}

impl FixedSource {
    pub fn new(table: FactorTable) -> Self {
        Self {
            state: Mutex::new(FixedState {
                table,
                failure: None,
                latency: Duration::ZERO,
            }),
            flight: FlightControl::new("fixed"),
        }
    }

    /// A source whose every load fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        let source = Self::new(FactorTable::new());
        source.set_failure(Some(message.into()));
        source
    }

    /// Delays every load by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state().latency = latency;
        self
    }

    pub fn set_table(&self, table: FactorTable) {
        self.state().table = table;
    }

    pub fn set_failure(&self, failure: Option<String>) {
        self.state().failure = failure;
    }

    fn state(&self) -> MutexGuard<'_, FixedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn produce(&self) -> FxResult<FactorTable> {
        let FixedState {
            table,
            failure,
            latency,
        } = self.state().clone();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match failure {
            Some(message) => Err(FxError::load_failed(message)),
            None => Ok(table),
        }
    }
}

#[async_trait]
impl FactorSource for FixedSource {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn load(&self) -> FxResult<FactorTable> {
        let flight = self.flight.begin()?;
        flight.run(self.produce()).await
    }

    fn load_async(self: Arc<Self>, on_done: LoadCallback) -> FxResult<()> {
        let flight = self.flight.begin()?;
        flight.spawn(async move { self.produce().await }, on_done)
    }

    fn cancel(&self) {
        self.flight.cancel();
    }

    fn dispose(&self) {
        self.flight.dispose();
    }
}
