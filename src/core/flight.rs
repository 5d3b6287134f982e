//! Single-flight and cancellation control for factor sources.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::{FxError, FxResult};
use super::event::{LoadCallback, LoadOutcome};
use super::factors::FactorTable;

#[derive(Debug)]
struct FlightState {
    name: String,
    busy: AtomicBool,
    disposed: AtomicBool,
    token: Mutex<Option<CancellationToken>>,
}

/// Admits at most one outstanding load per source.
///
/// Clones share state, so a source can hand one to a spawned task.
#[derive(Debug, Clone)]
pub struct FlightControl {
    state: Arc<FlightState>,
}

impl FlightControl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            state: Arc::new(FlightState {
                name: name.into(),
                busy: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
                token: Mutex::new(None),
            }),
        }
    }

    /// Claims the source for one load.
    pub fn begin(&self) -> FxResult<Flight> {
        if self.is_disposed() {
            return Err(FxError::Disposed("Factor source"));
        }
        if self
            .state
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(FxError::ConcurrencyViolation(self.state.name.clone()));
        }

        let token = CancellationToken::new();
        *self.slot() = Some(token.clone());
        // dispose() may have run between the check above and publishing the token
        if self.is_disposed() {
            token.cancel();
        }
        debug!(source = %self.state.name, "Load started");
        Ok(Flight {
            state: Arc::clone(&self.state),
            token,
        })
    }

    /// Cancels the outstanding load, if any.
    pub fn cancel(&self) {
        if let Some(token) = self.slot().as_ref() {
            debug!(source = %self.state.name, "Cancelling load");
            token.cancel();
        }
    }

    /// Cancels the outstanding load and refuses new ones. Idempotent.
    pub fn dispose(&self) {
        if !self.state.disposed.swap(true, Ordering::AcqRel) {
            self.cancel();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.state.disposed.load(Ordering::Acquire)
    }

    pub fn is_busy(&self) -> bool {
        self.state.busy.load(Ordering::Acquire)
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.state.token.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A claimed load. Dropping it frees the source for the next one.
#[derive(Debug)]
pub struct Flight {
    state: Arc<FlightState>,
    token: CancellationToken,
}

impl Flight {
    /// Drives `fut`, reporting [`FxError::Cancelled`] once the flight is cancelled.
    pub async fn run<T, F>(&self, fut: F) -> FxResult<T>
    where
        F: Future<Output = FxResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(FxError::Cancelled),
            result = fut => {
                if self.token.is_cancelled() {
                    Err(FxError::Cancelled)
                } else {
                    result
                }
            }
        }
    }

    /// Runs `fut` on the current runtime and hands the outcome to `on_done`.
    ///
    /// The flight is released before `on_done` runs, so the callback may start
    /// another load on the same source.
    pub fn spawn<F>(self, fut: F, on_done: LoadCallback) -> FxResult<()>
    where
        F: Future<Output = FxResult<FactorTable>> + Send + 'static,
    {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| FxError::load_failed(format!("no async runtime: {e}")))?;
        handle.spawn(async move {
            let result = self.run(fut).await;
            drop(self);
            on_done(LoadOutcome::from(result));
        });
        Ok(())
    }
}

impl Drop for Flight {
    fn drop(&mut self) {
        let mut slot = self.state.token.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
        drop(slot);
        self.state.busy.store(false, Ordering::Release);
        debug!(source = %self.state.name, "Load finished");
    }
}
