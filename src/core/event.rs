//! Load outcomes and strategy notifications.

use std::time::Duration;

use super::error::{FxError, FxResult};
use super::factors::FactorTable;

/// How a non-blocking load finished.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded(FactorTable),
    Failed(FxError),
    Cancelled,
}

impl From<FxResult<FactorTable>> for LoadOutcome {
    fn from(result: FxResult<FactorTable>) -> Self {
        match result {
            Ok(table) => LoadOutcome::Loaded(table),
            Err(FxError::Cancelled) => LoadOutcome::Cancelled,
            Err(e) => LoadOutcome::Failed(e),
        }
    }
}

/// Invoked exactly once when a non-blocking load finishes.
pub type LoadCallback = Box<dyn FnOnce(LoadOutcome) + Send + 'static>;

/// Emitted by update strategies after every refresh attempt.
///
/// `delay` is the wait before the next scheduled attempt, `None` when the strategy
/// does not schedule one.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyEvent {
    Loaded { delay: Option<Duration> },
    LoadError { error: FxError, delay: Option<Duration> },
}

impl StrategyEvent {
    pub fn delay(&self) -> Option<Duration> {
        match self {
            StrategyEvent::Loaded { delay } | StrategyEvent::LoadError { delay, .. } => *delay,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, StrategyEvent::LoadError { .. })
    }
}
