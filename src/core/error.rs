//! Error types shared by the factor sources, strategies and money values.

use thiserror::Error;

/// Errors raised while loading conversion factors or handling money values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FxError {
    /// The source could not fetch or decode a factor table.
    #[error("Factor source error: {0}")]
    Source(String),

    /// Persisting to or reading from the factor cache failed.
    #[error("Factor cache error: {0}")]
    Cache(String),

    /// A second load was started while one was still outstanding.
    #[error("Source '{0}' already has a load in flight")]
    ConcurrencyViolation(String),

    /// The load was cancelled before it completed.
    #[error("Load cancelled")]
    Cancelled,

    /// Input could not be read as a money value.
    #[error("Invalid money format: {0}")]
    Format(String),

    /// The currency token is not a known code or symbol.
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    /// An argument violated a precondition.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The object was used after teardown.
    #[error("{0} has been disposed")]
    Disposed(&'static str),
}

impl FxError {
    pub fn load_failed(err: impl std::fmt::Display) -> Self {
        FxError::Source(err.to_string())
    }

    pub fn cache_failed(err: impl std::fmt::Display) -> Self {
        FxError::Cache(err.to_string())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FxError::Cancelled)
    }
}

/// Result type for factor and money operations.
pub type FxResult<T> = Result<T, FxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FxError::ConcurrencyViolation("remote".into()).to_string(),
            "Source 'remote' already has a load in flight"
        );
        assert_eq!(
            FxError::Disposed("ScheduledStrategy").to_string(),
            "ScheduledStrategy has been disposed"
        );
        assert_eq!(
            FxError::load_failed("HTTP error: 500").to_string(),
            "Factor source error: HTTP error: 500"
        );
        assert!(FxError::Cancelled.is_cancelled());
        assert!(!FxError::cache_failed("disk full").is_cancelled());
    }
}
