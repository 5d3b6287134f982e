//! Factor sources: where fresh conversion factors come from.

pub mod caching;
pub mod file;
pub mod fixed;
pub mod remote;

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::{FactorTable, FxResult, LoadCallback};

pub use caching::{CachingSource, FactorCache, FileCache, FnCache};
pub use file::FileSource;
pub use fixed::FixedSource;
pub use remote::RemoteSource;

/// Produces fresh factor tables.
///
/// A source admits one outstanding load at a time; starting another one while a
/// load is in flight fails with `ConcurrencyViolation`.
#[async_trait]
pub trait FactorSource: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Loads a table, resolving once the source has answered.
    async fn load(&self) -> FxResult<FactorTable>;

    /// Starts a load in the background. `on_done` runs exactly once.
    ///
    /// Errors are returned only when the load could not be started.
    fn load_async(self: Arc<Self>, on_done: LoadCallback) -> FxResult<()>;

    /// Cancels the outstanding load, if any.
    fn cancel(&self);

    /// Cancels any outstanding load and releases the source. Idempotent.
    fn dispose(&self);
}
