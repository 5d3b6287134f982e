//! Core money and conversion-factor abstractions

pub mod currency;
pub mod descriptor;
pub mod error;
pub mod event;
pub mod factors;
pub mod flight;
pub mod log;
pub mod money;
pub mod provider;

// Re-export main types for cleaner imports
pub use currency::Currency;
pub use descriptor::CurrencyDescriptor;
pub use error::{FxError, FxResult};
pub use event::{LoadCallback, LoadOutcome, StrategyEvent};
pub use factors::FactorTable;
pub use flight::{Flight, FlightControl};
pub use money::{IntoMoney, Money};
pub use provider::{FactorProvider, LiveFactorProvider};
