//! Holder of the current factor table.

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

use super::currency::Currency;
use super::factors::FactorTable;

/// Answers conversion-factor queries.
pub trait FactorProvider: Send + Sync {
    /// Multiplier turning an amount in `base` into an amount in `target`.
    fn get_factor(&self, base: Currency, target: Currency) -> Decimal;
}

/// Installed table plus the moment it was installed.
#[derive(Debug, Clone)]
struct Snapshot {
    table: FactorTable,
    updated: Option<DateTime<Utc>>,
}

/// Provider whose table is replaced wholesale on every refresh.
///
/// Readers load the current snapshot without locking; [`update`](Self::update)
/// publishes a fresh one with a single pointer swap.
#[derive(Debug)]
pub struct LiveFactorProvider {
    current: ArcSwap<Snapshot>,
}

impl LiveFactorProvider {
    pub fn new(table: FactorTable) -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot {
                table,
                updated: Some(Utc::now()),
            }),
        }
    }

    /// A provider that has never seen real rates.
    pub fn identity() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot {
                table: FactorTable::new(),
                updated: None,
            }),
        }
    }

    pub fn update(&self, table: FactorTable) {
        self.current.store(Arc::new(Snapshot {
            table,
            updated: Some(Utc::now()),
        }));
        info!("Installed new factor table");
    }

    /// An independent copy of the current table.
    pub fn snapshot(&self) -> FactorTable {
        self.current.load().table
    }

    /// When the current table was installed, `None` if it never was.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.current.load().updated
    }
}

impl Default for LiveFactorProvider {
    fn default() -> Self {
        Self::identity()
    }
}

impl FactorProvider for LiveFactorProvider {
    fn get_factor(&self, base: Currency, target: Currency) -> Decimal {
        factor_between(&self.current.load().table, base, target)
    }
}

impl FactorProvider for FactorTable {
    fn get_factor(&self, base: Currency, target: Currency) -> Decimal {
        factor_between(self, base, target)
    }
}

fn factor_between(table: &FactorTable, base: Currency, target: Currency) -> Decimal {
    if base == Currency::Unknown || target == Currency::Unknown || base == target {
        return Decimal::ONE;
    }
    if target == Currency::PIVOT {
        return table.get(base);
    }
    // Bounded factors keep the quotient within range.
    table.get(base) / table.get(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn sample_table() -> FactorTable {
        FactorTable::from_rates([
            (Currency::Eur, dec!(1.4)),
            (Currency::Jpy, dec!(1.5)),
            (Currency::Uah, dec!(0.2)),
            (Currency::Rub, dec!(0.11)),
            (Currency::Chf, dec!(2)),
        ])
    }

    #[test]
    fn test_factor_direction() {
        let provider = LiveFactorProvider::new(sample_table());
        assert_eq!(provider.get_factor(Currency::Eur, Currency::Usd), dec!(1.4));
        assert_eq!(provider.get_factor(Currency::Usd, Currency::Chf), dec!(0.5));
        assert_eq!(provider.get_factor(Currency::Eur, Currency::Uah), dec!(7));
        assert_eq!(provider.get_factor(Currency::Chf, Currency::Chf), Decimal::ONE);
    }

    #[test]
    fn test_unknown_is_identity() {
        let provider = LiveFactorProvider::new(sample_table());
        for currency in Currency::ALL {
            assert_eq!(provider.get_factor(currency, Currency::Unknown), Decimal::ONE);
            assert_eq!(provider.get_factor(Currency::Unknown, currency), Decimal::ONE);
        }
    }

    #[test]
    fn test_update_swaps_snapshot() {
        let provider = LiveFactorProvider::identity();
        assert!(provider.last_updated().is_none());
        assert!(provider.snapshot().is_identity());

        let before = provider.snapshot();
        provider.update(sample_table());

        assert!(before.is_identity());
        assert_eq!(provider.snapshot(), sample_table());
        assert!(provider.last_updated().is_some());
    }

    #[test]
    fn test_extreme_factors_stay_in_range() {
        use crate::core::factors::{MAX_FACTOR, MIN_FACTOR};

        let table = FactorTable::from_rates([(Currency::Eur, MAX_FACTOR), (Currency::Jpy, MIN_FACTOR)]);
        assert_eq!(
            table.get_factor(Currency::Eur, Currency::Jpy),
            dec!(1000000000000000000000000)
        );
        assert_eq!(
            table.get_factor(Currency::Jpy, Currency::Eur),
            dec!(0.000000000000000000000001)
        );

        let hostile = FactorTable::parse_csv(
            b"EUR,79228162514264337593543950335\nJPY,0.0000000000000000000000000001\n",
        );
        assert_eq!(hostile.get_factor(Currency::Eur, Currency::Jpy), Decimal::ONE);
    }

    #[test]
    fn test_table_is_a_provider() {
        let table = sample_table();
        assert_eq!(table.get_factor(Currency::Uah, Currency::Usd), dec!(0.2));
    }

    proptest! {
        #[test]
        fn prop_factors_are_reciprocal(
            a in 0..Currency::COUNT,
            b in 0..Currency::COUNT,
            fa in 1u32..100_000,
            fb in 1u32..100_000,
        ) {
            let (a, b) = (Currency::ALL[a], Currency::ALL[b]);
            let mut table = FactorTable::new();
            let _ = table.set(a, Decimal::new(fa.into(), 3));
            let _ = table.set(b, Decimal::new(fb.into(), 3));

            let product = table.get_factor(a, b) * table.get_factor(b, a);
            prop_assert!((product - Decimal::ONE).abs() < dec!(0.000000000001));
            prop_assert_eq!(table.get_factor(a, a), Decimal::ONE);
        }
    }
}
