//! Conversion factor tables and their row codec.

use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

use super::currency::Currency;
use super::error::{FxError, FxResult};

/// Smallest accepted factor, 1e-12.
pub const MIN_FACTOR: Decimal = Decimal::from_parts(1, 0, 0, false, 12);
/// Largest accepted factor, 1e12.
pub const MAX_FACTOR: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

/// One factor per currency, each expressed as pivot units per one unit of that currency.
///
/// The pivot and `Unknown` entries are pinned to one and every other factor lies in
/// `MIN_FACTOR..=MAX_FACTOR`, so any ratio of two factors fits a `Decimal`. Tables
/// are plain values: a clone shares nothing with the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactorTable {
    factors: [Decimal; Currency::COUNT],
}

impl FactorTable {
    /// An identity table: every factor is one.
    pub fn new() -> Self {
        Self {
            factors: [Decimal::ONE; Currency::COUNT],
        }
    }

    /// Builds a table from `(currency, factor)` pairs, skipping entries that can't be set.
    pub fn from_rates<I>(rates: I) -> Self
    where
        I: IntoIterator<Item = (Currency, Decimal)>,
    {
        let mut table = Self::new();
        for (currency, factor) in rates {
            if let Err(e) = table.set(currency, factor) {
                debug!(%currency, %factor, error = %e, "Skipping factor");
            }
        }
        table
    }

    pub fn get(&self, currency: Currency) -> Decimal {
        self.factors[currency.index()]
    }

    pub fn set(&mut self, currency: Currency, factor: Decimal) -> FxResult<()> {
        if currency == Currency::Unknown {
            return Err(FxError::InvalidArgument(
                "cannot set a factor for the unknown currency".to_string(),
            ));
        }
        if currency == Currency::PIVOT {
            return Err(FxError::InvalidArgument(format!(
                "the factor of {currency} is always 1"
            )));
        }
        if factor <= Decimal::ZERO {
            return Err(FxError::InvalidArgument(format!(
                "factor for {currency} must be greater than zero, got {factor}"
            )));
        }
        if !(MIN_FACTOR..=MAX_FACTOR).contains(&factor) {
            return Err(FxError::InvalidArgument(format!(
                "factor for {currency} must lie between {MIN_FACTOR} and {MAX_FACTOR}, got {factor}"
            )));
        }
        self.factors[currency.index()] = factor;
        Ok(())
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, currency: Currency, factor: Decimal) -> FxResult<Self> {
        self.set(currency, factor)?;
        Ok(self)
    }

    /// Factors of every priced currency, in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (Currency, Decimal)> + '_ {
        Currency::priced().map(|c| (c, self.get(c)))
    }

    pub fn is_identity(&self) -> bool {
        self.factors.iter().all(|f| *f == Decimal::ONE)
    }

    /// Reads `SYMBOL,FACTOR` rows. Malformed or unknown rows are skipped.
    pub fn parse_csv(data: &[u8]) -> Self {
        parse_rows(data, 0)
    }

    /// Writes one `SYMBOL,FACTOR` row per priced currency.
    pub fn to_csv(&self) -> String {
        self.iter()
            .map(|(currency, factor)| format!("{currency},{factor}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for FactorTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses `(symbol, factor)` rows into a table.
///
/// `suffix_len` characters are stripped from every symbol before the currency lookup;
/// rows whose symbol is not longer than the suffix are skipped. A row is kept only if
/// it names a priced currency and its factor is a positive invariant decimal.
pub(crate) fn parse_rows(data: &[u8], suffix_len: usize) -> FactorTable {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let mut table = FactorTable::new();
    let mut accepted = 0usize;

    for record in reader.records() {
        let Ok(record) = record else {
            continue;
        };
        let (Some(symbol), Some(raw_factor)) = (record.get(0), record.get(1)) else {
            continue;
        };
        let Some(currency) = strip_suffix(symbol, suffix_len).and_then(Currency::from_code) else {
            continue;
        };
        if !currency.is_priced() {
            continue;
        }
        let Some(factor) = parse_invariant_decimal(raw_factor) else {
            continue;
        };
        if table.set(currency, factor).is_ok() {
            accepted += 1;
        }
    }

    debug!(accepted, "Parsed factor rows");
    table
}

fn strip_suffix(symbol: &str, suffix_len: usize) -> Option<&str> {
    if suffix_len == 0 {
        return Some(symbol);
    }
    let char_count = symbol.chars().count();
    if char_count <= suffix_len {
        return None;
    }
    let split = symbol
        .char_indices()
        .nth(char_count - suffix_len)
        .map(|(i, _)| i)?;
    Some(&symbol[..split])
}

/// Parses a decimal with `.` as separator and optional `,` grouping.
pub(crate) fn parse_invariant_decimal(text: &str) -> Option<Decimal> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}
