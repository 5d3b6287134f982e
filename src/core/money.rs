//! Currency-aware money values.
//!
//! Cross-currency operations always convert the right-hand value into the
//! left-hand value's currency first. The `*_with` variants take the factor
//! provider explicitly; the others resolve it from [`crate::settings`].

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::ops::{Add, Mul, Sub};
use std::str::FromStr;

use super::currency::Currency;
use super::descriptor::CurrencyDescriptor;
use super::error::{FxError, FxResult};
use super::factors::parse_invariant_decimal;
use super::provider::FactorProvider;
use crate::settings;

/// Rendering used by `Display`: rounded amount and ISO code.
pub const DEFAULT_FORMAT: &str = "{0} {2}";

/// An exact decimal amount in one currency.
///
/// Equality compares amount and currency without any conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

fn round_to(amount: Decimal, digits: u32) -> Decimal {
    amount.round_dp_with_strategy(digits, RoundingStrategy::MidpointNearestEven)
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn from_i64(amount: i64, currency: Currency) -> Self {
        Self::new(Decimal::from(amount), currency)
    }

    /// Converts through the shortest decimal representation of `amount`.
    pub fn from_f64(amount: f64, currency: Currency) -> FxResult<Self> {
        Decimal::from_f64(amount)
            .map(|amount| Self::new(amount, currency))
            .ok_or_else(|| {
                FxError::InvalidArgument(format!("{amount} is not representable as a decimal"))
            })
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// An amount in the process-wide default currency.
    pub fn in_default_currency(amount: Decimal) -> Self {
        Self::new(amount, settings::current().default_currency())
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn descriptor(&self) -> &'static CurrencyDescriptor {
        self.currency.descriptor()
    }

    /// The amount rounded half-to-even to the currency's decimal digits.
    pub fn rounded_amount(&self) -> Decimal {
        round_to(self.amount, self.currency.decimal_digits())
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    pub fn abs(&self) -> Self {
        Self::new(self.amount.abs(), self.currency)
    }

    // Conversion

    /// Re-expresses this value in `target`. Same-currency conversion returns `self` untouched.
    ///
    /// # Panics
    ///
    /// When the converted amount does not fit a `Decimal`. See
    /// [`checked_convert_with`](Self::checked_convert_with).
    pub fn convert_with(&self, target: Currency, provider: &dyn FactorProvider) -> Money {
        if self.currency == target {
            return *self;
        }
        Money::new(self.amount * provider.get_factor(self.currency, target), target)
    }

    /// [`convert_with`](Self::convert_with), failing with `InvalidArgument` on overflow.
    pub fn checked_convert_with(
        &self,
        target: Currency,
        provider: &dyn FactorProvider,
    ) -> FxResult<Money> {
        if self.currency == target {
            return Ok(*self);
        }
        self.amount
            .checked_mul(provider.get_factor(self.currency, target))
            .map(|amount| Money::new(amount, target))
            .ok_or_else(|| FxError::InvalidArgument(format!("{self} overflows in {target}")))
    }

    pub fn convert_to(&self, target: Currency) -> Money {
        if self.currency == target {
            return *self;
        }
        self.convert_with(target, settings::current().provider().as_ref())
    }

    pub fn to_dollars(&self) -> Money {
        self.convert_to(Currency::Usd)
    }

    pub fn to_euros(&self) -> Money {
        self.convert_to(Currency::Eur)
    }

    pub fn to_pounds(&self) -> Money {
        self.convert_to(Currency::Gbp)
    }

    pub fn to_yens(&self) -> Money {
        self.convert_to(Currency::Jpy)
    }

    pub fn to_swiss_francs(&self) -> Money {
        self.convert_to(Currency::Chf)
    }

    pub fn to_rubles(&self) -> Money {
        self.convert_to(Currency::Rub)
    }

    pub fn to_hryvnias(&self) -> Money {
        self.convert_to(Currency::Uah)
    }

    // Arithmetic
    //
    // The unchecked forms panic on `Decimal` overflow, like `Decimal`'s own operators.

    pub fn plus_with(&self, other: &Money, provider: &dyn FactorProvider) -> Money {
        let other = other.convert_with(self.currency, provider);
        Money::new(self.amount + other.amount, self.currency)
    }

    pub fn minus_with(&self, other: &Money, provider: &dyn FactorProvider) -> Money {
        let other = other.convert_with(self.currency, provider);
        Money::new(self.amount - other.amount, self.currency)
    }

    pub fn plus(&self, other: &Money) -> Money {
        Money::new(self.amount + other.convert_to(self.currency).amount, self.currency)
    }

    pub fn minus(&self, other: &Money) -> Money {
        Money::new(self.amount - other.convert_to(self.currency).amount, self.currency)
    }

    pub fn checked_plus_with(
        &self,
        other: &Money,
        provider: &dyn FactorProvider,
    ) -> FxResult<Money> {
        let other = other.checked_convert_with(self.currency, provider)?;
        self.amount
            .checked_add(other.amount)
            .map(|amount| Money::new(amount, self.currency))
            .ok_or_else(|| FxError::InvalidArgument(format!("{self} plus {other} overflows")))
    }

    pub fn checked_minus_with(
        &self,
        other: &Money,
        provider: &dyn FactorProvider,
    ) -> FxResult<Money> {
        let other = other.checked_convert_with(self.currency, provider)?;
        self.amount
            .checked_sub(other.amount)
            .map(|amount| Money::new(amount, self.currency))
            .ok_or_else(|| FxError::InvalidArgument(format!("{self} minus {other} overflows")))
    }

    pub fn checked_mul(&self, factor: Decimal) -> FxResult<Money> {
        self.amount
            .checked_mul(factor)
            .map(|amount| Money::new(amount, self.currency))
            .ok_or_else(|| FxError::InvalidArgument(format!("{self} times {factor} overflows")))
    }

    pub fn checked_div(&self, divisor: Decimal) -> FxResult<Money> {
        self.amount
            .checked_div(divisor)
            .map(|amount| Money::new(amount, self.currency))
            .ok_or_else(|| FxError::InvalidArgument(format!("cannot divide {self} by {divisor}")))
    }

    pub fn checked_rem(&self, divisor: Decimal) -> FxResult<Money> {
        self.amount
            .checked_rem(divisor)
            .map(|amount| Money::new(amount, self.currency))
            .ok_or_else(|| {
                FxError::InvalidArgument(format!("cannot take {self} modulo {divisor}"))
            })
    }

    // Comparison

    /// Orders by amount after converting `other` into this value's currency.
    pub fn compare_with(&self, other: &Money, provider: &dyn FactorProvider) -> Ordering {
        self.amount.cmp(&other.convert_with(self.currency, provider).amount)
    }

    pub fn compare(&self, other: &Money) -> Ordering {
        self.amount.cmp(&other.convert_to(self.currency).amount)
    }

    // Allocation

    /// Splits the amount proportionally to `ratios`.
    ///
    /// Every slice but the last is rounded to the currency's decimal digits; the
    /// last one takes the exact remainder, so the slices always sum to the original.
    pub fn allocate(&self, ratios: &[Decimal]) -> FxResult<Vec<Money>> {
        let digits = self.currency.decimal_digits();
        self.allocate_with(ratios, |share, _| round_to(share, digits), |rest, _| rest)
    }

    /// [`allocate`](Self::allocate) with custom rounding.
    ///
    /// `round` gets the exact share and the slice index for every slice but the
    /// last. `correct_last` gets the leftover amount and the slices computed so far.
    pub fn allocate_with<R, C>(
        &self,
        ratios: &[Decimal],
        round: R,
        correct_last: C,
    ) -> FxResult<Vec<Money>>
    where
        R: Fn(Decimal, usize) -> Decimal,
        C: Fn(Decimal, &[Money]) -> Decimal,
    {
        let Some((_, leading)) = ratios.split_last() else {
            return Err(FxError::InvalidArgument(
                "allocation needs at least one ratio".to_string(),
            ));
        };
        let overflow = || FxError::InvalidArgument(format!("allocating {self} overflows"));
        let total = ratios
            .iter()
            .try_fold(Decimal::ZERO, |sum, ratio| sum.checked_add(*ratio))
            .ok_or_else(overflow)?;
        if total.is_zero() {
            return Err(FxError::InvalidArgument(
                "allocation ratios sum to zero".to_string(),
            ));
        }

        let mut slices = Vec::with_capacity(ratios.len());
        let mut remainder = self.amount;
        for (index, ratio) in leading.iter().enumerate() {
            let share = self
                .amount
                .checked_mul(*ratio)
                .and_then(|scaled| scaled.checked_div(total))
                .ok_or_else(overflow)?;
            let amount = round(share, index);
            remainder = remainder.checked_sub(amount).ok_or_else(overflow)?;
            slices.push(Money::new(amount, self.currency));
        }
        let last = correct_last(remainder, &slices);
        slices.push(Money::new(last, self.currency));
        Ok(slices)
    }

    // Parsing

    /// Parses text such as `"18 EUR"`, `"eur 13"`, `"$13"` or `"13"`.
    ///
    /// The currency is a leading or trailing ISO code or symbol; without one,
    /// `default` applies. The amount uses `.` as decimal separator and is rounded to
    /// the currency's decimal digits.
    pub fn parse_with(input: &str, default: Currency) -> FxResult<Money> {
        let (amount, currency) = split_money(input, default)?;
        Ok(Money::new(round_to(amount, currency.decimal_digits()), currency))
    }

    /// [`parse_with`](Self::parse_with) using the process-wide default currency.
    pub fn parse(input: &str) -> FxResult<Money> {
        Money::parse_with(input, settings::current().default_currency())
    }

    pub fn try_parse(input: &str) -> Option<Money> {
        Money::parse(input).ok()
    }

    // Formatting

    /// Substitutes positional tokens in `pattern`:
    /// `{0}` rounded amount, `{1}` raw amount, `{2}` ISO code, `{3}` symbol,
    /// `{4}` English name, `{5}` native name. Other text is copied as is.
    pub fn format(&self, pattern: &str) -> String {
        let descriptor = self.descriptor();
        let mut out = String::with_capacity(pattern.len() + 16);
        let mut rest = pattern;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            let token = tail.get(..3).filter(|t| t.ends_with('}'));
            let value = match token {
                Some("{0}") => Some(self.display_amount()),
                Some("{1}") => Some(self.amount.to_string()),
                Some("{2}") => Some(descriptor.iso_code.to_string()),
                Some("{3}") => Some(descriptor.symbol.to_string()),
                Some("{4}") => Some(descriptor.english_name.to_string()),
                Some("{5}") => Some(descriptor.native_name.to_string()),
                _ => None,
            };
            match value {
                Some(value) => {
                    out.push_str(&value);
                    rest = &tail[3..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn display_amount(&self) -> String {
        let digits = self.currency.decimal_digits();
        let mut rounded = self.rounded_amount();
        rounded.rescale(digits);
        rounded.to_string()
    }
}

/// Separates the currency token from the amount.
fn split_money(input: &str, default: Currency) -> FxResult<(Decimal, Currency)> {
    let text = input.trim();
    if text.is_empty() {
        return Err(FxError::Format("empty input".to_string()));
    }

    let is_token = |c: char| {
        !(c.is_ascii_digit() || c.is_whitespace() || matches!(c, '-' | '+' | '.' | ','))
    };

    let lead_end = text
        .char_indices()
        .find(|(_, c)| !is_token(*c))
        .map_or(text.len(), |(i, _)| i);
    let (token, number) = if lead_end > 0 {
        (Some(&text[..lead_end]), &text[lead_end..])
    } else {
        let trail_start = text
            .char_indices()
            .rev()
            .find(|(_, c)| !is_token(*c))
            .map_or(0, |(i, c)| i + c.len_utf8());
        if trail_start < text.len() {
            (Some(&text[trail_start..]), &text[..trail_start])
        } else {
            (None, text)
        }
    };

    let currency = match token {
        Some(token) => resolve_currency(token, default)?,
        None => default,
    };

    let number = number.trim();
    if number.is_empty() {
        return Err(FxError::Format(format!("no amount in '{input}'")));
    }
    let amount = parse_invariant_decimal(number)
        .ok_or_else(|| FxError::Format(format!("'{number}' is not a decimal amount")))?;
    Ok((amount, currency))
}

fn resolve_currency(token: &str, default: Currency) -> FxResult<Currency> {
    Currency::from_code(token)
        .or_else(|| CurrencyDescriptor::find_by_symbol(token, default))
        .ok_or_else(|| FxError::UnknownCurrency(token.to_string()))
}

impl Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(DEFAULT_FORMAT))
    }
}

impl FromStr for Money {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse(s)
    }
}

impl Add<Decimal> for Money {
    type Output = Money;

    fn add(self, rhs: Decimal) -> Money {
        Money::new(self.amount + rhs, self.currency)
    }
}

impl Sub<Decimal> for Money {
    type Output = Money;

    fn sub(self, rhs: Decimal) -> Money {
        Money::new(self.amount - rhs, self.currency)
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, rhs: Decimal) -> Money {
        Money::new(self.amount * rhs, self.currency)
    }
}

// Serialized as "{raw amount} {ISO}" so no precision is lost.
impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{} {}", self.amount, self.currency))
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let (amount, currency) =
            split_money(&text, Currency::PIVOT).map_err(serde::de::Error::custom)?;
        Ok(Money::new(amount, currency))
    }
}

/// Shorthand constructors, e.g. `dec!(5).euros()` or `12i64.dollars()`.
pub trait IntoMoney: Sized {
    fn into_money(self, currency: Currency) -> Money;

    fn dollars(self) -> Money {
        self.into_money(Currency::Usd)
    }

    fn euros(self) -> Money {
        self.into_money(Currency::Eur)
    }

    fn pounds(self) -> Money {
        self.into_money(Currency::Gbp)
    }

    fn yens(self) -> Money {
        self.into_money(Currency::Jpy)
    }

    fn swiss_francs(self) -> Money {
        self.into_money(Currency::Chf)
    }

    fn rubles(self) -> Money {
        self.into_money(Currency::Rub)
    }

    fn hryvnias(self) -> Money {
        self.into_money(Currency::Uah)
    }
}

impl IntoMoney for Decimal {
    fn into_money(self, currency: Currency) -> Money {
        Money::new(self, currency)
    }
}

impl IntoMoney for i64 {
    fn into_money(self, currency: Currency) -> Money {
        Money::from_i64(self, currency)
    }
}

impl IntoMoney for i32 {
    fn into_money(self, currency: Currency) -> Money {
        Money::from_i64(self.into(), currency)
    }
}
