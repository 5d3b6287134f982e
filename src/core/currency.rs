//! The closed set of supported currencies.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Display;
use std::str::FromStr;

use super::error::FxError;

/// Supported currencies, in definition order.
///
/// The discriminant doubles as the dense index into a [`FactorTable`](super::FactorTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Currency {
    Unknown,
    Usd,
    Eur,
    Gbp,
    Jpy,
    Aud,
    Cad,
    Chf,
    Cny,
    Hkd,
    Inr,
    Krw,
    Mxn,
    Nzd,
    Pln,
    Rub,
    Sek,
    Sgd,
    Try,
    Uah,
    Zar,
    Brl,
    Czk,
    Dkk,
    Nok,
}

impl Currency {
    /// Number of currencies, `Unknown` included.
    pub const COUNT: usize = 25;

    /// All currencies in definition order.
    pub const ALL: [Currency; Currency::COUNT] = [
        Currency::Unknown,
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Jpy,
        Currency::Aud,
        Currency::Cad,
        Currency::Chf,
        Currency::Cny,
        Currency::Hkd,
        Currency::Inr,
        Currency::Krw,
        Currency::Mxn,
        Currency::Nzd,
        Currency::Pln,
        Currency::Rub,
        Currency::Sek,
        Currency::Sgd,
        Currency::Try,
        Currency::Uah,
        Currency::Zar,
        Currency::Brl,
        Currency::Czk,
        Currency::Dkk,
        Currency::Nok,
    ];

    /// The currency every factor is expressed against.
    pub const PIVOT: Currency = Currency::Usd;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn code(self) -> &'static str {
        match self {
            Currency::Unknown => "XXX",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Jpy => "JPY",
            Currency::Aud => "AUD",
            Currency::Cad => "CAD",
            Currency::Chf => "CHF",
            Currency::Cny => "CNY",
            Currency::Hkd => "HKD",
            Currency::Inr => "INR",
            Currency::Krw => "KRW",
            Currency::Mxn => "MXN",
            Currency::Nzd => "NZD",
            Currency::Pln => "PLN",
            Currency::Rub => "RUB",
            Currency::Sek => "SEK",
            Currency::Sgd => "SGD",
            Currency::Try => "TRY",
            Currency::Uah => "UAH",
            Currency::Zar => "ZAR",
            Currency::Brl => "BRL",
            Currency::Czk => "CZK",
            Currency::Dkk => "DKK",
            Currency::Nok => "NOK",
        }
    }

    /// Looks up a currency by ISO code, ignoring case.
    pub fn from_code(code: &str) -> Option<Currency> {
        let code = code.trim();
        Currency::ALL
            .iter()
            .copied()
            .find(|c| c.code().eq_ignore_ascii_case(code))
    }

    /// True for currencies that carry a settable factor.
    pub fn is_priced(self) -> bool {
        self != Currency::Unknown && self != Currency::PIVOT
    }

    /// Every currency except the pivot and `Unknown`.
    pub fn priced() -> impl Iterator<Item = Currency> {
        Currency::ALL.into_iter().filter(|c| c.is_priced())
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::PIVOT
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::from_code(s).ok_or_else(|| FxError::UnknownCurrency(s.trim().to_string()))
    }
}

impl Serialize for Currency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        code.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_matches_definition_order() {
        for (i, currency) in Currency::ALL.iter().enumerate() {
            assert_eq!(currency.index(), i);
        }
        assert_eq!(Currency::ALL.len(), Currency::COUNT);
    }

    #[test]
    fn test_from_code_is_case_insensitive() {
        assert_eq!(Currency::from_code("eur"), Some(Currency::Eur));
        assert_eq!(Currency::from_code(" Uah "), Some(Currency::Uah));
        assert_eq!(Currency::from_code("XXX"), Some(Currency::Unknown));
        assert_eq!(Currency::from_code("ABC"), None);
        assert!(matches!(
            "ABC".parse::<Currency>(),
            Err(FxError::UnknownCurrency(code)) if code == "ABC"
        ));
    }

    #[test]
    fn test_priced_excludes_pivot_and_unknown() {
        let priced: Vec<_> = Currency::priced().collect();
        assert_eq!(priced.len(), Currency::COUNT - 2);
        assert!(!priced.contains(&Currency::Usd));
        assert!(!priced.contains(&Currency::Unknown));
    }

    #[test]
    fn test_serde_uses_iso_code() {
        let yaml = serde_yaml::to_string(&Currency::Jpy).unwrap();
        assert_eq!(yaml.trim(), "JPY");
        let parsed: Currency = serde_yaml::from_str("chf").unwrap();
        assert_eq!(parsed, Currency::Chf);
        assert!(serde_yaml::from_str::<Currency>("QQQ").is_err());
    }
}
