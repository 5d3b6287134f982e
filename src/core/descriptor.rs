//! Display metadata for currencies.
//!
//! Used only for rounding and formatting money values, never for conversion.

use super::currency::Currency;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyDescriptor {
    pub currency: Currency,
    pub iso_code: &'static str,
    pub symbol: &'static str,
    pub english_name: &'static str,
    pub native_name: &'static str,
    pub decimal_digits: u32,
    pub decimal_separator: char,
    pub group_separator: char,
}

const fn descriptor(
    currency: Currency,
    iso_code: &'static str,
    symbol: &'static str,
    english_name: &'static str,
    native_name: &'static str,
    decimal_digits: u32,
    decimal_separator: char,
    group_separator: char,
) -> CurrencyDescriptor {
    CurrencyDescriptor {
        currency,
        iso_code,
        symbol,
        english_name,
        native_name,
        decimal_digits,
        decimal_separator,
        group_separator,
    }
}

// Indexed by `Currency::index()`.
static DESCRIPTORS: [CurrencyDescriptor; Currency::COUNT] = [
    descriptor(Currency::Unknown, "XXX", "¤", "Unknown", "Unknown", 2, '.', ','),
    descriptor(Currency::Usd, "USD", "$", "US Dollar", "US Dollar", 2, '.', ','),
    descriptor(Currency::Eur, "EUR", "€", "Euro", "Euro", 2, ',', '.'),
    descriptor(Currency::Gbp, "GBP", "£", "UK Pound Sterling", "Pound Sterling", 2, '.', ','),
    descriptor(Currency::Jpy, "JPY", "¥", "Japanese Yen", "円", 0, '.', ','),
    descriptor(Currency::Aud, "AUD", "A$", "Australian Dollar", "Australian Dollar", 2, '.', ','),
    descriptor(Currency::Cad, "CAD", "C$", "Canadian Dollar", "Canadian Dollar", 2, '.', ','),
    descriptor(Currency::Chf, "CHF", "Fr", "Swiss Franc", "Schweizer Franken", 2, '.', '\''),
    descriptor(Currency::Cny, "CNY", "CN¥", "PRC Yuan Renminbi", "人民币", 2, '.', ','),
    descriptor(Currency::Hkd, "HKD", "HK$", "Hong Kong Dollar", "港元", 2, '.', ','),
    descriptor(Currency::Inr, "INR", "₹", "Indian Rupee", "भारतीय रुपया", 2, '.', ','),
    descriptor(Currency::Krw, "KRW", "₩", "Korean Won", "원", 0, '.', ','),
    descriptor(Currency::Mxn, "MXN", "Mex$", "Mexican Peso", "Peso", 2, '.', ','),
    descriptor(Currency::Nzd, "NZD", "NZ$", "New Zealand Dollar", "New Zealand Dollar", 2, '.', ','),
    descriptor(Currency::Pln, "PLN", "zł", "Polish Zloty", "Złoty", 2, ',', ' '),
    descriptor(Currency::Rub, "RUB", "₽", "Russian Ruble", "российский рубль", 2, ',', ' '),
    descriptor(Currency::Sek, "SEK", "kr", "Swedish Krona", "Svensk krona", 2, ',', ' '),
    descriptor(Currency::Sgd, "SGD", "S$", "Singapore Dollar", "Singapore Dollar", 2, '.', ','),
    descriptor(Currency::Try, "TRY", "₺", "Turkish Lira", "Türk Lirası", 2, ',', '.'),
    descriptor(Currency::Uah, "UAH", "₴", "Ukrainian Hryvnia", "українська гривня", 2, ',', ' '),
    descriptor(Currency::Zar, "ZAR", "R", "South African Rand", "Rand", 2, ',', ' '),
    descriptor(Currency::Brl, "BRL", "R$", "Real", "Real", 2, ',', '.'),
    descriptor(Currency::Czk, "CZK", "Kč", "Czech Koruna", "Koruna Česká", 2, ',', ' '),
    descriptor(Currency::Dkk, "DKK", "Dkr", "Danish Krone", "Dansk krone", 2, ',', '.'),
    descriptor(Currency::Nok, "NOK", "Nkr", "Norwegian Krone", "Norsk krone", 2, ',', ' '),
];

impl CurrencyDescriptor {
    pub fn of(currency: Currency) -> &'static CurrencyDescriptor {
        &DESCRIPTORS[currency.index()]
    }

    pub fn all() -> &'static [CurrencyDescriptor] {
        &DESCRIPTORS
    }

    /// Resolves a display symbol to a currency.
    ///
    /// Symbols shared by several currencies resolve to `preferred` when it is one of
    /// them, otherwise to the first match in definition order.
    pub fn find_by_symbol(symbol: &str, preferred: Currency) -> Option<Currency> {
        if CurrencyDescriptor::of(preferred).symbol == symbol {
            return Some(preferred);
        }
        DESCRIPTORS
            .iter()
            .skip(1)
            .find(|d| d.symbol == symbol)
            .map(|d| d.currency)
    }
}

impl Currency {
    pub fn descriptor(self) -> &'static CurrencyDescriptor {
        CurrencyDescriptor::of(self)
    }

    pub fn decimal_digits(self) -> u32 {
        self.descriptor().decimal_digits
    }

    pub fn symbol(self) -> &'static str {
        self.descriptor().symbol
    }
}
