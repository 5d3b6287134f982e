use super::ui::{self, StyleType};
use crate::core::{Currency, Money};
use crate::settings::MoneySettings;
use anyhow::{Context, Result};

/// Parses `input` (default currency from `settings`) and converts it to `target`.
pub fn convert(settings: &MoneySettings, input: &str, target: Currency) -> Result<(Money, Money)> {
    let money = Money::parse_with(input, settings.default_currency())
        .with_context(|| format!("Failed to parse amount '{input}'"))?;
    let converted = money
        .checked_convert_with(target, settings.provider().as_ref())
        .with_context(|| format!("Failed to convert {money} to {target}"))?;
    Ok((money, converted))
}

pub fn run(settings: &MoneySettings, input: &str, target: Currency) -> Result<()> {
    let (money, converted) = convert(settings, input, target)?;
    println!(
        "{} = {}",
        money,
        ui::style_text(&converted.to_string(), StyleType::TotalValue)
    );
    if settings.provider().last_updated().is_none() {
        println!(
            "{}",
            ui::style_text("No factors loaded, identity conversion used", StyleType::Subtle)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::OneShotStrategy;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    async fn settings() -> MoneySettings {
        let strategy = Arc::new(OneShotStrategy::fixed([
            (Currency::Eur, dec!(1.4)),
            (Currency::Jpy, dec!(1.5)),
        ]));
        MoneySettings::new(strategy, Currency::Eur).await.unwrap()
    }

    #[tokio::test]
    async fn test_convert_uses_default_currency() {
        let settings = settings().await;
        let (money, converted) = convert(&settings, "10", Currency::Usd).unwrap();
        assert_eq!(money, Money::new(dec!(10), Currency::Eur));
        assert_eq!(converted, Money::new(dec!(14.0), Currency::Usd));
    }

    #[tokio::test]
    async fn test_convert_between_priced_currencies() {
        let settings = settings().await;
        let (_, converted) = convert(&settings, "JPY 14", Currency::Eur).unwrap();
        assert_eq!(converted.currency(), Currency::Eur);
        assert_eq!(converted.rounded_amount(), dec!(15.00));
    }

    #[tokio::test]
    async fn test_convert_reports_overflow() {
        let settings = settings().await;
        let err = convert(&settings, "79228162514264337593543950335 EUR", Currency::Usd).unwrap_err();
        assert!(err.to_string().contains("Failed to convert"));
    }

    #[tokio::test]
    async fn test_convert_rejects_garbage() {
        let settings = settings().await;
        let err = convert(&settings, "ABC 12", Currency::Usd).unwrap_err();
        assert!(err.to_string().contains("Failed to parse amount"));
    }
}
