//! Exercises the process-wide settings. Kept to a single test so nothing else in
//! this binary races on the global slot.

use fxmoney::config::AppConfig;
use fxmoney::core::{Currency, IntoMoney, Money};
use fxmoney::settings;
use rust_decimal_macros::dec;
use std::cmp::Ordering;
use std::sync::Arc;

#[test_log::test(tokio::test)]
async fn test_ambient_operations_follow_installed_settings() {
    // Nothing installed yet: identity factors and a USD default.
    assert_eq!(Money::parse("13").unwrap(), dec!(13).dollars());
    assert_eq!(Money::in_default_currency(dec!(2)), dec!(2).dollars());
    assert_eq!(dec!(5).euros().to_dollars(), dec!(5).dollars());

    let config: AppConfig = serde_yaml::from_str(
        r#"
default_currency: UAH
source:
  kind: fixed
  rates:
    EUR: 1.4
    JPY: 1.5
    UAH: 0.2
refresh:
  mode: one_shot
"#,
    )
    .unwrap();
    settings::install(Arc::new(config.build_settings().await.unwrap()));

    assert_eq!(Money::parse("13").unwrap(), Money::new(dec!(13), Currency::Uah));
    assert_eq!(Money::in_default_currency(dec!(4.5)), dec!(4.5).hryvnias());
    assert_eq!("18 EUR".parse::<Money>().unwrap(), dec!(18).euros());

    assert_eq!(dec!(1).euros().to_dollars(), dec!(1.4).dollars());
    assert_eq!(dec!(7).hryvnias().to_euros().rounded_amount(), dec!(1.00));
    assert_eq!(dec!(10).dollars().to_hryvnias(), dec!(50).hryvnias());

    let sum = dec!(1).euros().plus(&dec!(0.6).dollars());
    assert_eq!(sum.to_dollars().rounded_amount(), dec!(2.00));
    assert_eq!(dec!(2).dollars().compare(&dec!(1).euros()), Ordering::Greater);

    settings::reset();
    assert_eq!(settings::current().default_currency(), Currency::Usd);
    assert_eq!(dec!(1).euros().to_dollars(), dec!(1).dollars());
}
