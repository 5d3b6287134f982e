use super::ui::{self, StyleType};
use crate::core::{Currency, FactorProvider, LiveFactorProvider};
use crate::settings::MoneySettings;
use anyhow::Result;
use comfy_table::{Cell, Table};

/// One row per priced currency: its factor and its value in `base`.
pub fn rates_table(provider: &LiveFactorProvider, base: Currency) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Name"),
        ui::header_cell(&format!("{} factor", Currency::PIVOT)),
        ui::header_cell(&format!("1 unit in {base}")),
    ]);

    for (currency, factor) in provider.snapshot().iter() {
        let descriptor = currency.descriptor();
        table.add_row(vec![
            Cell::new(format!("{} {}", descriptor.iso_code, currency.symbol())),
            Cell::new(descriptor.english_name),
            ui::number_cell(factor.normalize()),
            ui::number_cell(provider.get_factor(currency, base).round_dp(6).normalize()),
        ]);
    }
    table
}

pub fn run(settings: &MoneySettings) -> Result<()> {
    let provider = settings.provider();
    println!(
        "{}",
        ui::style_text("Conversion factors", StyleType::Title)
    );
    println!("{}", rates_table(provider, settings.default_currency()));

    let updated = provider.last_updated().map_or_else(
        || "never loaded, identity factors in use".to_string(),
        |at| format!("updated {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
    );
    println!("{}", ui::style_text(&updated, StyleType::Subtle));
    Ok(())
}
