use super::ui::{self, StyleType};
use crate::core::Money;
use crate::settings::MoneySettings;
use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use rust_decimal::Decimal;

/// Splits `input` by `ratios` and lays the slices out with their shares.
pub fn allocation_table(money: &Money, ratios: &[Decimal]) -> Result<Table> {
    let slices = money
        .allocate(ratios)
        .with_context(|| format!("Failed to allocate {money}"))?;
    let total: Decimal = ratios.iter().sum();

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Ratio"),
        ui::header_cell("Share"),
        ui::header_cell("Amount"),
    ]);

    for (index, (slice, ratio)) in slices.iter().zip(ratios).enumerate() {
        let share = ratio
            .checked_div(total)
            .and_then(|part| part.checked_mul(Decimal::ONE_HUNDRED))
            .map_or_else(|| "N/A".to_string(), |share| format!("{}%", share.round_dp(2)));
        table.add_row(vec![
            Cell::new(index + 1),
            ui::number_cell(ratio.normalize()),
            ui::number_cell(share),
            ui::money_cell(slice),
        ]);
    }

    let sum = slices
        .iter()
        .try_fold(Decimal::ZERO, |acc, slice| acc.checked_add(slice.amount()))
        .map(|total| Money::new(total, money.currency()))
        .with_context(|| format!("Failed to total the allocation of {money}"))?;
    table.add_row(vec![
        Cell::new(ui::style_text("Total", StyleType::TotalLabel)),
        Cell::new(""),
        Cell::new(""),
        ui::total_cell(&sum),
    ]);
    Ok(table)
}

pub fn run(settings: &MoneySettings, input: &str, ratios: &[Decimal]) -> Result<()> {
    let money = Money::parse_with(input, settings.default_currency())
        .with_context(|| format!("Failed to parse amount '{input}'"))?;
    println!(
        "{}",
        ui::style_text(&format!("Allocation of {money}"), StyleType::Title)
    );
    println!("{}", allocation_table(&money, ratios)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_allocation_table_rows_and_total() {
        let money = Money::new(dec!(100), Currency::Usd);
        let table = allocation_table(&money, &[dec!(1), dec!(1), dec!(1)]).unwrap();

        // Three slices plus the total row.
        assert_eq!(table.row_iter().count(), 4);
        let rendered = table.to_string();
        assert!(rendered.contains("33.33"));
        assert!(rendered.contains("33.34"));
        assert!(rendered.contains("100.00"));
    }

    #[test]
    fn test_allocation_rejects_zero_ratios() {
        let money = Money::new(dec!(100), Currency::Usd);
        let err = allocation_table(&money, &[dec!(0), dec!(0)]).unwrap_err();
        assert!(err.to_string().contains("Failed to allocate"));
    }
}
