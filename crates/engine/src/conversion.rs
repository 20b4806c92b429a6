//! Conversions between batch-line costs and per-large-unit prices.

use rust_decimal::Decimal;

use stockwise_core::SaleUnit;
use stockwise_purchasing::StockBatchLine;

use crate::error::EngineError;

/// Cost of one large unit (kilogram, liter, item) on a restock line.
///
/// Fails with [`EngineError::DivisionUndefined`] when the line received nothing.
pub fn unit_price(sale_unit: SaleUnit, line: &StockBatchLine) -> Result<Decimal, EngineError> {
    if line.quantity_received().is_zero() {
        return Err(EngineError::DivisionUndefined(
            "unit price of a batch line with zero quantity",
        ));
    }

    sale_unit
        .base_units_per_large_unit()
        .checked_mul(line.total_cost())
        .and_then(|cost| cost.checked_div(line.quantity_received()))
        .ok_or(EngineError::DivisionUndefined("unit price out of range"))
}

/// Price of `sale_quantity` base units at `unit_price` per large unit.
///
/// Items are priced flat. Never fails: an unpriceable line is worth `0` so that it
/// cannot block a sale.
pub fn sale_line_price(sale_unit: SaleUnit, sale_quantity: Decimal, unit_price: Decimal) -> Decimal {
    match sale_unit {
        SaleUnit::Item => unit_price,
        SaleUnit::Volume | SaleUnit::Mass => sale_quantity
            .checked_mul(unit_price)
            .and_then(|total| total.checked_div(sale_unit.base_units_per_large_unit()))
            .unwrap_or(Decimal::ZERO),
    }
}
