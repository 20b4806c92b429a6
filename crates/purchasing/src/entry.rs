//! Stock-entry form normalisation.
//!
//! Restocks are typed in whatever unit is on the delivery note (`1.5 kg`, `6 L`,
//! `24` bottles) with a cost either for the whole package or per entered unit. The
//! batch log only stores base-unit quantities and whole-line costs, so every entry
//! line is normalised here before a [`StockBatch`] is built.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockwise_core::{DomainError, DomainResult, OperatorId, SaleUnit, ShopId, ensure_non_negative};
use stockwise_inventory::{InventoryCount, InventoryCountId, InventoryCountLine};
use stockwise_products::ProductId;

use crate::batch::{StockBatch, StockBatchId, StockBatchLine};

/// Offset between a stock entry's batch and the count taken while restocking.
///
/// Movements stamped at or after a count belong to the interval that count opens;
/// the delivery is already on the counted shelf, so the batch must sort before it.
pub const COUNT_AFTER_BATCH: TimeDelta = TimeDelta::milliseconds(1);

/// Unit a quantity or a per-unit cost is entered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryUnit {
    Unit,
    Gram,
    Kilogram,
    Centiliter,
    Liter,
}

impl EntryUnit {
    /// The sale unit this entry unit measures.
    pub fn kind(self) -> SaleUnit {
        match self {
            EntryUnit::Unit => SaleUnit::Item,
            EntryUnit::Gram | EntryUnit::Kilogram => SaleUnit::Mass,
            EntryUnit::Centiliter | EntryUnit::Liter => SaleUnit::Volume,
        }
    }

    /// Base units per entered unit.
    pub fn base_units(self) -> Decimal {
        match self {
            EntryUnit::Unit | EntryUnit::Gram | EntryUnit::Centiliter => Decimal::ONE,
            EntryUnit::Kilogram => Decimal::ONE_THOUSAND,
            EntryUnit::Liter => Decimal::ONE_HUNDRED,
        }
    }
}

/// What an entered amount pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostBasis {
    /// The amount is the cost of the whole line.
    Package,
    /// The amount is a price per given unit.
    Per(EntryUnit),
}

/// Convert an entered quantity into the product's base unit.
pub fn normalize_quantity(
    sale_unit: SaleUnit,
    unit: EntryUnit,
    quantity: Decimal,
) -> DomainResult<Decimal> {
    ensure_non_negative("quantity", quantity)?;
    if unit.kind() != sale_unit {
        return Err(DomainError::validation(format!(
            "quantity entered in {unit:?} for a product sold by {sale_unit}"
        )));
    }
    Ok(quantity * unit.base_units())
}

/// Turn an entered amount into the cost of a whole line of `base_quantity` base units.
pub fn normalize_cost(
    sale_unit: SaleUnit,
    base_quantity: Decimal,
    basis: CostBasis,
    amount: Decimal,
) -> DomainResult<Decimal> {
    ensure_non_negative("amount", amount)?;
    match basis {
        CostBasis::Package => Ok(amount),
        CostBasis::Per(unit) => {
            if unit.kind() != sale_unit {
                return Err(DomainError::validation(format!(
                    "cost entered per {unit:?} for a product sold by {sale_unit}"
                )));
            }
            Ok(amount * base_quantity / unit.base_units())
        }
    }
}

/// One line of a stock-entry form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntryLine {
    pub product_id: ProductId,
    pub sale_unit: SaleUnit,
    pub quantity: Decimal,
    pub quantity_unit: EntryUnit,
    pub amount: Decimal,
    pub cost_basis: CostBasis,
    /// Stock found on the shelf before the delivery was put away, when the operator
    /// counted while restocking.
    pub counted_before: Option<(Decimal, EntryUnit)>,
}

/// A whole stock-entry form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntry {
    pub shop_id: ShopId,
    pub operator_id: OperatorId,
    pub received_at: DateTime<Utc>,
    pub lines: Vec<StockEntryLine>,
}

impl StockEntry {
    /// Build the batch, and the inventory count when any line was counted.
    ///
    /// A counted line records `counted_before + received`: the shelf after the
    /// delivery is put away. The count is stamped [`COUNT_AFTER_BATCH`] after the
    /// batch.
    pub fn into_documents(
        self,
        batch_id: StockBatchId,
        count_id: InventoryCountId,
    ) -> DomainResult<(StockBatch, Option<InventoryCount>)> {
        let mut batch_lines = Vec::with_capacity(self.lines.len());
        let mut count_lines = Vec::new();

        for line in &self.lines {
            let received = normalize_quantity(line.sale_unit, line.quantity_unit, line.quantity)?;
            let cost = normalize_cost(line.sale_unit, received, line.cost_basis, line.amount)?;
            batch_lines.push(StockBatchLine::new(line.product_id, received, cost)?);

            if let Some((counted, unit)) = line.counted_before {
                let counted = normalize_quantity(line.sale_unit, unit, counted)?;
                count_lines.push(InventoryCountLine::new(line.product_id, counted + received)?);
            }
        }

        let batch = StockBatch::new(
            batch_id,
            self.shop_id,
            self.operator_id,
            self.received_at,
            batch_lines,
        )?;

        let count = if count_lines.is_empty() {
            None
        } else {
            Some(InventoryCount::new(
                count_id,
                self.shop_id,
                self.operator_id,
                self.received_at + COUNT_AFTER_BATCH,
                count_lines,
            )?)
        };

        Ok((batch, count))
    }
}
