use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockwise_core::{
    AggregateId, DomainError, DomainResult, Entity, OperatorId, QuantityDisplay, SaleUnit, ShopId,
    ensure_non_negative,
};
use stockwise_events::Event;
use stockwise_products::ProductId;

/// Inventory count identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryCountId(pub AggregateId);

impl InventoryCountId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InventoryCountId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// One product counted during an inventory, in the product's base unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCountLine {
    product_id: ProductId,
    counted_quantity: Decimal,
}

impl InventoryCountLine {
    pub fn new(product_id: ProductId, counted_quantity: Decimal) -> DomainResult<Self> {
        ensure_non_negative("counted_quantity", counted_quantity)?;
        Ok(Self {
            product_id,
            counted_quantity,
        })
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn counted_quantity(&self) -> Decimal {
        self.counted_quantity
    }

    pub fn quantity_display(&self, unit: SaleUnit) -> QuantityDisplay {
        unit.display(self.counted_quantity)
    }
}

/// A physical count of (part of) a shop's stock, taken at one instant.
///
/// Immutable once built. A product appears at most once per count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCount {
    id: InventoryCountId,
    shop_id: ShopId,
    operator_id: OperatorId,
    counted_at: DateTime<Utc>,
    lines: Vec<InventoryCountLine>,
}

impl InventoryCount {
    pub fn new(
        id: InventoryCountId,
        shop_id: ShopId,
        operator_id: OperatorId,
        counted_at: DateTime<Utc>,
        lines: Vec<InventoryCountLine>,
    ) -> DomainResult<Self> {
        if lines.is_empty() {
            return Err(DomainError::validation("inventory count has no lines"));
        }

        let mut seen = HashSet::with_capacity(lines.len());
        for line in &lines {
            if !seen.insert(line.product_id) {
                return Err(DomainError::validation(format!(
                    "product {} counted twice in one inventory",
                    line.product_id
                )));
            }
        }

        Ok(Self {
            id,
            shop_id,
            operator_id,
            counted_at,
            lines,
        })
    }

    pub fn id_typed(&self) -> InventoryCountId {
        self.id
    }

    pub fn shop_id(&self) -> ShopId {
        self.shop_id
    }

    pub fn operator_id(&self) -> OperatorId {
        self.operator_id
    }

    pub fn counted_at(&self) -> DateTime<Utc> {
        self.counted_at
    }

    pub fn lines(&self) -> &[InventoryCountLine] {
        &self.lines
    }

    pub fn line_for(&self, product_id: ProductId) -> Option<&InventoryCountLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }
}

impl Entity for InventoryCount {
    type Id = InventoryCountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Event: InventoryCountRecorded. Published once the count's lines are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCountRecorded {
    pub count: InventoryCount,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    CountRecorded(InventoryCountRecorded),
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::CountRecorded(_) => "inventory.count.recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::CountRecorded(e) => e.occurred_at,
        }
    }
}
