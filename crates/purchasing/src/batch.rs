use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockwise_core::{
    AggregateId, DomainError, DomainResult, Entity, OperatorId, ShopId, ensure_non_negative,
};
use stockwise_products::ProductId;

/// Stock batch identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockBatchId(pub AggregateId);

impl StockBatchId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for StockBatchId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// One product received in a batch.
///
/// `quantity_received` is in the product's base unit; `total_cost` is what the whole
/// line cost, not a per-unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBatchLine {
    product_id: ProductId,
    quantity_received: Decimal,
    total_cost: Decimal,
}

impl StockBatchLine {
    pub fn new(
        product_id: ProductId,
        quantity_received: Decimal,
        total_cost: Decimal,
    ) -> DomainResult<Self> {
        ensure_non_negative("quantity_received", quantity_received)?;
        ensure_non_negative("total_cost", total_cost)?;
        Ok(Self {
            product_id,
            quantity_received,
            total_cost,
        })
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity_received(&self) -> Decimal {
        self.quantity_received
    }

    pub fn total_cost(&self) -> Decimal {
        self.total_cost
    }
}

/// A purchase event: everything received for a shop at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBatch {
    id: StockBatchId,
    shop_id: ShopId,
    operator_id: OperatorId,
    received_at: DateTime<Utc>,
    lines: Vec<StockBatchLine>,
}

impl StockBatch {
    pub fn new(
        id: StockBatchId,
        shop_id: ShopId,
        operator_id: OperatorId,
        received_at: DateTime<Utc>,
        lines: Vec<StockBatchLine>,
    ) -> DomainResult<Self> {
        if lines.is_empty() {
            return Err(DomainError::validation("stock batch has no lines"));
        }
        Ok(Self {
            id,
            shop_id,
            operator_id,
            received_at,
            lines,
        })
    }

    pub fn id_typed(&self) -> StockBatchId {
        self.id
    }

    pub fn shop_id(&self) -> ShopId {
        self.shop_id
    }

    pub fn operator_id(&self) -> OperatorId {
        self.operator_id
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn lines(&self) -> &[StockBatchLine] {
        &self.lines
    }

    /// What the whole batch cost.
    pub fn total_cost(&self) -> Decimal {
        self.lines.iter().map(StockBatchLine::total_cost).sum()
    }
}

impl Entity for StockBatch {
    type Id = StockBatchId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
