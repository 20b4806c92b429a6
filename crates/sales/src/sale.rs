use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockwise_core::{
    AggregateId, DomainError, DomainResult, Entity, OperatorId, ShopId, ensure_non_negative,
};
use stockwise_products::ProductId;

/// Sale identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaleId(pub AggregateId);

impl SaleId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SaleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// The shop module a sale went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SaleModule {
    /// Customer served themselves at a self-service terminal.
    SelfSale { shop_id: ShopId },
    /// An operator rang the sale up for a customer.
    OperatorSale {
        shop_id: ShopId,
        operator_id: OperatorId,
    },
}

impl SaleModule {
    pub fn shop_id(&self) -> ShopId {
        match self {
            SaleModule::SelfSale { shop_id } => *shop_id,
            SaleModule::OperatorSale { shop_id, .. } => *shop_id,
        }
    }

    pub fn operator_id(&self) -> Option<OperatorId> {
        match self {
            SaleModule::SelfSale { .. } => None,
            SaleModule::OperatorSale { operator_id, .. } => Some(*operator_id),
        }
    }
}

/// One product sold, in the product's base unit, and what was charged for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    product_id: ProductId,
    quantity: Decimal,
    price: Decimal,
}

impl SaleLine {
    pub fn new(product_id: ProductId, quantity: Decimal, price: Decimal) -> DomainResult<Self> {
        ensure_non_negative("quantity", quantity)?;
        ensure_non_negative("price", price)?;
        Ok(Self {
            product_id,
            quantity,
            price,
        })
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn price(&self) -> Decimal {
        self.price
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    id: SaleId,
    module: SaleModule,
    sold_at: DateTime<Utc>,
    lines: Vec<SaleLine>,
}

impl Sale {
    pub fn new(
        id: SaleId,
        module: SaleModule,
        sold_at: DateTime<Utc>,
        lines: Vec<SaleLine>,
    ) -> DomainResult<Self> {
        if lines.is_empty() {
            return Err(DomainError::validation("sale has no lines"));
        }
        Ok(Self {
            id,
            module,
            sold_at,
            lines,
        })
    }

    pub fn id_typed(&self) -> SaleId {
        self.id
    }

    pub fn module(&self) -> SaleModule {
        self.module
    }

    pub fn sold_at(&self) -> DateTime<Utc> {
        self.sold_at
    }

    pub fn lines(&self) -> &[SaleLine] {
        &self.lines
    }

    /// What the customer paid in total.
    pub fn amount(&self) -> Decimal {
        self.lines.iter().map(SaleLine::price).sum()
    }
}

impl Entity for Sale {
    type Id = SaleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
