use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use stockwise_engine::{SaleLineSource, Window};
use stockwise_products::ProductId;
use stockwise_sales::{Sale, SaleModule};

#[derive(Debug, Clone, Copy)]
struct SoldQuantity {
    sold_at: DateTime<Utc>,
    sequence: u64,
    quantity: Decimal,
}

#[derive(Debug, Default)]
struct SalesIndex {
    per_product: HashMap<ProductId, Vec<SoldQuantity>>,
    next_sequence: u64,
    amounts: Vec<(SaleModule, Decimal)>,
}

/// In-memory record of registered sales for tests/dev.
#[derive(Debug, Default)]
pub struct InMemorySalesLedger {
    inner: RwLock<SalesIndex>,
}

impl InMemorySalesLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, sale: &Sale) {
        let mut index = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let sequence = index.next_sequence;
        index.next_sequence += 1;

        for line in sale.lines() {
            let sold = SoldQuantity {
                sold_at: sale.sold_at(),
                sequence,
                quantity: line.quantity(),
            };
            let log = index.per_product.entry(line.product_id()).or_default();
            match log.last() {
                Some(last) if (last.sold_at, last.sequence) > (sold.sold_at, sold.sequence) => {
                    let at = log.partition_point(|s| s.sold_at <= sold.sold_at);
                    log.insert(at, sold);
                }
                _ => log.push(sold),
            }
        }
        index.amounts.push((sale.module(), sale.amount()));
    }

    /// What was taken through `module`, across all recorded sales.
    pub fn takings(&self, module: SaleModule) -> Decimal {
        let index = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        index
            .amounts
            .iter()
            .filter(|(m, _)| *m == module)
            .map(|(_, amount)| *amount)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }
}

impl SaleLineSource for InMemorySalesLedger {
    fn sold_in(&self, product_id: ProductId, window: Window) -> Decimal {
        let index = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let Some(log) = index.per_product.get(&product_id) else {
            return Decimal::ZERO;
        };

        let start = window.since.map_or(0, |since| log.partition_point(|s| s.sold_at < since));
        let end = window
            .until
            .map_or(log.len(), |until| log.partition_point(|s| s.sold_at < until));
        log[start..end.max(start)]
            .iter()
            .map(|s| s.quantity)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }
}
