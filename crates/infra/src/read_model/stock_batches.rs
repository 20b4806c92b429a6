use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use stockwise_engine::{BatchLineRecord, StockBatchLog, Window};
use stockwise_products::ProductId;
use stockwise_purchasing::StockBatch;

#[derive(Debug, Default)]
struct BatchIndex {
    per_product: HashMap<ProductId, Vec<BatchLineRecord>>,
    next_sequence: u64,
}

fn sort_key(record: &BatchLineRecord) -> (DateTime<Utc>, u64) {
    (record.received_at, record.sequence)
}

/// In-memory restock history for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryStockBatchLog {
    inner: RwLock<BatchIndex>,
}

impl InMemoryStockBatchLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store every line of `batch`. Returns the sequence assigned to the batch.
    pub fn append(&self, batch: &StockBatch) -> u64 {
        let mut index = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let sequence = index.next_sequence;
        index.next_sequence += 1;

        for line in batch.lines() {
            let record = BatchLineRecord {
                batch_id: batch.id_typed(),
                received_at: batch.received_at(),
                sequence,
                line: line.clone(),
            };
            let log = index.per_product.entry(line.product_id()).or_default();
            match log.last() {
                Some(last) if sort_key(last) > sort_key(&record) => {
                    let at = log.partition_point(|r| sort_key(r) <= sort_key(&record));
                    log.insert(at, record);
                }
                _ => log.push(record),
            }
        }

        sequence
    }

    /// Number of batch lines stored for `product_id`.
    pub fn len(&self, product_id: ProductId) -> usize {
        let index = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        index.per_product.get(&product_id).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        let index = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        index.per_product.is_empty()
    }
}

impl StockBatchLog for InMemoryStockBatchLog {
    fn latest_line(&self, product_id: ProductId) -> Option<BatchLineRecord> {
        let index = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        index.per_product.get(&product_id)?.last().cloned()
    }

    fn received_in(&self, product_id: ProductId, window: Window) -> Decimal {
        let index = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let Some(log) = index.per_product.get(&product_id) else {
            return Decimal::ZERO;
        };

        let start = window.since.map_or(0, |since| log.partition_point(|r| r.received_at < since));
        let end = window
            .until
            .map_or(log.len(), |until| log.partition_point(|r| r.received_at < until));
        log[start..end.max(start)]
            .iter()
            .map(|r| r.line.quantity_received())
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }
}
