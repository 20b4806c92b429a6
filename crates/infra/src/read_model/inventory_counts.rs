use std::sync::{PoisonError, RwLock};

use stockwise_engine::InventoryCountLog;
use stockwise_inventory::{CountEntry, CountHistory, CountSpan, InventoryCount, InventoryCountId};
use stockwise_products::ProductId;

/// In-memory count history for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryInventoryCountLog {
    inner: RwLock<CountHistory>,
}

impl InMemoryInventoryCountLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store every line of `count`. Returns the sequence assigned to the count.
    pub fn record(&self, count: &InventoryCount) -> u64 {
        let mut history = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        history.record(count)
    }

    pub fn len(&self, product_id: ProductId) -> usize {
        let history = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        history.len(product_id)
    }

    pub fn is_empty(&self) -> bool {
        let history = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        history.is_empty()
    }
}

impl InventoryCountLog for InMemoryInventoryCountLog {
    fn nth_most_recent(&self, product_id: ProductId, n: usize) -> Option<CountEntry> {
        let history = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        history.nth_most_recent(product_id, n).copied()
    }

    fn span_closed_by(&self, product_id: ProductId, count_id: InventoryCountId) -> Option<CountSpan> {
        let history = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        history.span_closed_by(product_id, count_id)
    }
}
