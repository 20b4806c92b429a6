//! Per-product ordered count history.
//!
//! Counts are kept sorted per product by `(counted_at, sequence)`, where `sequence`
//! is the insertion order across the whole history. Rank lookups ("n-th most recent
//! count") index directly from the end of the product's log.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use stockwise_products::ProductId;

use crate::count::{InventoryCount, InventoryCountId};

/// One product's line of one count, as stored in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountEntry {
    pub count_id: InventoryCountId,
    pub counted_at: DateTime<Utc>,
    pub sequence: u64,
    pub counted_quantity: Decimal,
}

impl CountEntry {
    fn sort_key(&self) -> (DateTime<Utc>, u64) {
        (self.counted_at, self.sequence)
    }
}

/// The stretch of a product's history that one count closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountSpan {
    /// The count before `closing`, `None` when `closing` is the product's first.
    pub opening: Option<CountEntry>,
    pub closing: CountEntry,
    /// How many counts sort after `closing` (`0` when it is the latest).
    pub later_counts: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CountHistory {
    per_product: HashMap<ProductId, Vec<CountEntry>>,
    next_sequence: u64,
}

impl CountHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every line of `count`. Returns the sequence number assigned to the count.
    ///
    /// Counts normally arrive in time order and are pushed at the end; a back-dated
    /// count is inserted at its sorted position.
    pub fn record(&mut self, count: &InventoryCount) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        for line in count.lines() {
            let entry = CountEntry {
                count_id: count.id_typed(),
                counted_at: count.counted_at(),
                sequence,
                counted_quantity: line.counted_quantity(),
            };

            let log = self.per_product.entry(line.product_id()).or_default();
            match log.last() {
                Some(last) if last.sort_key() > entry.sort_key() => {
                    let at = log.partition_point(|e| e.sort_key() <= entry.sort_key());
                    log.insert(at, entry);
                }
                _ => log.push(entry),
            }
        }

        sequence
    }

    /// The count at backward rank `n` for `product_id` (`n = 0` is the latest).
    pub fn nth_most_recent(&self, product_id: ProductId, n: usize) -> Option<&CountEntry> {
        let log = self.per_product.get(&product_id)?;
        let idx = log.len().checked_sub(n + 1)?;
        log.get(idx)
    }

    /// Where `count_id` sits in `product_id`'s log, whatever order it was recorded in.
    pub fn span_closed_by(&self, product_id: ProductId, count_id: InventoryCountId) -> Option<CountSpan> {
        let log = self.per_product.get(&product_id)?;
        let idx = log.iter().rposition(|e| e.count_id == count_id)?;

        Some(CountSpan {
            opening: idx.checked_sub(1).map(|prev| log[prev]),
            closing: log[idx],
            later_counts: log.len() - idx - 1,
        })
    }

    /// Number of counts recorded for `product_id`.
    pub fn len(&self, product_id: ProductId) -> usize {
        self.per_product.get(&product_id).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.per_product.is_empty()
    }
}
