//! Collaborators the engine reads from (and, for the catalog, writes one field to).
//!
//! The catalog is written through [`ProductCatalog::execute`] rather than by saving
//! a whole product, so that a recalibration cannot overwrite a concurrent pricing
//! change made by catalog management.
//!
//! Movements are summed over a half-open [`Window`]: a movement stamped exactly at a
//! count belongs to the interval that count opens, not the one it closes. Totals
//! saturate at `Decimal::MAX` instead of overflowing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use stockwise_core::DomainResult;
use stockwise_inventory::{CountEntry, CountSpan, InventoryCountId};
use stockwise_products::{Product, ProductCommand, ProductEvent, ProductId};
use stockwise_purchasing::{StockBatchId, StockBatchLine};

/// `[since, until)`; `None` leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl Window {
    /// From `since` (or the beginning of history) up to now.
    pub fn since(since: Option<DateTime<Utc>>) -> Self {
        Self { since, until: None }
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.since.is_none_or(|since| at >= since) && self.until.is_none_or(|until| at < until)
    }
}

/// A batch line together with the batch metadata the engine orders by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchLineRecord {
    pub batch_id: StockBatchId,
    pub received_at: DateTime<Utc>,
    /// Insertion order across the log; breaks ties between equal timestamps.
    pub sequence: u64,
    pub line: StockBatchLine,
}

/// Product lookup and command execution against stored products.
pub trait ProductCatalog: Send + Sync {
    fn product(&self, product_id: ProductId) -> Option<Product>;

    /// Run `command` against the stored product and keep the result, atomically.
    fn execute(&self, command: &ProductCommand) -> DomainResult<Vec<ProductEvent>>;
}

/// Append-only restock history.
pub trait StockBatchLog: Send + Sync {
    /// The line of the most recent batch for `product_id`, by `(received_at, sequence)`.
    fn latest_line(&self, product_id: ProductId) -> Option<BatchLineRecord>;

    /// Total quantity received for `product_id` in batches stamped inside `window`.
    fn received_in(&self, product_id: ProductId, window: Window) -> Decimal;
}

/// Append-only physical count history, addressable by backward rank.
pub trait InventoryCountLog: Send + Sync {
    /// The count at rank `n` for `product_id` (`0` = most recent).
    fn nth_most_recent(&self, product_id: ProductId, n: usize) -> Option<CountEntry>;

    /// `count_id`'s entry for `product_id` and the count ordered just before it.
    fn span_closed_by(&self, product_id: ProductId, count_id: InventoryCountId) -> Option<CountSpan>;
}

/// Registered (uncorrected) sale volumes.
pub trait SaleLineSource: Send + Sync {
    /// Total quantity sold of `product_id` in sales stamped inside `window`.
    fn sold_in(&self, product_id: ProductId, window: Window) -> Decimal;
}

impl<T> ProductCatalog for Arc<T>
where
    T: ProductCatalog + ?Sized,
{
    fn product(&self, product_id: ProductId) -> Option<Product> {
        (**self).product(product_id)
    }

    fn execute(&self, command: &ProductCommand) -> DomainResult<Vec<ProductEvent>> {
        (**self).execute(command)
    }
}

impl<T> StockBatchLog for Arc<T>
where
    T: StockBatchLog + ?Sized,
{
    fn latest_line(&self, product_id: ProductId) -> Option<BatchLineRecord> {
        (**self).latest_line(product_id)
    }

    fn received_in(&self, product_id: ProductId, window: Window) -> Decimal {
        (**self).received_in(product_id, window)
    }
}

impl<T> InventoryCountLog for Arc<T>
where
    T: InventoryCountLog + ?Sized,
{
    fn nth_most_recent(&self, product_id: ProductId, n: usize) -> Option<CountEntry> {
        (**self).nth_most_recent(product_id, n)
    }

    fn span_closed_by(&self, product_id: ProductId, count_id: InventoryCountId) -> Option<CountSpan> {
        (**self).span_closed_by(product_id, count_id)
    }
}

impl<T> SaleLineSource for Arc<T>
where
    T: SaleLineSource + ?Sized,
{
    fn sold_in(&self, product_id: ProductId, window: Window) -> Decimal {
        (**self).sold_in(product_id, window)
    }
}
