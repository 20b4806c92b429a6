//! Stock estimation between physical counts.
//!
//! The estimate starts from a count and rolls it forward: everything received since
//! that count is added, and registered sales scaled by the correcting factor are
//! taken away.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use stockwise_core::QuantityDisplay;
use stockwise_inventory::{CountEntry, CountSpan, InventoryCountId};
use stockwise_products::{Product, ProductId};

use crate::ports::{InventoryCountLog, SaleLineSource, StockBatchLog, Window};

/// Movements for one product between a baseline count and an end point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockInterval {
    pub baseline: Option<CountEntry>,
    /// Counted quantity of the baseline, `0` without one.
    pub base: Decimal,
    /// Start of the interval (inclusive), `None` for the beginning of history.
    pub since: Option<DateTime<Utc>>,
    /// End of the interval (exclusive), `None` for now.
    pub until: Option<DateTime<Utc>>,
    pub received: Decimal,
    /// Registered sales, uncorrected.
    pub sold: Decimal,
}

impl StockInterval {
    /// `base + received`, `None` on overflow.
    pub fn available(&self) -> Option<Decimal> {
        self.base.checked_add(self.received)
    }
}

#[derive(Debug, Clone)]
pub struct StockEstimator<I, B, S> {
    counts: I,
    batches: B,
    sales: S,
}

impl<I, B, S> StockEstimator<I, B, S>
where
    I: InventoryCountLog,
    B: StockBatchLog,
    S: SaleLineSource,
{
    pub fn new(counts: I, batches: B, sales: S) -> Self {
        Self {
            counts,
            batches,
            sales,
        }
    }

    pub fn nth_most_recent_count(&self, product_id: ProductId, n: usize) -> Option<CountEntry> {
        self.counts.nth_most_recent(product_id, n)
    }

    /// Gather the interval that starts at the count of backward rank `rank` and runs
    /// up to now.
    pub fn interval(&self, product_id: ProductId, rank: usize) -> StockInterval {
        let baseline = self.nth_most_recent_count(product_id, rank);
        self.gather(product_id, baseline, None)
    }

    /// Gather the interval that `count_id` closes: from the count ordered just before
    /// it up to, but excluding, the count itself. `None` when the count is not in
    /// `product_id`'s log.
    pub fn interval_closed_by(
        &self,
        product_id: ProductId,
        count_id: InventoryCountId,
    ) -> Option<(CountSpan, StockInterval)> {
        let span = self.counts.span_closed_by(product_id, count_id)?;
        let interval = self.gather(product_id, span.opening, Some(span.closing.counted_at));
        Some((span, interval))
    }

    fn gather(
        &self,
        product_id: ProductId,
        baseline: Option<CountEntry>,
        until: Option<DateTime<Utc>>,
    ) -> StockInterval {
        let since = baseline.map(|entry| entry.counted_at);
        let window = Window { since, until };

        StockInterval {
            baseline,
            base: baseline.map_or(Decimal::ZERO, |entry| entry.counted_quantity),
            since,
            until,
            received: self.batches.received_in(product_id, window),
            sold: self.sales.sold_in(product_id, window),
        }
    }

    /// Stock on hand, estimated from the count of backward rank `n`. Can be negative
    /// when losses outran the last count. Saturates at the `Decimal` range.
    pub fn estimate_current_stock(&self, product: &Product, n: usize) -> Decimal {
        let interval = self.interval(product.id_typed(), n);
        let factor = product.correcting_factor();

        let estimate = interval.sold.checked_mul(factor).and_then(|corrected_sold| {
            interval.available()?.checked_sub(corrected_sold)
        });

        estimate.unwrap_or_else(|| {
            tracing::warn!(
                product_id = %product.id_typed(),
                base = %interval.base,
                received = %interval.received,
                sold = %interval.sold,
                "stock estimate out of range; saturated"
            );
            interval
                .base
                .saturating_add(interval.received)
                .saturating_sub(interval.sold.saturating_mul(factor))
        })
    }

    /// The estimate floored at zero, in a human-scale unit.
    pub fn estimate_current_stock_display(&self, product: &Product, n: usize) -> QuantityDisplay {
        let estimate = self.estimate_current_stock(product, n).max(Decimal::ZERO);
        product.sale_unit().display(estimate)
    }
}
