//! Writing shop documents into the logs.
//!
//! Documents are stored first and announced second: a count reaches the bus only
//! once its lines are in the count log, so the calibrator can find it there by id,
//! wherever later or back-dated counts have put it. Publication failures leave the
//! document stored; the caller can republish, and the count handler ignores the
//! duplicate.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use stockwise_core::{AggregateId, DomainError};
use stockwise_events::{EventBus, EventEnvelope};
use stockwise_inventory::{InventoryCount, InventoryCountId, InventoryCountRecorded, InventoryEvent};
use stockwise_purchasing::{StockBatch, StockBatchId, StockEntry};
use stockwise_sales::Sale;

use crate::read_model::{InMemoryInventoryCountLog, InMemorySalesLedger, InMemoryStockBatchLog};

pub const INVENTORY_COUNT_AGGREGATE: &str = "inventory.count";

#[derive(Debug, Error)]
pub enum RecordError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The count is stored but was not announced.
    #[error("count {count_id} stored but not published: {message}")]
    Publish {
        count_id: InventoryCountId,
        message: String,
    },
}

#[derive(Debug)]
pub struct ShopRecorder<Bus> {
    batches: Arc<InMemoryStockBatchLog>,
    counts: Arc<InMemoryInventoryCountLog>,
    sales: Arc<InMemorySalesLedger>,
    bus: Bus,
}

impl<Bus> ShopRecorder<Bus>
where
    Bus: EventBus<EventEnvelope<InventoryEvent>>,
{
    pub fn new(
        batches: Arc<InMemoryStockBatchLog>,
        counts: Arc<InMemoryInventoryCountLog>,
        sales: Arc<InMemorySalesLedger>,
        bus: Bus,
    ) -> Self {
        Self {
            batches,
            counts,
            sales,
            bus,
        }
    }

    pub fn record_batch(&self, batch: &StockBatch) {
        let sequence = self.batches.append(batch);
        tracing::info!(
            shop_id = %batch.shop_id(),
            batch_id = %batch.id_typed(),
            lines = batch.lines().len(),
            sequence,
            "stock batch recorded"
        );
    }

    pub fn record_sale(&self, sale: &Sale) {
        self.sales.record(sale);
        tracing::debug!(
            shop_id = %sale.module().shop_id(),
            sale_id = %sale.id_typed(),
            amount = %sale.amount(),
            "sale recorded"
        );
    }

    /// Store `count`, then publish it for recalibration.
    pub fn record_count(&self, count: InventoryCount) -> Result<(), RecordError> {
        let sequence = self.counts.record(&count);
        tracing::info!(
            shop_id = %count.shop_id(),
            count_id = %count.id_typed(),
            lines = count.lines().len(),
            sequence,
            "inventory count recorded"
        );
        self.publish_count(count)
    }

    /// Announce an already stored count (again).
    pub fn publish_count(&self, count: InventoryCount) -> Result<(), RecordError> {
        let count_id = count.id_typed();
        let envelope = EventEnvelope::new(
            Uuid::now_v7(),
            count.shop_id(),
            count_id.0,
            INVENTORY_COUNT_AGGREGATE,
            1,
            InventoryEvent::CountRecorded(InventoryCountRecorded {
                occurred_at: count.counted_at(),
                count,
            }),
        );

        self.bus.publish(envelope).map_err(|e| RecordError::Publish {
            count_id,
            message: format!("{e:?}"),
        })
    }

    /// Normalise a stock-entry form and record the batch, then the count taken while
    /// restocking, if any.
    pub fn record_stock_entry(
        &self,
        entry: StockEntry,
    ) -> Result<(StockBatch, Option<InventoryCountId>), RecordError> {
        let (batch, count) = entry.into_documents(
            StockBatchId::new(AggregateId::new()),
            InventoryCountId::new(AggregateId::new()),
        )?;

        self.record_batch(&batch);
        let count_id = match count {
            Some(count) => {
                let count_id = count.id_typed();
                self.record_count(count)?;
                Some(count_id)
            }
            None => None,
        };

        Ok((batch, count_id))
    }
}
