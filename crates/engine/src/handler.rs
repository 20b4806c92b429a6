//! Inventory workflow hook: recalibrate once per recorded count.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use stockwise_events::{EventEnvelope, Subscription};
use stockwise_inventory::{InventoryCount, InventoryCountId, InventoryEvent};

use crate::calibrator::{BatchCalibrationReport, Calibrator};
use crate::ports::{InventoryCountLog, ProductCatalog, SaleLineSource, StockBatchLog};

/// Anything that can recalibrate every product of a count.
pub trait CountRecalibration: Send + Sync {
    fn batch_recalibrate(&self, count: &InventoryCount) -> BatchCalibrationReport;
}

impl<P, I, B, S> CountRecalibration for Calibrator<P, I, B, S>
where
    P: ProductCatalog,
    I: InventoryCountLog,
    B: StockBatchLog,
    S: SaleLineSource,
{
    fn batch_recalibrate(&self, count: &InventoryCount) -> BatchCalibrationReport {
        Calibrator::batch_recalibrate(self, count)
    }
}

impl<T> CountRecalibration for Arc<T>
where
    T: CountRecalibration + ?Sized,
{
    fn batch_recalibrate(&self, count: &InventoryCount) -> BatchCalibrationReport {
        (**self).batch_recalibrate(count)
    }
}

/// Consumes `inventory.count.recorded` envelopes.
///
/// The bus delivers at least once; a count already handled is skipped so that a
/// redelivery does not recalibrate against itself a second time.
#[derive(Debug)]
pub struct InventoryCountHandler<R> {
    recalibrator: R,
    processed: Mutex<HashSet<InventoryCountId>>,
}

impl<R> InventoryCountHandler<R>
where
    R: CountRecalibration,
{
    pub fn new(recalibrator: R) -> Self {
        Self {
            recalibrator,
            processed: Mutex::new(HashSet::new()),
        }
    }

    /// Handle one envelope. `None` when the count was already handled.
    pub fn handle_envelope(
        &self,
        envelope: &EventEnvelope<InventoryEvent>,
    ) -> Option<BatchCalibrationReport> {
        let InventoryEvent::CountRecorded(recorded) = envelope.payload();
        let count = &recorded.count;

        let first_delivery = self
            .processed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(count.id_typed());
        if !first_delivery {
            tracing::debug!(
                event_id = %envelope.event_id(),
                count_id = %count.id_typed(),
                "duplicate count delivery skipped"
            );
            return None;
        }

        let report = self.recalibrator.batch_recalibrate(count);
        tracing::info!(
            shop_id = %envelope.shop_id(),
            count_id = %count.id_typed(),
            products = report.results.len(),
            updated = report.updated(),
            "inventory count processed"
        );
        Some(report)
    }

    /// Process envelopes until every publisher is gone.
    pub fn run(&self, subscription: Subscription<EventEnvelope<InventoryEvent>>) {
        while let Ok(envelope) = subscription.recv() {
            self.handle_envelope(&envelope);
        }
    }
}
