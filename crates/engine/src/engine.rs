use std::sync::Arc;

use rust_decimal::Decimal;

use stockwise_core::QuantityDisplay;
use stockwise_inventory::InventoryCount;
use stockwise_products::{Product, ProductId};

use crate::calibrator::{BatchCalibrationReport, CalibrationOutcome, Calibrator};
use crate::config::{MarginSource, NegativeFactorPolicy};
use crate::error::EngineError;
use crate::estimator::StockEstimator;
use crate::handler::CountRecalibration;
use crate::ledger::PricingLedger;
use crate::locks::ProductLocks;
use crate::ports::{InventoryCountLog, ProductCatalog, SaleLineSource, StockBatchLog};

/// The engine as seen by the catalog UI and the inventory workflow.
///
/// Pricing calls read the margin from `M` on every call. Queries by id fail only
/// when the product is unknown; everything else degrades to the fallbacks of the
/// ledger and estimator.
#[derive(Debug)]
pub struct PricingEngine<P, I, B, S, M> {
    catalog: P,
    ledger: PricingLedger<B>,
    calibrator: Calibrator<P, I, B, S>,
    margin: M,
}

impl<P, I, B, S, M> PricingEngine<P, I, B, S, M>
where
    P: ProductCatalog + Clone,
    I: InventoryCountLog,
    B: StockBatchLog + Clone,
    S: SaleLineSource,
    M: MarginSource,
{
    pub fn new(
        catalog: P,
        counts: I,
        batches: B,
        sales: S,
        margin: M,
        policy: NegativeFactorPolicy,
    ) -> Self {
        let estimator = StockEstimator::new(counts, batches.clone(), sales);
        Self {
            calibrator: Calibrator::new(
                catalog.clone(),
                estimator,
                Arc::new(ProductLocks::new()),
                policy,
            ),
            catalog,
            ledger: PricingLedger::new(batches),
            margin,
        }
    }

    pub fn ledger(&self) -> &PricingLedger<B> {
        &self.ledger
    }

    pub fn estimator(&self) -> &StockEstimator<I, B, S> {
        self.calibrator.estimator()
    }

    pub fn calibrator(&self) -> &Calibrator<P, I, B, S> {
        &self.calibrator
    }

    pub fn margin_percent(&self) -> Decimal {
        self.margin.margin_percent()
    }

    fn product(&self, product_id: ProductId) -> Result<Product, EngineError> {
        self.catalog
            .product(product_id)
            .ok_or(EngineError::ProductNotFound(product_id))
    }

    pub fn automatic_price(&self, product_id: ProductId) -> Result<Decimal, EngineError> {
        let product = self.product(product_id)?;
        Ok(self.ledger.automatic_price(&product, self.margin_percent()))
    }

    pub fn effective_price(&self, product_id: ProductId) -> Result<Decimal, EngineError> {
        let product = self.product(product_id)?;
        Ok(self.ledger.effective_price(&product, self.margin_percent()))
    }

    pub fn deviation_from_automatic(&self, product_id: ProductId) -> Result<Decimal, EngineError> {
        let product = self.product(product_id)?;
        Ok(self
            .ledger
            .deviation_from_automatic(&product, self.margin_percent()))
    }

    pub fn estimate_current_stock(
        &self,
        product_id: ProductId,
        n: usize,
    ) -> Result<Decimal, EngineError> {
        let product = self.product(product_id)?;
        Ok(self.estimator().estimate_current_stock(&product, n))
    }

    pub fn estimate_current_stock_display(
        &self,
        product_id: ProductId,
        n: usize,
    ) -> Result<QuantityDisplay, EngineError> {
        let product = self.product(product_id)?;
        Ok(self.estimator().estimate_current_stock_display(&product, n))
    }

    pub fn recalibrate(
        &self,
        product_id: ProductId,
        new_count: Decimal,
    ) -> Result<CalibrationOutcome, EngineError> {
        self.calibrator.recalibrate(product_id, new_count)
    }

    /// Call once per recorded count, after its lines are stored in the count log.
    pub fn batch_recalibrate(&self, count: &InventoryCount) -> BatchCalibrationReport {
        self.calibrator.batch_recalibrate(count)
    }
}

impl<P, I, B, S, M> CountRecalibration for PricingEngine<P, I, B, S, M>
where
    P: ProductCatalog + Clone,
    I: InventoryCountLog,
    B: StockBatchLog + Clone,
    S: SaleLineSource,
    M: MarginSource,
{
    fn batch_recalibrate(&self, count: &InventoryCount) -> BatchCalibrationReport {
        PricingEngine::batch_recalibrate(self, count)
    }
}
